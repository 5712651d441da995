// Claims carried by a validated identity-provider access token
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserClaims {
    #[serde(default)]
    pub sub: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserClaims {
    /// Claim stored under the app's namespace, e.g. `https://myexampleapp/firstName`
    pub fn namespaced(&self, namespace: &str, key: &str) -> Option<&Value> {
        self.extra.get(&format!("{}{}", namespace, key))
    }

    pub fn namespaced_str(&self, namespace: &str, key: &str) -> Option<&str> {
        self.namespaced(namespace, key).and_then(Value::as_str)
    }

    pub fn claim_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Row-level filter values attached to the user (`<namespace>parameters`)
    pub fn attribute_filters(&self, namespace: &str) -> Map<String, Value> {
        match self.namespaced(namespace, "parameters") {
            Some(Value::Object(filters)) => filters.clone(),
            _ => Map::new(),
        }
    }
}
