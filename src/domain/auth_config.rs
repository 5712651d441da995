// Public identity-provider settings served to the page
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAuthConfig {
    pub domain: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub audience: String,
}
