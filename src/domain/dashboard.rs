// Dashboard domain model
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dashboard names keyed by language code ("en", "nl", ...)
pub type LocalizedName = BTreeMap<String, String>;

/// A dashboard as handed to the page: platform id plus its localized names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub id: String,
    #[serde(default)]
    pub name: LocalizedName,
}

impl DashboardSummary {
    pub fn new(id: String, name: LocalizedName) -> Self {
        Self { id, name }
    }

    /// Tab label for the dashboard at `index` in the list
    pub fn label(&self, index: usize) -> String {
        match self.name.get("en") {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("dashboard {}", index + 1),
        }
    }
}

/// A resource row as returned by the platform's securable listing
#[derive(Debug, Clone, Deserialize)]
pub struct Securable {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: LocalizedName,
    #[serde(default)]
    pub tags: Vec<SecurableTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurableTag {
    #[serde(default)]
    pub id: Option<String>,
    pub tag: String,
}

impl Securable {
    pub fn is_dashboard(&self) -> bool {
        self.kind.as_deref() == Some("dashboard")
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.tag == tag)
    }

    pub fn into_summary(self) -> DashboardSummary {
        DashboardSummary::new(self.id, self.name)
    }
}
