// Temporary dashboard authorization model
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

pub const AUTHORIZATION_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);
pub const INACTIVITY_CUTOFF: Duration = Duration::from_secs(10 * 60);

/// How long a minted viewing token stays usable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub validity: Duration,
    pub inactivity: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            validity: AUTHORIZATION_VALIDITY,
            inactivity: INACTIVITY_CUTOFF,
        }
    }
}

impl ExpiryPolicy {
    pub fn expiry_interval(&self) -> String {
        platform_interval(self.validity)
    }

    pub fn inactivity_interval(&self) -> String {
        platform_interval(self.inactivity)
    }
}

/// Formats a duration as the platform's interval notation, e.g. "24 hours"
fn platform_interval(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (amount, unit) = if secs > 0 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs > 0 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };

    if amount == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", amount, unit)
    }
}

/// Everything needed to mint one dashboard-scoped viewing token for one user
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationRequest {
    pub dashboard_id: String,
    pub policy: ExpiryPolicy,
    pub username: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    /// User attribute filters, forwarded verbatim
    pub metadata: Map<String, Value>,
}

/// Key/token pair returned to the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardAuthorization {
    pub id: String,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_intervals() {
        let policy = ExpiryPolicy::default();
        assert_eq!(policy.validity, Duration::from_secs(86_400));
        assert_eq!(policy.inactivity, Duration::from_secs(600));
        assert_eq!(policy.expiry_interval(), "24 hours");
        assert_eq!(policy.inactivity_interval(), "10 minutes");
    }

    #[test]
    fn test_platform_interval_units() {
        assert_eq!(platform_interval(Duration::from_secs(3600)), "1 hour");
        assert_eq!(platform_interval(Duration::from_secs(90)), "90 seconds");
        assert_eq!(platform_interval(Duration::from_secs(60)), "1 minute");
    }
}
