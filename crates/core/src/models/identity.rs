//! Identities issued by the authentication provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identity ID assigned by the authentication provider.
///
/// Opaque to this system: orders hold it as a weak reference and the admin
/// policy compares it against a configured set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    /// Wrap a provider-issued ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Summary of one identity, as shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySummary {
    pub uid: IdentityId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_sign_in_time: Option<DateTime<Utc>>,
}
