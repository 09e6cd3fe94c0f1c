//! Authentication data types shared across crates: the verified caller
//! identity and the issued token pair.

use serde::{Deserialize, Serialize};

use super::role::Role;

/// The authenticated caller, as recovered from a verified token.
///
/// This is the only value the pipeline injects into downstream calls;
/// authorization decisions are made against it, never against raw
/// metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: u64,
    pub roles: Vec<Role>,
}

impl Identity {
    /// Whether any of the caller's roles is exempt from ownership
    /// checks.
    pub fn is_elevated(&self) -> bool {
        self.roles.iter().any(Role::is_elevated)
    }
}

/// A freshly issued access/refresh token pair. Immutable once issued;
/// validity is a function of signature and expiry alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
