//! Role model.
//!
//! Roles are a closed enumeration; the set is fixed at compile time and
//! assigned to accounts by the user store. keygate only ever reads them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Ordinary account holder.
    User,
    /// Administrator; exempt from ownership restrictions.
    Admin,
    /// Customer-support operator.
    Support,
    /// Billing operator.
    Billing,
    /// Back-office operator.
    Operator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Support => "support",
            Role::Billing => "billing",
            Role::Operator => "operator",
        }
    }

    /// Parse the snake_case wire form. Unknown names are rejected so a
    /// forged or stale token claim cannot smuggle in an unmapped role.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            "support" => Some(Role::Support),
            "billing" => Some(Role::Billing),
            "operator" => Some(Role::Operator),
            _ => None,
        }
    }

    /// Elevated roles bypass ownership checks on restricted operations.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_string_round_trip() {
        for role in [
            Role::User,
            Role::Admin,
            Role::Support,
            Role::Billing,
            Role::Operator,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn only_admin_is_elevated() {
        assert!(Role::Admin.is_elevated());
        assert!(!Role::User.is_elevated());
        assert!(!Role::Support.is_elevated());
    }
}
