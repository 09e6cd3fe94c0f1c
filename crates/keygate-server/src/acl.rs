//! The access-control table: a declarative mapping from operation name
//! to the roles allowed to invoke it, validated at startup against the
//! operation registry.
//!
//! Operations absent from the policy are public — but only operations
//! the registry explicitly marks public may be absent. A state-changing
//! operation someone forgets to register fails the build instead of
//! silently defaulting to public.

use std::collections::HashMap;

use keygate_core::models::role::Role;
use thiserror::Error;

/// Exposed operation names.
pub mod op {
    pub const AUTH_REGISTER: &str = "auth.Register";
    pub const AUTH_LOGIN: &str = "auth.Login";
    pub const AUTH_REFRESH_TOKEN: &str = "auth.RefreshToken";
    pub const AUTH_LOGOUT: &str = "auth.Logout";

    pub const USER_CREATE: &str = "user.Create";
    pub const USER_GET: &str = "user.Get";
    pub const USER_GET_ALL: &str = "user.GetAll";
    pub const USER_UPDATE: &str = "user.Update";
    pub const USER_DELETE: &str = "user.Delete";
    pub const USER_ME: &str = "user.Me";
    pub const USER_SEND_ACTIVATION_CODE: &str = "user.SendActivationCode";
    pub const USER_CHECK_ACTIVATION_CODE: &str = "user.CheckActivationCode";
}

/// One registered operation and whether it is public by design.
#[derive(Debug, Clone, Copy)]
pub struct OperationSpec {
    pub name: &'static str,
    pub public: bool,
}

/// Every operation the service exposes. The pipeline refuses to build
/// a table that leaves a non-public operation unpolicied.
pub const OPERATIONS: &[OperationSpec] = &[
    OperationSpec { name: op::AUTH_REGISTER, public: true },
    OperationSpec { name: op::AUTH_LOGIN, public: true },
    OperationSpec { name: op::AUTH_REFRESH_TOKEN, public: true },
    OperationSpec { name: op::AUTH_LOGOUT, public: true },
    OperationSpec { name: op::USER_CREATE, public: false },
    OperationSpec { name: op::USER_GET, public: false },
    OperationSpec { name: op::USER_GET_ALL, public: false },
    OperationSpec { name: op::USER_UPDATE, public: false },
    OperationSpec { name: op::USER_DELETE, public: false },
    OperationSpec { name: op::USER_ME, public: false },
    OperationSpec { name: op::USER_SEND_ACTIVATION_CODE, public: false },
    OperationSpec { name: op::USER_CHECK_ACTIVATION_CODE, public: false },
];

/// Operation name → allowed roles (+ ownership restriction marker).
#[derive(Debug, Clone, Copy)]
pub struct PermissionEntry {
    pub operation: &'static str,
    pub allowed_roles: &'static [Role],
    /// Restricted operations additionally require the caller to be the
    /// target subject, unless the caller holds an elevated role.
    pub ownership_restricted: bool,
}

/// The declarative policy. Order is irrelevant; duplicates are a build
/// error.
pub const ACCESS_POLICY: &[PermissionEntry] = &[
    PermissionEntry {
        operation: op::USER_CREATE,
        allowed_roles: &[Role::Admin],
        ownership_restricted: false,
    },
    PermissionEntry {
        operation: op::USER_GET,
        allowed_roles: &[Role::User, Role::Admin],
        ownership_restricted: true,
    },
    PermissionEntry {
        operation: op::USER_GET_ALL,
        allowed_roles: &[Role::Admin],
        ownership_restricted: false,
    },
    PermissionEntry {
        operation: op::USER_UPDATE,
        allowed_roles: &[Role::User, Role::Admin],
        ownership_restricted: true,
    },
    PermissionEntry {
        operation: op::USER_DELETE,
        allowed_roles: &[Role::Admin],
        ownership_restricted: false,
    },
    PermissionEntry {
        operation: op::USER_ME,
        allowed_roles: &[Role::User, Role::Admin],
        ownership_restricted: false,
    },
    PermissionEntry {
        operation: op::USER_SEND_ACTIVATION_CODE,
        allowed_roles: &[Role::User, Role::Admin],
        ownership_restricted: false,
    },
    PermissionEntry {
        operation: op::USER_CHECK_ACTIVATION_CODE,
        allowed_roles: &[Role::User, Role::Admin],
        ownership_restricted: false,
    },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AclError {
    #[error("policy entry references unregistered operation '{0}'")]
    UnknownOperation(String),

    #[error("duplicate policy entry for operation '{0}'")]
    DuplicateEntry(String),

    #[error("operation '{0}' is neither public nor covered by the policy")]
    UnprotectedOperation(String),

    #[error("policy entry for '{0}' allows no roles")]
    EmptyRoleSet(String),
}

/// The validated, read-only table the pipeline consults per call.
#[derive(Debug, Clone)]
pub struct AccessControlTable {
    entries: HashMap<&'static str, PermissionEntry>,
}

impl AccessControlTable {
    /// Build and validate the production table.
    pub fn build() -> Result<Self, AclError> {
        Self::from_parts(OPERATIONS, ACCESS_POLICY)
    }

    /// Build from explicit parts; exposed for tests exercising the
    /// validation rules.
    pub fn from_parts(
        registry: &[OperationSpec],
        policy: &[PermissionEntry],
    ) -> Result<Self, AclError> {
        let mut entries: HashMap<&'static str, PermissionEntry> = HashMap::new();

        for entry in policy {
            if !registry.iter().any(|spec| spec.name == entry.operation) {
                return Err(AclError::UnknownOperation(entry.operation.to_string()));
            }
            if entry.allowed_roles.is_empty() {
                return Err(AclError::EmptyRoleSet(entry.operation.to_string()));
            }
            if entries.insert(entry.operation, *entry).is_some() {
                return Err(AclError::DuplicateEntry(entry.operation.to_string()));
            }
        }

        for spec in registry {
            if !spec.public && !entries.contains_key(spec.name) {
                return Err(AclError::UnprotectedOperation(spec.name.to_string()));
            }
        }

        Ok(Self { entries })
    }

    /// The policy entry for an operation; `None` means the operation is
    /// public and authentication is skipped entirely.
    pub fn lookup(&self, operation: &str) -> Option<&PermissionEntry> {
        self.entries.get(operation)
    }
}
