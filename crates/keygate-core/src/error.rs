//! Error taxonomy for the keygate system.
//!
//! Every error leaving a service or the request pipeline is one of these
//! kinds; layer-local errors convert into this type at their crate
//! boundary so no backing-store detail leaks to callers.

use std::collections::BTreeMap;

use thiserror::Error;

/// A field → reason map for validation failures, ordered so error
/// output is deterministic.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// No usable bearer token on a protected operation.
    #[error("unauthenticated: {reason}")]
    Unauthenticated { reason: String },

    /// Role or ownership mismatch.
    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },

    /// Token failed signature/shape checks, or its refresh session was
    /// revoked.
    #[error("invalid token")]
    InvalidToken,

    /// Token was well-formed and correctly signed but past its expiry.
    #[error("token has expired")]
    ExpiredToken,

    /// Login mismatch. Deliberately conflates "no such account" and
    /// "wrong password" so account existence is not probeable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Field-scoped validation failure.
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(FieldErrors),

    /// Unique-constraint collision on the named field.
    #[error("duplicate {field}")]
    DuplicateIdentifier { field: String },

    /// Resource-level absence.
    #[error("{entity} not found")]
    NotFound { entity: String },

    /// Operation is inconsistent with current state (e.g. activating an
    /// already-active account).
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    /// Backing store or collaborator failure. The only kind a caller may
    /// reasonably retry; keygate itself never retries.
    #[error("unavailable: {reason}")]
    Unavailable { reason: String },
}

impl Error {
    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self::Unauthenticated {
            reason: reason.into(),
        }
    }

    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Single-field validation failure.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), reason.into());
        Self::Validation(fields)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
