//! User domain model, with the filter and patch types the store operates
//! on.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    /// Argon2id PHC-format hash; the plaintext never reaches this struct.
    pub password_hash: String,
    pub roles: Vec<Role>,
    /// Set to `true` only by a successful activation-code check.
    pub is_active: bool,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload. `password_hash` is already hashed by the service
/// layer; stores never see plaintext.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub is_active: bool,
    pub is_confirmed: bool,
}

/// All-optional lookup filter.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub id: Option<u64>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roles: Option<Vec<Role>>,
    pub is_active: Option<bool>,
    pub is_confirmed: Option<bool>,
}

impl UserFilter {
    pub fn by_id(id: u64) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Default::default()
        }
    }

    /// Normalize the filter: an id beats an email when both are set, so a
    /// caller-supplied email cannot widen or redirect an id lookup.
    pub fn normalize(&mut self) {
        if self.id.is_some() {
            self.email = None;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.roles.is_none()
            && self.is_active.is_none()
            && self.is_confirmed.is_none()
    }
}

/// All-optional field patch applied by `UserRepository::update`.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub password_hash: Option<String>,
    pub roles: Option<Vec<Role>>,
    pub is_active: Option<bool>,
    pub is_confirmed: Option<bool>,
}
