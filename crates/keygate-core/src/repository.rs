//! Collaborator trait definitions.
//!
//! All operations are async and accept cancellation by future drop; a
//! timed-out or failed backing call surfaces as [`Error::Unavailable`]
//! and is never retried here.
//!
//! [`Error::Unavailable`]: crate::error::Error::Unavailable

use crate::error::Result;
use crate::models::user::{NewUser, User, UserFilter, UserPatch};

/// Persistent account records, looked up and mutated by filter.
pub trait UserRepository: Send + Sync {
    /// Insert a new account and return its assigned id.
    fn insert(&self, user: NewUser) -> impl Future<Output = Result<u64>> + Send;

    /// Fetch the single account matching the filter, or `NotFound`.
    fn find_one(&self, filter: UserFilter) -> impl Future<Output = Result<User>> + Send;

    /// Fetch every account matching the filter.
    fn find(&self, filter: UserFilter) -> impl Future<Output = Result<Vec<User>>> + Send;

    /// Apply the patch to the single account matching the filter;
    /// `NotFound` when nothing matches.
    fn update(
        &self,
        filter: UserFilter,
        patch: UserPatch,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete every account matching the filter.
    fn delete(&self, filter: UserFilter) -> impl Future<Output = Result<()>> + Send;
}

/// TTL-bounded record of "this subject currently holds a valid refresh
/// session", keyed by subject id. One session per subject: a save
/// overwrites whatever was there.
///
/// This store, not the refresh token itself, is authoritative for
/// revocation — tokens stay cryptographically valid past logout.
pub trait SessionStore: Send + Sync {
    /// Upsert the subject's session, restarting its TTL.
    fn save(&self, user_id: u64) -> impl Future<Output = Result<()>> + Send;

    /// `true` iff an unexpired session exists. Absence (including natural
    /// TTL expiry) is `Ok(false)` — it means "session invalid", not an
    /// infrastructure fault.
    fn exists(&self, user_id: u64) -> impl Future<Output = Result<bool>> + Send;

    /// Remove the subject's session. Deleting an absent key succeeds.
    fn delete(&self, user_id: u64) -> impl Future<Output = Result<()>> + Send;
}

/// Single-slot-per-subject store of a hashed one-time activation code.
pub trait ActivationCodeStore: Send + Sync {
    /// Generate a fresh code, store its hash with a TTL (overwriting any
    /// prior challenge), and return the plaintext for out-of-band
    /// delivery. The plaintext is never persisted.
    fn create(&self, user_id: u64) -> impl Future<Output = Result<String>> + Send;

    /// The stored code hash, or `NotFound` when no unexpired challenge
    /// exists.
    fn get(&self, user_id: u64) -> impl Future<Output = Result<String>> + Send;
}

/// Outbound delivery of activation codes.
pub trait MailSender: Send + Sync {
    fn send_activation_code(
        &self,
        recipient: &str,
        code: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}
