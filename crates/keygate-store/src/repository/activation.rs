//! SurrealDB implementation of [`ActivationCodeStore`].
//!
//! Single slot per subject (record id = subject id): issuing a new code
//! overwrites the previous challenge, so older plaintexts stop
//! verifying the moment a fresh one is minted. Only the Argon2id hash
//! of the code is stored.

use chrono::{DateTime, Duration, Utc};
use keygate_auth::password;
use keygate_core::Error;
use keygate_core::repository::ActivationCodeStore;
use rand::Rng;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::StoreError;

const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const CODE_LENGTH: usize = 6;

#[derive(Debug, SurrealValue)]
struct ChallengeRow {
    code_hash: String,
}

/// Draw a fixed-length code uniformly from the alphanumeric alphabet.
/// The thread-local generator is a CSPRNG; a seeded generator must never
/// be substituted here.
fn generate_code() -> String {
    let mut rng = rand::rng();

    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// SurrealDB implementation of the activation-code store.
#[derive(Clone)]
pub struct SurrealActivationCodeStore<C: Connection> {
    db: Surreal<C>,
    ttl: Duration,
}

impl<C: Connection> SurrealActivationCodeStore<C> {
    pub fn new(db: Surreal<C>, ttl_secs: i64) -> Self {
        Self {
            db,
            ttl: Duration::seconds(ttl_secs),
        }
    }
}

impl<C: Connection> ActivationCodeStore for SurrealActivationCodeStore<C> {
    async fn create(&self, user_id: u64) -> keygate_core::Result<String> {
        let code = generate_code();
        let code_hash = password::hash(&code).map_err(Error::from)?;
        let expires_at: DateTime<Utc> = Utc::now() + self.ttl;

        self.db
            .query(
                "UPSERT type::record('activation_code', $id) SET \
                 code_hash = $code_hash, expires_at = $expires_at",
            )
            .bind(("id", user_id))
            .bind(("code_hash", code_hash))
            .bind(("expires_at", expires_at))
            .await
            .map_err(StoreError::from)?
            .check()
            .map_err(StoreError::from)?;

        Ok(code)
    }

    async fn get(&self, user_id: u64) -> keygate_core::Result<String> {
        let mut result = self
            .db
            .query(
                "SELECT code_hash FROM type::record('activation_code', $id) \
                 WHERE expires_at > time::now()",
            )
            .bind(("id", user_id))
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<ChallengeRow> = result.take(0).map_err(StoreError::from)?;
        let row = rows.into_iter().next().ok_or(StoreError::NotFound {
            entity: "activation code".into(),
        })?;

        Ok(row.code_hash)
    }
}
