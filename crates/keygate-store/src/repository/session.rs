//! SurrealDB implementation of [`SessionStore`].
//!
//! The record id is the subject id, so "one live session per subject"
//! is structural: a second login overwrites the first and with it any
//! other device's refresh capability. This is deliberate policy, not an
//! accident of the storage layout.

use chrono::{DateTime, Duration, Utc};
use keygate_core::repository::SessionStore;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::StoreError;

#[derive(Debug, SurrealValue)]
struct SessionRow {
    #[allow(dead_code)]
    expires_at: DateTime<Utc>,
}

/// SurrealDB implementation of the refresh-session store.
#[derive(Clone)]
pub struct SurrealSessionStore<C: Connection> {
    db: Surreal<C>,
    ttl: Duration,
}

impl<C: Connection> SurrealSessionStore<C> {
    /// `ttl_secs` is the refresh-token horizon: a session saved now is
    /// honorable exactly as long as the refresh token minted with it.
    pub fn new(db: Surreal<C>, ttl_secs: i64) -> Self {
        Self {
            db,
            ttl: Duration::seconds(ttl_secs),
        }
    }
}

impl<C: Connection> SessionStore for SurrealSessionStore<C> {
    async fn save(&self, user_id: u64) -> keygate_core::Result<()> {
        let expires_at = Utc::now() + self.ttl;

        self.db
            .query("UPSERT type::record('session', $id) SET expires_at = $expires_at")
            .bind(("id", user_id))
            .bind(("expires_at", expires_at))
            .await
            .map_err(StoreError::from)?
            .check()
            .map_err(StoreError::from)?;

        Ok(())
    }

    async fn exists(&self, user_id: u64) -> keygate_core::Result<bool> {
        // Expiry is enforced here, in the read: a lingering expired row
        // is indistinguishable from no row at all.
        let mut result = self
            .db
            .query(
                "SELECT expires_at FROM type::record('session', $id) \
                 WHERE expires_at > time::now()",
            )
            .bind(("id", user_id))
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(StoreError::from)?;

        Ok(!rows.is_empty())
    }

    async fn delete(&self, user_id: u64) -> keygate_core::Result<()> {
        // Deleting an absent key succeeds; logout is idempotent.
        self.db
            .query("DELETE type::record('session', $id)")
            .bind(("id", user_id))
            .await
            .map_err(StoreError::from)?;

        Ok(())
    }
}
