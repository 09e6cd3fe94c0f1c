//! keygate-store — SurrealDB connection management, schema migrations,
//! and the store implementations backing the core collaborator traits.
//!
//! The session and activation-code stores key their records directly by
//! subject id, so the one-record-per-subject invariant is structural.
//! TTL expiry is enforced by the read queries, never by core-side
//! polling.

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::StoreError;
pub use repository::{SurrealActivationCodeStore, SurrealSessionStore, SurrealUserStore};
pub use schema::run_migrations;
