//! Integration tests for the TTL-backed session and activation-code
//! stores. TTL expiry is exercised by constructing stores whose horizon
//! is already in the past — no sleeping.

use keygate_auth::password;
use keygate_core::error::Error;
use keygate_core::repository::{ActivationCodeStore, SessionStore};
use keygate_store::{SurrealActivationCodeStore, SurrealSessionStore};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn db() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    keygate_store::run_migrations(&db).await.unwrap();
    db
}

// -----------------------------------------------------------------------
// Sessions
// -----------------------------------------------------------------------

#[tokio::test]
async fn saved_session_exists() {
    let sessions = SurrealSessionStore::new(db().await, 3600);

    sessions.save(1).await.unwrap();

    assert!(sessions.exists(1).await.unwrap());
    assert!(!sessions.exists(2).await.unwrap());
}

#[tokio::test]
async fn save_is_idempotent_per_subject() {
    let sessions = SurrealSessionStore::new(db().await, 3600);

    sessions.save(1).await.unwrap();
    sessions.save(1).await.unwrap();

    assert!(sessions.exists(1).await.unwrap());
}

#[tokio::test]
async fn deleted_session_no_longer_exists() {
    let sessions = SurrealSessionStore::new(db().await, 3600);

    sessions.save(1).await.unwrap();
    sessions.delete(1).await.unwrap();

    assert!(!sessions.exists(1).await.unwrap());
}

#[tokio::test]
async fn deleting_absent_session_succeeds() {
    let sessions = SurrealSessionStore::new(db().await, 3600);

    sessions.delete(999).await.unwrap();
}

#[tokio::test]
async fn expired_session_reads_as_absent() {
    let sessions = SurrealSessionStore::new(db().await, -1);

    sessions.save(1).await.unwrap();

    assert!(!sessions.exists(1).await.unwrap());
}

#[tokio::test]
async fn save_extends_an_expired_session() {
    let db = db().await;
    let expired = SurrealSessionStore::new(db.clone(), -1);
    let live = SurrealSessionStore::new(db, 3600);

    expired.save(1).await.unwrap();
    assert!(!live.exists(1).await.unwrap());

    // The overwrite restarts the TTL on the same slot.
    live.save(1).await.unwrap();
    assert!(live.exists(1).await.unwrap());
}

// -----------------------------------------------------------------------
// Activation codes
// -----------------------------------------------------------------------

#[tokio::test]
async fn created_code_verifies_against_stored_hash() {
    let codes = SurrealActivationCodeStore::new(db().await, 600);

    let plaintext = codes.create(1).await.unwrap();
    let hash = codes.get(1).await.unwrap();

    assert_ne!(plaintext, hash);
    assert!(password::verify(&plaintext, &hash).unwrap());
}

#[tokio::test]
async fn absent_challenge_is_not_found() {
    let codes = SurrealActivationCodeStore::new(db().await, 600);

    assert!(matches!(
        codes.get(1).await.unwrap_err(),
        Error::NotFound { .. }
    ));
}

#[tokio::test]
async fn second_create_overwrites_the_slot() {
    let codes = SurrealActivationCodeStore::new(db().await, 600);

    let first = codes.create(1).await.unwrap();
    let second = codes.create(1).await.unwrap();

    let hash = codes.get(1).await.unwrap();
    assert!(password::verify(&second, &hash).unwrap());
    // The overwrite makes the first plaintext worthless even before its
    // TTL runs out.
    if first != second {
        assert!(!password::verify(&first, &hash).unwrap());
    }
}

#[tokio::test]
async fn expired_challenge_is_not_found() {
    let codes = SurrealActivationCodeStore::new(db().await, -1);

    codes.create(1).await.unwrap();

    assert!(matches!(
        codes.get(1).await.unwrap_err(),
        Error::NotFound { .. }
    ));
}

#[tokio::test]
async fn challenges_are_per_subject() {
    let codes = SurrealActivationCodeStore::new(db().await, 600);

    let for_one = codes.create(1).await.unwrap();
    let for_two = codes.create(2).await.unwrap();

    let hash_one = codes.get(1).await.unwrap();
    assert!(password::verify(&for_one, &hash_one).unwrap());
    if for_one != for_two {
        assert!(!password::verify(&for_two, &hash_one).unwrap());
    }
}
