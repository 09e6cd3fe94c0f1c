//! Credential hashing using Argon2id.
//!
//! The same hasher protects login passwords and activation codes. Each
//! hash carries its own random salt; comparison is constant-time inside
//! the underlying implementation.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::error::AuthError;

/// Argon2id with OWASP ASVS recommended parameters
/// (memory: 19 MiB, iterations: 2, parallelism: 1).
fn hasher() -> Result<Argon2<'static>, AuthError> {
    let params = argon2::Params::new(19_456, 2, 1, None)
        .map_err(|e| AuthError::Crypto(format!("argon2 params: {e}")))?;
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params,
    ))
}

/// Hash a secret with a freshly generated salt, returning the PHC-format
/// string.
pub fn hash(secret: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AuthError::Crypto(format!("hash: {e}")))?;

    Ok(hash.to_string())
}

/// Verify a plaintext secret against a PHC-format hash.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(AuthError::Crypto)` if the stored hash is malformed.
pub fn verify(secret: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    match hasher()?.verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_secret_matches() {
        let h = hash("hunter2").unwrap();
        assert!(verify("hunter2", &h).unwrap());
    }

    #[test]
    fn wrong_secret_does_not_match() {
        let h = hash("hunter2").unwrap();
        assert!(!verify("wrong", &h).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash("same-input").unwrap();
        let b = hash("same-input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_returns_error() {
        assert!(verify("pw", "not-a-hash").is_err());
    }
}
