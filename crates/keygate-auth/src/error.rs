//! Authentication error types.

use keygate_core::Error;
use thiserror::Error as ThisError;
use tracing::warn;

#[derive(Debug, ThisError)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Error::InvalidCredentials,
            AuthError::TokenExpired => Error::ExpiredToken,
            AuthError::TokenInvalid(_) => Error::InvalidToken,
            // Hashing/signing failures are internal faults, not bad
            // input; the detail stays in the log stream.
            AuthError::Crypto(msg) => {
                warn!(error = %msg, "crypto failure");
                Error::unavailable("credential processing failure")
            }
        }
    }
}
