//! Token issuance and verification.
//!
//! Tokens are HS256-signed JWTs carrying the subject id and role set.
//! Issuance is a pure function of input, current time, and the shared
//! secret; verification is stateless — revocation lives in the session
//! store, never here.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use keygate_core::models::auth::Identity;
use keygate_core::models::role::Role;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Signed claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id, decimal-encoded.
    pub sub: String,
    /// Role names granted to the subject.
    pub roles: Vec<String>,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token id, so two tokens minted in the same second for the
    /// same subject are still distinct strings.
    pub jti: String,
}

/// Issue a signed access token; returns the token and its expiry instant.
pub fn issue_access_token(
    user_id: u64,
    roles: &[Role],
    config: &AuthConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    issue(user_id, roles, config.access_token_ttl_secs, config)
}

/// Issue a signed refresh token; returns the token and its expiry
/// instant. Distinct (longer) horizon than access tokens.
pub fn issue_refresh_token(
    user_id: u64,
    roles: &[Role],
    config: &AuthConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    issue(user_id, roles, config.refresh_token_ttl_secs, config)
}

fn issue(
    user_id: u64,
    roles: &[Role],
    ttl_secs: u64,
    config: &AuthConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let now = Utc::now();
    let expires_at = now + Duration::seconds(ttl_secs as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
        jti: format!("{:032x}", rand::rng().random::<u128>()),
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))?;

    Ok((token, expires_at))
}

/// Verify a token's signature and expiry and recover the caller identity.
///
/// Failures are never transient: a bad signature, malformed claims, or an
/// unknown role name is `TokenInvalid`; a correctly signed token past its
/// expiry is `TokenExpired`.
pub fn verify_and_parse(token: &str, config: &AuthConfig) -> Result<Identity, AuthError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["sub", "exp"]);
    validation.leeway = 0;

    let claims = jsonwebtoken::decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })?;

    let id: u64 = claims
        .sub
        .parse()
        .map_err(|_| AuthError::TokenInvalid(format!("non-numeric subject: {}", claims.sub)))?;

    let roles = claims
        .roles
        .iter()
        .map(|name| {
            Role::parse(name).ok_or_else(|| AuthError::TokenInvalid(format!("unknown role: {name}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Identity { id, roles })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            ..Default::default()
        }
    }

    #[test]
    fn claims_round_trip() {
        let config = test_config();
        let roles = [Role::User, Role::Billing];

        let (token, expires_at) = issue_access_token(42, &roles, &config).unwrap();
        assert!(expires_at > Utc::now());

        let identity = verify_and_parse(&token, &config).unwrap();
        assert_eq!(identity.id, 42);
        assert_eq!(identity.roles, vec![Role::User, Role::Billing]);
    }

    #[test]
    fn same_second_tokens_are_distinct() {
        let config = test_config();
        let (t1, _) = issue_access_token(7, &[Role::User], &config).unwrap();
        let (t2, _) = issue_access_token(7, &[Role::User], &config).unwrap();
        assert_ne!(t1, t2);
    }

    #[test]
    fn refresh_horizon_exceeds_access_horizon() {
        let config = test_config();
        let (_, access_exp) = issue_access_token(1, &[Role::User], &config).unwrap();
        let (_, refresh_exp) = issue_refresh_token(1, &[Role::User], &config).unwrap();
        assert!(refresh_exp > access_exp);
    }

    #[test]
    fn tampered_token_is_invalid() {
        let config = test_config();
        let (token, _) = issue_access_token(1, &[Role::User], &config).unwrap();
        let tampered = format!("{token}x");
        assert!(matches!(
            verify_and_parse(&tampered, &config),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let config = test_config();
        let (token, _) = issue_access_token(1, &[Role::User], &config).unwrap();

        let other = AuthConfig {
            jwt_secret: "another-secret".into(),
            ..Default::default()
        };
        assert!(matches!(
            verify_and_parse(&token, &other),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let config = test_config();
        let now = Utc::now();
        let claims = Claims {
            sub: "1".into(),
            roles: vec!["user".into()],
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
            jti: "test".into(),
        };
        let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key).unwrap();

        assert!(matches!(
            verify_and_parse(&token, &config),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn unknown_role_claim_is_invalid() {
        let config = test_config();
        let now = Utc::now();
        let claims = Claims {
            sub: "1".into(),
            roles: vec!["superuser".into()],
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
            jti: "test".into(),
        };
        let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key).unwrap();

        assert!(matches!(
            verify_and_parse(&token, &config),
            Err(AuthError::TokenInvalid(_))
        ));
    }
}
