//! Authentication configuration.

/// Configuration for token issuance and the activation-code flow.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared secret for HS256 token signing and verification.
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_ttl_secs: u64,
    /// Refresh token lifetime in seconds (default: 86_400 = 24 hours).
    /// Also the session TTL: a session saved at refresh/login lives
    /// exactly as long as the refresh token that points at it.
    pub refresh_token_ttl_secs: u64,
    /// Activation code lifetime in seconds (default: 600 = 10 minutes).
    pub activation_code_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 86_400,
            activation_code_ttl_secs: 600,
        }
    }
}
