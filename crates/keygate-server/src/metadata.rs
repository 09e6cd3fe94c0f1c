//! Call metadata.
//!
//! The transport delivers a flat key → value map alongside every call;
//! this module owns the conventional keys and the tolerant accessors
//! the pipeline uses. Keys are matched case-insensitively, as transport
//! metadata conventionally is.

use std::collections::HashMap;

/// Bearer token header.
pub const AUTHORIZATION: &str = "authorization";
/// Caller-supplied trace id; observability only.
pub const REQUEST_ID: &str = "x-request-id";
/// Caller-supplied client address; observability only, never used for
/// authorization decisions.
pub const CLIENT_IP: &str = "x-client-ip";

const BEARER_PREFIX: &str = "Bearer ";

/// Flat call metadata, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    entries: HashMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_ascii_lowercase(), value.into());
    }

    /// Builder-style insert, for call sites assembling metadata inline.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// The value under `key`, or empty when absent. Trace metadata is
    /// best-effort; absence is tolerated everywhere.
    pub fn get_or_empty(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    /// Extract the bearer token from the authorization value, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.get(AUTHORIZATION)?;
        let token = value.strip_prefix(BEARER_PREFIX)?.trim();
        if token.is_empty() { None } else { Some(token) }
    }
}
