//! Per-call context threaded by the pipeline into every handler.

use keygate_core::Error;
use keygate_core::models::auth::Identity;

use crate::metadata::{self, Metadata};

/// Request-scoped context: trace identifiers plus, after authentication,
/// the verified caller identity.
///
/// The identity is an explicit, typed field — handlers never reach back
/// into raw metadata to learn who is calling.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub request_id: String,
    pub client_ip: String,
    identity: Option<Identity>,
}

impl CallContext {
    /// Context enrichment always succeeds; absent trace metadata becomes
    /// empty strings.
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            request_id: meta.get_or_empty(metadata::REQUEST_ID),
            client_ip: meta.get_or_empty(metadata::CLIENT_IP),
            identity: None,
        }
    }

    pub(crate) fn attach_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    /// The authenticated caller, if the operation was protected.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The authenticated caller, or `Unauthenticated` — for handlers of
    /// operations that only make sense with a verified subject.
    pub fn require_identity(&self) -> keygate_core::Result<&Identity> {
        self.identity
            .as_ref()
            .ok_or_else(|| Error::unauthenticated("no identity in call context"))
    }
}
