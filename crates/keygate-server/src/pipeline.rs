//! The request pipeline.
//!
//! Every inbound operation passes through the same fixed sequence:
//! context enrichment → authentication → authorization → ownership
//! pre-check → invocation → result ownership check. A failure at any
//! step rejects the call; the underlying operation is never invoked
//! after a rejection, and a result failing the ownership check is
//! discarded rather than returned.
//!
//! Operations absent from the access-control table are public: identity
//! resolution is skipped and the handler runs unauthenticated.

use keygate_auth::config::AuthConfig;
use keygate_auth::token;
use keygate_core::Error;
use keygate_core::models::auth::{Identity, TokenPair};
use keygate_core::models::user::{User, UserFilter};
use tracing::{Instrument, info, info_span, warn};

use crate::acl::{AccessControlTable, PermissionEntry};
use crate::context::CallContext;
use crate::metadata::Metadata;

/// Capability trait for requests that name an explicit target subject.
///
/// Ownership-restricted operations compare this against the caller's id
/// before invocation. The default (no target) is correct for requests
/// that only ever act on the caller itself.
pub trait TargetsUser {
    fn target_user_id(&self) -> Option<u64> {
        None
    }
}

/// Capability trait for responses carrying a single owned resource.
///
/// Declared by the response type itself, so the pipeline needs no
/// per-operation switch to find the owner after invocation.
pub trait OwnedResponse {
    fn owner_id(&self) -> Option<u64> {
        None
    }
}

impl TargetsUser for () {}
impl TargetsUser for String {}

impl TargetsUser for UserFilter {
    fn target_user_id(&self) -> Option<u64> {
        self.id
    }
}

impl OwnedResponse for () {}
impl OwnedResponse for u64 {}
impl OwnedResponse for TokenPair {}
// A listing is not a single owned resource; list access is gated by
// role alone.
impl OwnedResponse for Vec<User> {}

impl OwnedResponse for User {
    fn owner_id(&self) -> Option<u64> {
        Some(self.id)
    }
}

/// The per-call middleware, shared by every operation the app exposes.
pub struct Pipeline {
    table: AccessControlTable,
    config: AuthConfig,
}

impl Pipeline {
    pub fn new(table: AccessControlTable, config: AuthConfig) -> Self {
        Self { table, config }
    }

    /// Run one call through the full sequence.
    pub async fn dispatch<Req, Res, F, Fut>(
        &self,
        operation: &'static str,
        meta: &Metadata,
        request: Req,
        handler: F,
    ) -> keygate_core::Result<Res>
    where
        Req: TargetsUser,
        Res: OwnedResponse,
        F: FnOnce(CallContext, Req) -> Fut,
        Fut: Future<Output = keygate_core::Result<Res>>,
    {
        // Context enrichment never fails; missing trace metadata is
        // tolerated.
        let ctx = CallContext::from_metadata(meta);

        let span = info_span!(
            "call",
            operation,
            request_id = %ctx.request_id,
            client_ip = %ctx.client_ip,
        );

        async {
            info!("request");
            let result = self.run(operation, meta, ctx, request, handler).await;
            match &result {
                Ok(_) => info!(status = "ok", "response"),
                Err(e) => warn!(status = error_kind(e), "response"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run<Req, Res, F, Fut>(
        &self,
        operation: &'static str,
        meta: &Metadata,
        mut ctx: CallContext,
        request: Req,
        handler: F,
    ) -> keygate_core::Result<Res>
    where
        Req: TargetsUser,
        Res: OwnedResponse,
        F: FnOnce(CallContext, Req) -> Fut,
        Fut: Future<Output = keygate_core::Result<Res>>,
    {
        let guard = match self.table.lookup(operation) {
            Some(entry) => {
                let identity = self.authenticate(meta)?;
                authorize(&identity, entry)?;
                if entry.ownership_restricted {
                    check_request_ownership(&identity, &request)?;
                }
                ctx.attach_identity(identity.clone());
                Some((identity, entry.ownership_restricted))
            }
            // Public operation: no identity resolution at all.
            None => None,
        };

        let response = handler(ctx, request).await?;

        // Defense in depth: a lookup by non-identity fields may resolve
        // to another subject's record; the owner is only knowable from
        // the result.
        if let Some((identity, true)) = guard {
            check_result_ownership(&identity, &response)?;
        }

        Ok(response)
    }

    fn authenticate(&self, meta: &Metadata) -> keygate_core::Result<Identity> {
        let token = meta
            .bearer_token()
            .ok_or_else(|| Error::unauthenticated("missing bearer token"))?;

        Ok(token::verify_and_parse(token, &self.config)?)
    }
}

fn authorize(identity: &Identity, entry: &PermissionEntry) -> keygate_core::Result<()> {
    if identity
        .roles
        .iter()
        .any(|role| entry.allowed_roles.contains(role))
    {
        Ok(())
    } else {
        Err(Error::permission_denied(format!(
            "no permitted role for {}",
            entry.operation
        )))
    }
}

fn check_request_ownership<Req: TargetsUser>(
    identity: &Identity,
    request: &Req,
) -> keygate_core::Result<()> {
    if identity.is_elevated() {
        return Ok(());
    }
    if let Some(target) = request.target_user_id()
        && target != identity.id
    {
        return Err(Error::permission_denied("target subject is not the caller"));
    }
    Ok(())
}

fn check_result_ownership<Res: OwnedResponse>(
    identity: &Identity,
    response: &Res,
) -> keygate_core::Result<()> {
    if identity.is_elevated() {
        return Ok(());
    }
    if let Some(owner) = response.owner_id()
        && owner != identity.id
    {
        return Err(Error::permission_denied("resource owner is not the caller"));
    }
    Ok(())
}

fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::Unauthenticated { .. } => "unauthenticated",
        Error::PermissionDenied { .. } => "permission_denied",
        Error::InvalidToken => "invalid_token",
        Error::ExpiredToken => "expired_token",
        Error::InvalidCredentials => "invalid_credentials",
        Error::Validation(_) => "validation_failed",
        Error::DuplicateIdentifier { .. } => "duplicate_identifier",
        Error::NotFound { .. } => "not_found",
        Error::Conflict { .. } => "conflict",
        Error::Unavailable { .. } => "unavailable",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use keygate_core::models::role::Role;

    use super::*;
    use crate::acl::{OperationSpec, PermissionEntry};
    use crate::metadata;

    const GET: &str = "test.Get";
    const PING: &str = "test.Ping";

    fn table() -> AccessControlTable {
        let registry = &[
            OperationSpec {
                name: GET,
                public: false,
            },
            OperationSpec {
                name: PING,
                public: true,
            },
        ];
        let policy = &[PermissionEntry {
            operation: GET,
            allowed_roles: &[Role::User, Role::Admin],
            ownership_restricted: true,
        }];
        AccessControlTable::from_parts(registry, policy).unwrap()
    }

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "pipeline-test-secret".into(),
            ..Default::default()
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(table(), config())
    }

    fn bearer(id: u64, roles: &[Role]) -> Metadata {
        let (token, _) = token::issue_access_token(id, roles, &config()).unwrap();
        Metadata::new().with(metadata::AUTHORIZATION, format!("Bearer {token}"))
    }

    fn user(id: u64) -> User {
        User {
            id,
            email: format!("u{id}@x.com"),
            phone_number: "+12345678901".into(),
            first_name: "U".into(),
            last_name: "Ser".into(),
            birth_date: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            password_hash: String::new(),
            roles: vec![Role::User],
            is_active: true,
            is_confirmed: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn public_operation_runs_without_metadata() {
        let result = pipeline()
            .dispatch(PING, &Metadata::new(), (), |ctx, ()| async move {
                assert!(ctx.identity().is_none());
                Ok(1u64)
            })
            .await;

        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_token_is_unauthenticated_and_skips_handler() {
        let invoked = Arc::new(AtomicBool::new(false));
        let flag = invoked.clone();

        let err = pipeline()
            .dispatch(GET, &Metadata::new(), UserFilter::by_id(1), |_, _| {
                let flag = flag.clone();
                async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(user(1))
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Unauthenticated { .. }));
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let meta = Metadata::new().with(metadata::AUTHORIZATION, "Bearer junk");

        let err = pipeline()
            .dispatch(GET, &meta, UserFilter::by_id(1), |_, _| async {
                Ok(user(1))
            })
            .await
            .unwrap_err();

        assert_eq!(err, Error::InvalidToken);
    }

    #[tokio::test]
    async fn unpermitted_role_is_denied() {
        let meta = bearer(1, &[Role::Support]);

        let err = pipeline()
            .dispatch(GET, &meta, UserFilter::by_id(1), |_, _| async {
                Ok(user(1))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn request_targeting_another_subject_is_denied_before_invocation() {
        let invoked = Arc::new(AtomicBool::new(false));
        let flag = invoked.clone();
        let meta = bearer(1, &[Role::User]);

        let err = pipeline()
            .dispatch(GET, &meta, UserFilter::by_id(2), |_, _| {
                let flag = flag.clone();
                async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(user(2))
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PermissionDenied { .. }));
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn result_owned_by_another_subject_is_discarded() {
        // The filter names no subject, so the request-time check passes;
        // only the result reveals the mismatch.
        let meta = bearer(1, &[Role::User]);

        let err = pipeline()
            .dispatch(GET, &meta, UserFilter::by_email("other@x.com"), |_, _| {
                async { Ok(user(2)) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn elevated_role_bypasses_both_ownership_checks() {
        let meta = bearer(1, &[Role::Admin]);

        let fetched = pipeline()
            .dispatch(GET, &meta, UserFilter::by_id(2), |_, _| async {
                Ok(user(2))
            })
            .await
            .unwrap();

        assert_eq!(fetched.id, 2);
    }

    #[tokio::test]
    async fn own_resource_passes_both_checks() {
        let meta = bearer(7, &[Role::User]);

        let fetched = pipeline()
            .dispatch(GET, &meta, UserFilter::by_id(7), |ctx, _| async move {
                assert_eq!(ctx.require_identity().unwrap().id, 7);
                Ok(user(7))
            })
            .await
            .unwrap();

        assert_eq!(fetched.id, 7);
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let cfg = config();
        let now = chrono::Utc::now();
        let claims = token::Claims {
            sub: "1".into(),
            roles: vec!["user".into()],
            iat: (now - chrono::Duration::hours(2)).timestamp(),
            exp: (now - chrono::Duration::hours(1)).timestamp(),
            jti: "test".into(),
        };
        let key = jsonwebtoken::EncodingKey::from_secret(cfg.jwt_secret.as_bytes());
        let stale =
            jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &key).unwrap();
        let meta =
            Metadata::new().with(metadata::AUTHORIZATION, format!("Bearer {stale}"));

        let err = pipeline()
            .dispatch(GET, &meta, UserFilter::by_id(1), |_, _| async {
                Ok(user(1))
            })
            .await
            .unwrap_err();

        assert_eq!(err, Error::ExpiredToken);
    }
}
