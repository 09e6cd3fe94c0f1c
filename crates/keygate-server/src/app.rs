//! The application facade: one method per exposed operation, each
//! dispatched through the request pipeline.
//!
//! Wire marshaling lives outside this crate; a transport adapter maps
//! its requests onto these methods and its metadata onto [`Metadata`].

use keygate_auth::account::{AccountPatch, CreateAccount};
use keygate_auth::config::AuthConfig;
use keygate_auth::service::{LoginCredentials, Registration};
use keygate_auth::{AuthService, UserService};
use keygate_core::models::auth::TokenPair;
use keygate_core::models::user::{User, UserFilter};
use keygate_core::repository::MailSender;
use keygate_store::{SurrealActivationCodeStore, SurrealSessionStore, SurrealUserStore};
use surrealdb::{Connection, Surreal};

use crate::acl::{AccessControlTable, AclError, op};
use crate::mailer::LogMailer;
use crate::metadata::Metadata;
use crate::pipeline::{Pipeline, TargetsUser};

impl TargetsUser for Registration {}
impl TargetsUser for LoginCredentials {}
impl TargetsUser for CreateAccount {}

/// Update request: which account, and what to change.
#[derive(Debug, Clone)]
pub struct UpdateAccount {
    pub filter: UserFilter,
    pub data: AccountPatch,
}

impl TargetsUser for UpdateAccount {
    fn target_user_id(&self) -> Option<u64> {
        self.filter.id
    }
}

/// The assembled service: pipeline + services + stores.
pub struct App<C: Connection, M: MailSender = LogMailer> {
    pipeline: Pipeline,
    auth: AuthService<SurrealUserStore<C>, SurrealSessionStore<C>>,
    users: UserService<SurrealUserStore<C>, SurrealActivationCodeStore<C>, M>,
}

impl<C: Connection, M: MailSender> App<C, M> {
    /// Wire services and stores over one database handle. Fails fast
    /// when the access-control table is inconsistent with the operation
    /// registry.
    pub fn new(db: Surreal<C>, config: AuthConfig, mailer: M) -> Result<Self, AclError> {
        let table = AccessControlTable::build()?;

        let user_store = SurrealUserStore::new(db.clone());
        let sessions =
            SurrealSessionStore::new(db.clone(), config.refresh_token_ttl_secs as i64);
        let codes =
            SurrealActivationCodeStore::new(db, config.activation_code_ttl_secs as i64);

        Ok(Self {
            auth: AuthService::new(user_store.clone(), sessions, config.clone()),
            users: UserService::new(user_store, codes, mailer),
            pipeline: Pipeline::new(table, config),
        })
    }

    // -------------------------------------------------------------------
    // Auth operations (public)
    // -------------------------------------------------------------------

    pub async fn register(
        &self,
        meta: &Metadata,
        registration: Registration,
    ) -> keygate_core::Result<u64> {
        self.pipeline
            .dispatch(op::AUTH_REGISTER, meta, registration, |_ctx, reg| {
                self.auth.register(reg)
            })
            .await
    }

    pub async fn login(
        &self,
        meta: &Metadata,
        credentials: LoginCredentials,
    ) -> keygate_core::Result<TokenPair> {
        self.pipeline
            .dispatch(op::AUTH_LOGIN, meta, credentials, |_ctx, cred| {
                self.auth.login(cred)
            })
            .await
    }

    pub async fn refresh_token(
        &self,
        meta: &Metadata,
        refresh_token: String,
    ) -> keygate_core::Result<TokenPair> {
        self.pipeline
            .dispatch(op::AUTH_REFRESH_TOKEN, meta, refresh_token, |_ctx, tok| {
                async move { self.auth.refresh_token(&tok).await }
            })
            .await
    }

    pub async fn logout(&self, meta: &Metadata, refresh_token: String) -> keygate_core::Result<()> {
        self.pipeline
            .dispatch(op::AUTH_LOGOUT, meta, refresh_token, |_ctx, tok| {
                async move { self.auth.logout(&tok).await }
            })
            .await
    }

    // -------------------------------------------------------------------
    // User operations (gated by the access-control table)
    // -------------------------------------------------------------------

    pub async fn create(
        &self,
        meta: &Metadata,
        account: CreateAccount,
    ) -> keygate_core::Result<u64> {
        self.pipeline
            .dispatch(op::USER_CREATE, meta, account, |_ctx, account| {
                self.users.create(account)
            })
            .await
    }

    pub async fn get(&self, meta: &Metadata, filter: UserFilter) -> keygate_core::Result<User> {
        self.pipeline
            .dispatch(op::USER_GET, meta, filter, |_ctx, filter| {
                self.users.find_one(filter)
            })
            .await
    }

    pub async fn get_all(
        &self,
        meta: &Metadata,
        filter: UserFilter,
    ) -> keygate_core::Result<Vec<User>> {
        self.pipeline
            .dispatch(op::USER_GET_ALL, meta, filter, |_ctx, filter| {
                self.users.find(filter)
            })
            .await
    }

    pub async fn update(
        &self,
        meta: &Metadata,
        request: UpdateAccount,
    ) -> keygate_core::Result<()> {
        self.pipeline
            .dispatch(op::USER_UPDATE, meta, request, |_ctx, req| {
                self.users.update(req.filter, req.data)
            })
            .await
    }

    pub async fn delete(&self, meta: &Metadata, filter: UserFilter) -> keygate_core::Result<()> {
        self.pipeline
            .dispatch(op::USER_DELETE, meta, filter, |_ctx, filter| {
                self.users.delete(filter)
            })
            .await
    }

    pub async fn me(&self, meta: &Metadata) -> keygate_core::Result<User> {
        self.pipeline
            .dispatch(op::USER_ME, meta, (), |ctx, ()| async move {
                self.users.me(ctx.require_identity()?).await
            })
            .await
    }

    pub async fn send_activation_code(&self, meta: &Metadata) -> keygate_core::Result<()> {
        self.pipeline
            .dispatch(op::USER_SEND_ACTIVATION_CODE, meta, (), |ctx, ()| {
                async move {
                    self.users
                        .send_activation_code(ctx.require_identity()?)
                        .await
                }
            })
            .await
    }

    pub async fn check_activation_code(
        &self,
        meta: &Metadata,
        code: String,
    ) -> keygate_core::Result<()> {
        self.pipeline
            .dispatch(op::USER_CHECK_ACTIVATION_CODE, meta, code, |ctx, code| {
                async move {
                    self.users
                        .check_activation_code(ctx.require_identity()?, &code)
                        .await
                }
            })
            .await
    }
}
