//! Authentication service — registration, login, token refresh, and
//! logout orchestration.

use chrono::NaiveDate;
use keygate_core::error::Error;
use keygate_core::models::auth::TokenPair;
use keygate_core::models::role::Role;
use keygate_core::models::user::{NewUser, UserFilter};
use keygate_core::repository::{SessionStore, UserRepository};
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::password;
use crate::token;
use crate::validate::{
    Violations, check_email, check_min_age, check_name, check_password, check_phone_number,
};

const MIN_AGE_YEARS: i32 = 18;

/// Self-registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub password_confirmation: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
}

/// Login input; the account is identified by email or phone number.
#[derive(Debug, Clone, Default)]
pub struct LoginCredentials {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password: String,
}

/// Authentication service.
///
/// Generic over the store traits so the service has no dependency on the
/// storage crate.
pub struct AuthService<U: UserRepository, S: SessionStore> {
    users: U,
    sessions: S,
    config: AuthConfig,
}

impl<U: UserRepository, S: SessionStore> AuthService<U, S> {
    pub fn new(users: U, sessions: S, config: AuthConfig) -> Self {
        Self {
            users,
            sessions,
            config,
        }
    }

    /// Register a new account. Returns the assigned subject id.
    ///
    /// New accounts get the ordinary-user role and start inactive until
    /// the activation-code flow confirms the contact address.
    pub async fn register(&self, reg: Registration) -> keygate_core::Result<u64> {
        // 1. Field validation.
        let mut v = Violations::default();
        check_email(&mut v, "email", &reg.email);
        check_phone_number(&mut v, "phoneNumber", &reg.phone_number);
        check_password(&mut v, "password", &reg.password);
        check_password(&mut v, "passwordConfirmation", &reg.password_confirmation);
        if reg.password != reg.password_confirmation {
            v.add("passwordConfirmation", "must match password");
        }
        check_name(&mut v, "firstName", &reg.first_name);
        check_name(&mut v, "lastName", &reg.last_name);
        check_min_age(&mut v, "birthDate", reg.birth_date, MIN_AGE_YEARS);
        v.into_result()?;

        // 2. The contact address is the unique identifier.
        match self.users.find_one(UserFilter::by_email(&reg.email)).await {
            Ok(_) => {
                return Err(Error::DuplicateIdentifier {
                    field: "email".into(),
                });
            }
            Err(Error::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        // 3. Hash and insert.
        let password_hash = password::hash(&reg.password)?;

        let id = self
            .users
            .insert(NewUser {
                email: reg.email.clone(),
                phone_number: reg.phone_number,
                first_name: reg.first_name,
                last_name: reg.last_name,
                birth_date: reg.birth_date,
                password_hash,
                roles: vec![Role::User],
                is_active: false,
                is_confirmed: false,
            })
            .await?;

        info!(user_id = id, email = %reg.email, "registered user");

        Ok(id)
    }

    /// Authenticate by email or phone number + password and issue a token
    /// pair.
    ///
    /// An unknown identifier and a wrong password are indistinguishable to
    /// the caller: both are `InvalidCredentials`.
    pub async fn login(&self, cred: LoginCredentials) -> keygate_core::Result<TokenPair> {
        // 1. Field validation.
        let mut v = Violations::default();
        match (&cred.email, &cred.phone_number) {
            (None, None) => {
                v.add("email", "is required");
                v.add("phoneNumber", "is required");
            }
            (Some(email), _) => check_email(&mut v, "email", email),
            (None, Some(phone)) => check_phone_number(&mut v, "phoneNumber", phone),
        }
        if cred.password.is_empty() {
            v.add("password", "is required");
        }
        v.into_result()?;

        // 2. Look up the account; absence must not be observable.
        let filter = match (&cred.email, &cred.phone_number) {
            (Some(email), _) => UserFilter::by_email(email),
            (None, Some(phone)) => UserFilter {
                phone_number: Some(phone.clone()),
                ..Default::default()
            },
            (None, None) => unreachable!("validated above"),
        };

        let user = match self.users.find_one(filter).await {
            Ok(user) => user,
            Err(Error::NotFound { .. }) => return Err(Error::InvalidCredentials),
            Err(e) => return Err(e),
        };

        // 3. Verify the password.
        if !password::verify(&cred.password, &user.password_hash).map_err(Error::from)? {
            return Err(Error::InvalidCredentials);
        }

        // 4. Issue the pair, then record the session. Order matters: a
        //    pair must never leave without a live session backing its
        //    refresh half.
        let pair = self.issue_pair(user.id, &user.roles)?;
        self.sessions.save(user.id).await?;

        info!(user_id = user.id, "user logged in");

        Ok(pair)
    }

    /// Rotate a refresh token into a fresh pair.
    ///
    /// The token must verify cryptographically AND its subject must hold
    /// a live session — the session record is the revocation mechanism,
    /// so a verified token with no session is still `InvalidToken`.
    pub async fn refresh_token(&self, refresh_token: &str) -> keygate_core::Result<TokenPair> {
        if refresh_token.is_empty() {
            return Err(Error::invalid_field("refreshToken", "is required"));
        }

        // 1. Signature and expiry.
        let identity = token::verify_and_parse(refresh_token, &self.config)?;

        // 2. Session check (revocation).
        if !self.sessions.exists(identity.id).await? {
            warn!(user_id = identity.id, "refresh with revoked session");
            return Err(Error::InvalidToken);
        }

        // 3. Rotate: new pair, session TTL restarted.
        let pair = self.issue_pair(identity.id, &identity.roles)?;
        self.sessions.save(identity.id).await?;

        Ok(pair)
    }

    /// Invalidate the subject's refresh session. Idempotent: logging out
    /// an already-ended session succeeds.
    pub async fn logout(&self, refresh_token: &str) -> keygate_core::Result<()> {
        if refresh_token.is_empty() {
            return Err(Error::invalid_field("refreshToken", "is required"));
        }

        let identity = token::verify_and_parse(refresh_token, &self.config)?;

        self.sessions.delete(identity.id).await?;

        info!(user_id = identity.id, "user logged out");

        Ok(())
    }

    fn issue_pair(&self, user_id: u64, roles: &[Role]) -> keygate_core::Result<TokenPair> {
        let (access_token, _) = token::issue_access_token(user_id, roles, &self.config)?;
        let (refresh_token, _) = token::issue_refresh_token(user_id, roles, &self.config)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
