//! User service — account CRUD, self lookup, and the activation-code
//! challenge/response flow.

use chrono::NaiveDate;
use keygate_core::error::Error;
use keygate_core::models::auth::Identity;
use keygate_core::models::role::Role;
use keygate_core::models::user::{NewUser, User, UserFilter, UserPatch};
use keygate_core::repository::{ActivationCodeStore, MailSender, UserRepository};
use tracing::{error, info};

use crate::password;
use crate::validate::{
    Violations, check_activation_code, check_email, check_min_age, check_name, check_password,
    check_phone_number,
};

const MIN_AGE_YEARS: i32 = 18;

/// Operator-initiated account creation input. Unlike self-registration,
/// roles and flags may be preset.
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub roles: Option<Vec<Role>>,
    pub is_active: Option<bool>,
    pub is_confirmed: Option<bool>,
}

/// Account update input; `password` arrives in plaintext and is hashed
/// before it reaches the store.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub roles: Option<Vec<Role>>,
    pub is_active: Option<bool>,
    pub is_confirmed: Option<bool>,
}

impl AccountPatch {
    fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.phone_number.is_none()
            && self.password.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.birth_date.is_none()
            && self.roles.is_none()
            && self.is_active.is_none()
            && self.is_confirmed.is_none()
    }
}

/// User service.
pub struct UserService<U: UserRepository, A: ActivationCodeStore, M: MailSender> {
    users: U,
    codes: A,
    mailer: M,
}

impl<U: UserRepository, A: ActivationCodeStore, M: MailSender> UserService<U, A, M> {
    pub fn new(users: U, codes: A, mailer: M) -> Self {
        Self {
            users,
            codes,
            mailer,
        }
    }

    /// Create an account on behalf of an operator.
    pub async fn create(&self, data: CreateAccount) -> keygate_core::Result<u64> {
        let mut v = Violations::default();
        check_email(&mut v, "email", &data.email);
        check_phone_number(&mut v, "phoneNumber", &data.phone_number);
        check_password(&mut v, "password", &data.password);
        check_name(&mut v, "firstName", &data.first_name);
        check_name(&mut v, "lastName", &data.last_name);
        check_min_age(&mut v, "birthDate", data.birth_date, MIN_AGE_YEARS);
        v.into_result()?;

        match self.users.find_one(UserFilter::by_email(&data.email)).await {
            Ok(_) => {
                return Err(Error::DuplicateIdentifier {
                    field: "email".into(),
                });
            }
            Err(Error::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let password_hash = password::hash(&data.password)?;

        let id = self
            .users
            .insert(NewUser {
                email: data.email,
                phone_number: data.phone_number,
                first_name: data.first_name,
                last_name: data.last_name,
                birth_date: data.birth_date,
                password_hash,
                roles: data.roles.unwrap_or_else(|| vec![Role::User]),
                is_active: data.is_active.unwrap_or(false),
                is_confirmed: data.is_confirmed.unwrap_or(false),
            })
            .await?;

        info!(user_id = id, "created user");

        Ok(id)
    }

    /// Fetch the single account matching the filter.
    pub async fn find_one(&self, mut filter: UserFilter) -> keygate_core::Result<User> {
        filter.normalize();
        if filter.is_empty() {
            return Err(Error::invalid_field("filter", "at least one field is required"));
        }

        self.users.find_one(filter).await
    }

    /// Fetch every account matching the filter.
    pub async fn find(&self, mut filter: UserFilter) -> keygate_core::Result<Vec<User>> {
        filter.normalize();

        self.users.find(filter).await
    }

    /// Update the single account matching the filter.
    pub async fn update(
        &self,
        mut filter: UserFilter,
        data: AccountPatch,
    ) -> keygate_core::Result<()> {
        filter.normalize();
        if filter.is_empty() {
            return Err(Error::invalid_field("filter", "at least one field is required"));
        }
        if data.is_empty() {
            return Err(Error::invalid_field("update", "no fields to update"));
        }

        // Surface NotFound before bothering with patch validation.
        self.users.find_one(filter.clone()).await?;

        let mut v = Violations::default();
        if let Some(email) = &data.email {
            check_email(&mut v, "email", email);
        }
        if let Some(phone) = &data.phone_number {
            check_phone_number(&mut v, "phoneNumber", phone);
        }
        if let Some(pw) = &data.password {
            check_password(&mut v, "password", pw);
        }
        if let Some(name) = &data.first_name {
            check_name(&mut v, "firstName", name);
        }
        if let Some(name) = &data.last_name {
            check_name(&mut v, "lastName", name);
        }
        if let Some(birth_date) = data.birth_date {
            check_min_age(&mut v, "birthDate", birth_date, MIN_AGE_YEARS);
        }
        v.into_result()?;

        let password_hash = match &data.password {
            Some(pw) => Some(password::hash(pw)?),
            None => None,
        };

        let patch = UserPatch {
            email: data.email,
            phone_number: data.phone_number,
            first_name: data.first_name,
            last_name: data.last_name,
            birth_date: data.birth_date,
            password_hash,
            roles: data.roles,
            is_active: data.is_active,
            is_confirmed: data.is_confirmed,
        };

        match self.users.update(filter, patch).await {
            Ok(()) => Ok(()),
            // A unique-email collision is a field error to the caller.
            Err(Error::DuplicateIdentifier { field }) => {
                Err(Error::invalid_field(field, "is already taken"))
            }
            Err(e) => Err(e),
        }
    }

    /// Delete every account matching the filter.
    pub async fn delete(&self, mut filter: UserFilter) -> keygate_core::Result<()> {
        filter.normalize();
        if filter.is_empty() {
            return Err(Error::invalid_field("filter", "at least one field is required"));
        }

        self.users.delete(filter).await
    }

    /// The authenticated caller's own account.
    pub async fn me(&self, identity: &Identity) -> keygate_core::Result<User> {
        self.users.find_one(UserFilter::by_id(identity.id)).await
    }

    /// Issue (or reissue) the caller's activation challenge and mail the
    /// plaintext code. Reissuing overwrites the previous challenge, so at
    /// most one code is ever redeemable.
    pub async fn send_activation_code(&self, identity: &Identity) -> keygate_core::Result<()> {
        let user = self.users.find_one(UserFilter::by_id(identity.id)).await?;

        if user.is_active {
            return Err(Error::conflict("account is already active"));
        }

        let code = self.codes.create(user.id).await?;

        if let Err(e) = self
            .mailer
            .send_activation_code(&user.email, &code)
            .await
        {
            error!(user_id = user.id, error = %e, "sending activation code");
            return Err(e);
        }

        info!(user_id = user.id, "activation code sent");

        Ok(())
    }

    /// Redeem an activation code, flipping the account active.
    pub async fn check_activation_code(
        &self,
        identity: &Identity,
        code: &str,
    ) -> keygate_core::Result<()> {
        let user = self.users.find_one(UserFilter::by_id(identity.id)).await?;

        if user.is_active {
            return Err(Error::conflict("account is already active"));
        }

        let mut v = Violations::default();
        check_activation_code(&mut v, "activationCode", code);
        v.into_result()?;

        let code_hash = self.codes.get(user.id).await?;

        if !password::verify(code, &code_hash).map_err(Error::from)? {
            return Err(Error::invalid_field("activationCode", "is invalid"));
        }

        self.users
            .update(
                UserFilter::by_id(user.id),
                UserPatch {
                    is_active: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        info!(user_id = user.id, "account activated");

        Ok(())
    }
}
