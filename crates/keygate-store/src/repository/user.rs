//! SurrealDB implementation of [`UserRepository`].
//!
//! Subject ids are numeric record ids allocated from the `counter`
//! table; a single `UPSERT ... value += 1` statement keeps allocation
//! atomic without a transaction. Filter-driven queries assemble their
//! WHERE clause from the fields the filter actually sets.

use chrono::{DateTime, NaiveDate, Utc};
use keygate_core::Error;
use keygate_core::models::role::Role;
use keygate_core::models::user::{NewUser, User, UserFilter, UserPatch};
use keygate_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::StoreError;

const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: u64,
    email: String,
    phone_number: String,
    first_name: String,
    last_name: String,
    birth_date: String,
    password_hash: String,
    roles: Vec<String>,
    is_active: bool,
    is_confirmed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, StoreError> {
        let birth_date = NaiveDate::parse_from_str(&self.birth_date, BIRTH_DATE_FORMAT)
            .map_err(|e| StoreError::Malformed(format!("invalid birth date: {e}")))?;

        let roles = self
            .roles
            .iter()
            .map(|name| {
                Role::parse(name)
                    .ok_or_else(|| StoreError::Malformed(format!("unknown role: {name}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(User {
            id: self.record_id,
            email: self.email,
            phone_number: self.phone_number,
            first_name: self.first_name,
            last_name: self.last_name,
            birth_date,
            password_hash: self.password_hash,
            roles,
            is_active: self.is_active,
            is_confirmed: self.is_confirmed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CounterRow {
    value: u64,
}

fn role_strings(roles: &[Role]) -> Vec<String> {
    roles.iter().map(|r| r.as_str().to_string()).collect()
}

/// Map a write error onto the duplicate-identifier kind when a unique
/// index on a contact field was violated.
fn map_write_err(err: surrealdb::Error) -> Error {
    let text = err.to_string();
    if text.contains("idx_user_email") {
        return Error::DuplicateIdentifier {
            field: "email".into(),
        };
    }
    if text.contains("idx_user_phone") {
        return Error::DuplicateIdentifier {
            field: "phoneNumber".into(),
        };
    }
    StoreError::Surreal(err).into()
}

/// WHERE clause for the fields the filter sets; the matching binds are
/// applied by `bind_filter!`.
fn where_clause(filter: &UserFilter) -> String {
    let mut conds: Vec<&'static str> = Vec::new();
    if filter.id.is_some() {
        conds.push("meta::id(id) = $id");
    }
    if filter.email.is_some() {
        conds.push("email = $email");
    }
    if filter.phone_number.is_some() {
        conds.push("phone_number = $phone_number");
    }
    if filter.first_name.is_some() {
        conds.push("first_name = $first_name");
    }
    if filter.last_name.is_some() {
        conds.push("last_name = $last_name");
    }
    if filter.roles.is_some() {
        conds.push("roles CONTAINSALL $roles");
    }
    if filter.is_active.is_some() {
        conds.push("is_active = $is_active");
    }
    if filter.is_confirmed.is_some() {
        conds.push("is_confirmed = $is_confirmed");
    }

    if conds.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conds.join(" AND "))
    }
}

/// Apply the filter's binds to a query builder without naming the
/// builder type.
macro_rules! bind_filter {
    ($query:expr, $filter:expr) => {{
        let mut query = $query;
        let filter = $filter;
        if let Some(id) = filter.id {
            query = query.bind(("id", id));
        }
        if let Some(email) = filter.email {
            query = query.bind(("email", email));
        }
        if let Some(phone) = filter.phone_number {
            query = query.bind(("phone_number", phone));
        }
        if let Some(name) = filter.first_name {
            query = query.bind(("first_name", name));
        }
        if let Some(name) = filter.last_name {
            query = query.bind(("last_name", name));
        }
        if let Some(roles) = filter.roles {
            query = query.bind(("roles", role_strings(&roles)));
        }
        if let Some(is_active) = filter.is_active {
            query = query.bind(("is_active", is_active));
        }
        if let Some(is_confirmed) = filter.is_confirmed {
            query = query.bind(("is_confirmed", is_confirmed));
        }
        query
    }};
}

/// SurrealDB implementation of the user store.
pub struct SurrealUserStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealUserStore<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealUserStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn next_id(&self) -> Result<u64, StoreError> {
        let mut result = self
            .db
            .query("UPSERT type::record('counter', 'user') SET value += 1")
            .await?;

        let rows: Vec<CounterRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|row| row.value)
            .ok_or_else(|| StoreError::Malformed("counter returned no row".into()))
    }
}

impl<C: Connection> UserRepository for SurrealUserStore<C> {
    async fn insert(&self, user: NewUser) -> keygate_core::Result<u64> {
        let id = self.next_id().await?;

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 email = $email, \
                 phone_number = $phone_number, \
                 first_name = $first_name, \
                 last_name = $last_name, \
                 birth_date = $birth_date, \
                 password_hash = $password_hash, \
                 roles = $roles, \
                 is_active = $is_active, \
                 is_confirmed = $is_confirmed",
            )
            .bind(("id", id))
            .bind(("email", user.email))
            .bind(("phone_number", user.phone_number))
            .bind(("first_name", user.first_name))
            .bind(("last_name", user.last_name))
            .bind((
                "birth_date",
                user.birth_date.format(BIRTH_DATE_FORMAT).to_string(),
            ))
            .bind(("password_hash", user.password_hash))
            .bind(("roles", role_strings(&user.roles)))
            .bind(("is_active", user.is_active))
            .bind(("is_confirmed", user.is_confirmed))
            .await
            .map_err(StoreError::from)?;

        result.check().map_err(map_write_err)?;

        Ok(id)
    }

    async fn find_one(&self, filter: UserFilter) -> keygate_core::Result<User> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM user{} LIMIT 1",
            where_clause(&filter)
        );

        let mut result = bind_filter!(self.db.query(query), filter)
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(StoreError::from)?;
        let row = rows.into_iter().next().ok_or(StoreError::NotFound {
            entity: "user".into(),
        })?;

        Ok(row.try_into_user()?)
    }

    async fn find(&self, filter: UserFilter) -> keygate_core::Result<Vec<User>> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM user{} ORDER BY created_at ASC",
            where_clause(&filter)
        );

        let mut result = bind_filter!(self.db.query(query), filter)
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(StoreError::from)?;

        Ok(rows
            .into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, StoreError>>()?)
    }

    async fn update(&self, filter: UserFilter, patch: UserPatch) -> keygate_core::Result<()> {
        let mut sets = Vec::new();
        if patch.email.is_some() {
            sets.push("email = $set_email");
        }
        if patch.phone_number.is_some() {
            sets.push("phone_number = $set_phone_number");
        }
        if patch.first_name.is_some() {
            sets.push("first_name = $set_first_name");
        }
        if patch.last_name.is_some() {
            sets.push("last_name = $set_last_name");
        }
        if patch.birth_date.is_some() {
            sets.push("birth_date = $set_birth_date");
        }
        if patch.password_hash.is_some() {
            sets.push("password_hash = $set_password_hash");
        }
        if patch.roles.is_some() {
            sets.push("roles = $set_roles");
        }
        if patch.is_active.is_some() {
            sets.push("is_active = $set_is_active");
        }
        if patch.is_confirmed.is_some() {
            sets.push("is_confirmed = $set_is_confirmed");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE user SET {}{} RETURN VALUE meta::id(id)",
            sets.join(", "),
            where_clause(&filter)
        );

        let mut builder = bind_filter!(self.db.query(query), filter);

        if let Some(email) = patch.email {
            builder = builder.bind(("set_email", email));
        }
        if let Some(phone) = patch.phone_number {
            builder = builder.bind(("set_phone_number", phone));
        }
        if let Some(name) = patch.first_name {
            builder = builder.bind(("set_first_name", name));
        }
        if let Some(name) = patch.last_name {
            builder = builder.bind(("set_last_name", name));
        }
        if let Some(birth_date) = patch.birth_date {
            builder = builder.bind((
                "set_birth_date",
                birth_date.format(BIRTH_DATE_FORMAT).to_string(),
            ));
        }
        if let Some(hash) = patch.password_hash {
            builder = builder.bind(("set_password_hash", hash));
        }
        if let Some(roles) = patch.roles {
            builder = builder.bind(("set_roles", role_strings(&roles)));
        }
        if let Some(is_active) = patch.is_active {
            builder = builder.bind(("set_is_active", is_active));
        }
        if let Some(is_confirmed) = patch.is_confirmed {
            builder = builder.bind(("set_is_confirmed", is_confirmed));
        }

        let result = builder.await.map_err(StoreError::from)?;
        let mut result = result.check().map_err(map_write_err)?;

        let updated: Vec<u64> = result.take(0).map_err(StoreError::from)?;
        if updated.is_empty() {
            return Err(Error::not_found("user"));
        }

        Ok(())
    }

    async fn delete(&self, filter: UserFilter) -> keygate_core::Result<()> {
        let query = format!("DELETE user{}", where_clause(&filter));

        bind_filter!(self.db.query(query), filter)
            .await
            .map_err(StoreError::from)?;

        Ok(())
    }
}
