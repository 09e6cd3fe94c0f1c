//! In-memory collaborator fakes shared by the service test suites.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use keygate_auth::password;
use keygate_core::error::Error;
use keygate_core::models::user::{NewUser, User, UserFilter, UserPatch};
use keygate_core::repository::{ActivationCodeStore, MailSender, SessionStore, UserRepository};

#[derive(Clone, Default)]
pub struct InMemoryUsers {
    users: Arc<Mutex<Vec<User>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

fn matches(user: &User, filter: &UserFilter) -> bool {
    if let Some(id) = filter.id
        && user.id != id
    {
        return false;
    }
    if let Some(email) = &filter.email
        && &user.email != email
    {
        return false;
    }
    if let Some(phone) = &filter.phone_number
        && &user.phone_number != phone
    {
        return false;
    }
    if let Some(name) = &filter.first_name
        && &user.first_name != name
    {
        return false;
    }
    if let Some(name) = &filter.last_name
        && &user.last_name != name
    {
        return false;
    }
    if let Some(roles) = &filter.roles
        && !roles.iter().all(|r| user.roles.contains(r))
    {
        return false;
    }
    if let Some(is_active) = filter.is_active
        && user.is_active != is_active
    {
        return false;
    }
    if let Some(is_confirmed) = filter.is_confirmed
        && user.is_confirmed != is_confirmed
    {
        return false;
    }
    true
}

impl UserRepository for InMemoryUsers {
    async fn insert(&self, user: NewUser) -> keygate_core::Result<u64> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(Error::DuplicateIdentifier {
                field: "email".into(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        users.push(User {
            id,
            email: user.email,
            phone_number: user.phone_number,
            first_name: user.first_name,
            last_name: user.last_name,
            birth_date: user.birth_date,
            password_hash: user.password_hash,
            roles: user.roles,
            is_active: user.is_active,
            is_confirmed: user.is_confirmed,
            created_at: now,
            updated_at: now,
        });

        Ok(id)
    }

    async fn find_one(&self, filter: UserFilter) -> keygate_core::Result<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| matches(u, &filter))
            .cloned()
            .ok_or_else(|| Error::not_found("user"))
    }

    async fn find(&self, filter: UserFilter) -> keygate_core::Result<Vec<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| matches(u, &filter))
            .cloned()
            .collect())
    }

    async fn update(&self, filter: UserFilter, patch: UserPatch) -> keygate_core::Result<()> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| matches(u, &filter))
            .ok_or_else(|| Error::not_found("user"))?;

        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(phone) = patch.phone_number {
            user.phone_number = phone;
        }
        if let Some(name) = patch.first_name {
            user.first_name = name;
        }
        if let Some(name) = patch.last_name {
            user.last_name = name;
        }
        if let Some(birth_date) = patch.birth_date {
            user.birth_date = birth_date;
        }
        if let Some(hash) = patch.password_hash {
            user.password_hash = hash;
        }
        if let Some(roles) = patch.roles {
            user.roles = roles;
        }
        if let Some(is_active) = patch.is_active {
            user.is_active = is_active;
        }
        if let Some(is_confirmed) = patch.is_confirmed {
            user.is_confirmed = is_confirmed;
        }
        user.updated_at = Utc::now();

        Ok(())
    }

    async fn delete(&self, filter: UserFilter) -> keygate_core::Result<()> {
        self.users.lock().unwrap().retain(|u| !matches(u, &filter));
        Ok(())
    }
}

#[derive(Clone)]
pub struct InMemorySessions {
    records: Arc<Mutex<HashMap<u64, DateTime<Utc>>>>,
    ttl_secs: i64,
    /// When set, every call fails with `Unavailable`.
    pub broken: Arc<Mutex<bool>>,
}

impl InMemorySessions {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            ttl_secs,
            broken: Arc::new(Mutex::new(false)),
        }
    }

    fn check_broken(&self) -> keygate_core::Result<()> {
        if *self.broken.lock().unwrap() {
            Err(Error::unavailable("session store down"))
        } else {
            Ok(())
        }
    }
}

impl SessionStore for InMemorySessions {
    async fn save(&self, user_id: u64) -> keygate_core::Result<()> {
        self.check_broken()?;
        self.records
            .lock()
            .unwrap()
            .insert(user_id, Utc::now() + Duration::seconds(self.ttl_secs));
        Ok(())
    }

    async fn exists(&self, user_id: u64) -> keygate_core::Result<bool> {
        self.check_broken()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&user_id)
            .is_some_and(|expires_at| *expires_at > Utc::now()))
    }

    async fn delete(&self, user_id: u64) -> keygate_core::Result<()> {
        self.check_broken()?;
        self.records.lock().unwrap().remove(&user_id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCodes {
    hashes: Arc<Mutex<HashMap<u64, String>>>,
    /// Plaintexts handed out, newest last; lets tests redeem old codes.
    pub issued: Arc<Mutex<Vec<String>>>,
    counter: Arc<AtomicU64>,
}

impl InMemoryCodes {
    pub fn new() -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(1)),
            ..Default::default()
        }
    }
}

impl ActivationCodeStore for InMemoryCodes {
    async fn create(&self, user_id: u64) -> keygate_core::Result<String> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let code = format!("{:06}", n % 1_000_000);
        let hash = password::hash(&code).map_err(Error::from)?;

        self.hashes.lock().unwrap().insert(user_id, hash);
        self.issued.lock().unwrap().push(code.clone());

        Ok(code)
    }

    async fn get(&self, user_id: u64) -> keygate_core::Result<String> {
        self.hashes
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or_else(|| Error::not_found("activation code"))
    }
}

#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MailSender for RecordingMailer {
    async fn send_activation_code(&self, recipient: &str, code: &str) -> keygate_core::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), code.to_string()));
        Ok(())
    }
}
