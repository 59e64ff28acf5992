use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::models::User;

/// Name of the HttpOnly cookie carrying the session token
pub const SESSION_COOKIE: &str = "intellexa_session";

/// A logged-in user's server-side session state
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// In-memory session store keyed by opaque token. Sessions do not survive a
/// restart; users sign in again after a deploy.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `user` and return the token to set as a cookie
    pub fn create(&self, user: &User) -> Uuid {
        let token = Uuid::new_v4();
        let session = Session {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: Utc::now(),
        };

        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(token, session);
        token
    }

    pub fn get(&self, token: Uuid) -> Option<Session> {
        let sessions = self.sessions.lock().unwrap();
        sessions.get(&token).cloned()
    }

    pub fn remove(&self, token: Uuid) -> bool {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.remove(&token).is_some()
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

/// Treats an unparseable stored hash the same as a mismatch
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    bcrypt::verify(password, password_hash).unwrap_or(false)
}
