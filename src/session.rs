// src/session.rs
//! In-memory session store guarding the dashboard routes.
//!
//! There is no credential backend: any non-empty email/password pair signs
//! in as a plain `user`. Tokens are opaque hex strings derived from
//! random bytes and expire after [`SESSION_TTL`].

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error("not signed in")]
    Unauthenticated,
}

pub const SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

struct Entry {
    user: User,
    issued_at: Instant,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.trim().is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let user = User {
            email: email.to_string(),
            role: "user".to_string(),
        };
        let token = issue_token();
        let now = Instant::now();
        let mut sessions = self.sessions.write().expect("sessions poisoned");
        sessions.retain(|_, e| now.duration_since(e.issued_at) < self.ttl);
        sessions.insert(
            token.clone(),
            Entry {
                user: user.clone(),
                issued_at: now,
            },
        );
        drop(sessions);
        info!(target: "auth", email = %user.email, "signed in");
        Ok(Session { token, user })
    }

    /// Returns whether a session was removed.
    pub fn logout(&self, token: &str) -> bool {
        self.sessions
            .write()
            .expect("sessions poisoned")
            .remove(token)
            .is_some()
    }

    pub fn user(&self, token: &str) -> Result<User, AuthError> {
        self.sessions
            .read()
            .expect("sessions poisoned")
            .get(token)
            .filter(|e| e.issued_at.elapsed() < self.ttl)
            .map(|e| e.user.clone())
            .ok_or(AuthError::Unauthenticated)
    }

    /// Live plus not-yet-evicted sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().expect("sessions poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn issue_token() -> String {
    let mut seed = [0u8; 32];
    rand::rng().fill_bytes(&mut seed);
    let digest = Sha256::digest(seed);
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
