use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use std::{
    collections::HashMap,
    convert::Infallible,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Role, Task};
use crate::AppState;

pub const SESSION_COOKIE: &str = "session_id";

/// Anonymous sessions only exist to carry flashes across a redirect.
const ANONYMOUS_SESSION_TTL: Duration = Duration::from_secs(10 * 60);
const MAX_ANONYMOUS_SESSIONS: usize = 10_000;

struct SessionData {
    username: Option<String>,
    flashes: Vec<String>,
    touched: Instant,
}

impl SessionData {
    fn new(username: Option<String>) -> Self {
        SessionData {
            username,
            flashes: Vec::new(),
            touched: Instant::now(),
        }
    }
}

/// Server-side sessions keyed by the random id carried in the cookie.
///
/// Signed-in sessions live until logout or the next login. Sessions without a
/// user go away once their flashes are shown; unvisited ones expire or get
/// evicted past `anonymous_limit`.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
    anonymous_ttl: Duration,
    anonymous_limit: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        SessionStore::new(ANONYMOUS_SESSION_TTL, MAX_ANONYMOUS_SESSIONS)
    }
}

impl SessionStore {
    pub fn new(anonymous_ttl: Duration, anonymous_limit: usize) -> Self {
        SessionStore {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            anonymous_ttl,
            anonymous_limit,
        }
    }

    pub async fn create(&self, username: Option<String>) -> String {
        let session_id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        if username.is_none() {
            self.prune_anonymous(&mut sessions, Instant::now());
        }
        sessions.insert(session_id.clone(), SessionData::new(username));
        session_id
    }

    /// Expires stale anonymous sessions and, when still at the limit, evicts
    /// the oldest one to make room.
    fn prune_anonymous(&self, sessions: &mut HashMap<String, SessionData>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, s| s.username.is_some() || now.duration_since(s.touched) < self.anonymous_ttl);
        let expired = before - sessions.len();
        if expired > 0 {
            log::debug!("Expired {} anonymous session(s)", expired);
        }

        let anonymous = sessions.values().filter(|s| s.username.is_none()).count();
        if anonymous >= self.anonymous_limit {
            let oldest = sessions
                .iter()
                .filter(|(_, s)| s.username.is_none())
                .min_by_key(|(_, s)| s.touched)
                .map(|(id, _)| id.clone());
            if let Some(id) = oldest {
                log::warn!("Anonymous session limit of {} reached, evicting oldest", self.anonymous_limit);
                sessions.remove(&id);
            }
        }
    }

    pub async fn exists(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    pub async fn username(&self, session_id: &str) -> Option<String> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .and_then(|s| s.username.clone())
    }

    /// Drops the signed-in user but keeps the session until the logout flash
    /// has been shown.
    pub async fn sign_out(&self, session_id: &str) -> Option<String> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(session_id)?;
        session.touched = Instant::now();
        session.username.take()
    }

    pub async fn remove(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }

    pub async fn push_flash(&self, session_id: &str, message: String) {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionData::new(None));
        session.touched = Instant::now();
        session.flashes.push(message);
    }

    /// Hands out pending flashes. A session without a user has nothing left
    /// to carry afterwards and is removed.
    pub async fn take_flashes(&self, session_id: &str) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return Vec::new();
        };
        let flashes = std::mem::take(&mut session.flashes);
        if session.username.is_none() {
            sessions.remove(session_id);
        }
        flashes
    }

    #[cfg(test)]
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

pub fn extract_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookie_str| cookie_str.split(';'))
        .find_map(|cookie| cookie.trim().strip_prefix("session_id="))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

pub fn session_cookie(session_id: &str, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}={session_id}; HttpOnly; Path=/; SameSite=Strict{secure}")
}

#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub username: String,
    pub role: Role,
}

/// Who is making the request, resolved once per request from the session cookie.
pub struct RequestContext {
    session_id: Option<String>,
    pub user: Option<CurrentUser>,
}

impl RequestContext {
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }

    pub fn is_admin(&self) -> bool {
        matches!(&self.user, Some(user) if user.role == Role::Admin)
    }

    pub fn owns(&self, task: &Task) -> bool {
        self.username() == Some(task.created_by.as_str())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(session_id) = extract_session_id(&parts.headers) else {
            return Ok(RequestContext { session_id: None, user: None });
        };

        if !state.sessions.exists(&session_id).await {
            return Ok(RequestContext { session_id: None, user: None });
        }

        let user = match state.sessions.username(&session_id).await {
            Some(username) => match state.accounts.find_user(&username).await {
                Ok(found) => found.map(|u| CurrentUser {
                    username: u.user_name,
                    role: u.role,
                }),
                Err(e) => {
                    log::error!("Failed to load session user '{}': {}", username, e);
                    None
                }
            },
            None => None,
        };

        Ok(RequestContext {
            session_id: Some(session_id),
            user,
        })
    }
}
