use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use crate::{types::Session, utils};

pub const SESSION_COOKIE: &str = "agetracks_session";
const SESSION_ID_LEN: usize = 64;

/// A login that never reached `/callback` is dropped after ten minutes.
pub const PENDING_TTL_SECS: i64 = 10 * 60;
/// Signed-in sessions are kept this long past token expiry so the refresh
/// token can still be used.
pub const EXPIRED_GRACE_SECS: i64 = 7 * 24 * 60 * 60;
pub const MAX_SESSIONS: usize = 10_000;

/// In-memory session store keyed by a random id.
///
/// The browser only ever holds `<id>.<signature>`; the tokens stay on the
/// server. Cloning the manager shares the underlying map.
///
/// Stale sessions are dropped on lookup and whenever a new one is created,
/// and the map never holds more than `max_sessions` entries.
#[derive(Clone)]
pub struct SessionManager {
    secret: String,
    max_sessions: usize,
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionManager {
    pub fn new(secret: String) -> Self {
        Self::with_capacity(secret, MAX_SESSIONS)
    }

    pub fn with_capacity(secret: String, max_sessions: usize) -> Self {
        SessionManager {
            secret,
            max_sessions: max_sessions.max(1),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Stores `session` under a fresh id and returns the id.
    ///
    /// `created_at` is stamped here. When the store is full the oldest
    /// unauthenticated session goes first.
    pub async fn create(&self, mut session: Session) -> String {
        let now = utils::now_timestamp();
        session.created_at = now;

        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, s| !is_stale(s, now));

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = oldest_session(&sessions) else {
                break;
            };
            sessions.remove(&oldest);
        }

        let id = utils::generate_random_string(SESSION_ID_LEN);
        sessions.insert(id.clone(), session);
        id
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(id) {
            Some(session) if is_stale(session, utils::now_timestamp()) => {
                sessions.remove(id);
                None
            }
            session => session.cloned(),
        }
    }

    pub async fn put(&self, id: &str, session: Session) {
        self.sessions.lock().await.insert(id.to_string(), session);
    }

    pub async fn remove(&self, id: &str) {
        self.sessions.lock().await.remove(id);
    }

    /// Drops every session that is stale at `now` and returns how many went.
    pub async fn purge_expired(&self, now: i64) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| !is_stale(s, now));
        before - sessions.len()
    }

    /// Number of sessions currently held.
    pub async fn count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub fn cookie_value(&self, id: &str) -> String {
        format!("{}.{}", id, utils::sign(&self.secret, id))
    }

    pub fn set_cookie_header(&self, id: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            self.cookie_value(id)
        )
    }

    /// Extracts and verifies the session id from a raw `Cookie` header.
    ///
    /// Returns `None` when the cookie is absent or its signature doesn't
    /// match.
    pub fn session_id_from_cookie(&self, header: &str) -> Option<String> {
        let value = header.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE).then_some(value)
        })?;

        let (id, signature) = value.rsplit_once('.')?;
        if id.is_empty() || !utils::verify_signature(&self.secret, id, signature) {
            return None;
        }

        Some(id.to_string())
    }
}

fn is_stale(session: &Session, now: i64) -> bool {
    if session.is_authenticated() {
        now > session.expires_at + EXPIRED_GRACE_SECS
    } else {
        now > session.created_at + PENDING_TTL_SECS
    }
}

fn oldest_session(sessions: &HashMap<String, Session>) -> Option<String> {
    sessions
        .iter()
        .min_by_key(|(_, s)| (s.is_authenticated(), s.created_at))
        .map(|(id, _)| id.clone())
}
