//! In-memory browser sessions.
//!
//! Sessions live for a fixed maximum lifetime counted from login. Expired
//! entries are treated as absent and dropped when looked up or when a new
//! session is created.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sp_session";

/// A logged-in browser session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Subject email.
    pub email: String,
    /// Display name at login time.
    pub display_name: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Returns true once the session is older than `max_lifetime` at `now`.
    #[must_use]
    pub fn is_expired(&self, max_lifetime: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at) > max_lifetime
    }
}

/// Session store keyed by random session ID.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    max_lifetime: Duration,
}

impl SessionStore {
    /// Creates an empty store whose sessions last at most `max_lifetime`.
    #[must_use]
    pub fn new(max_lifetime: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_lifetime,
        }
    }

    /// Returns the configured maximum session age.
    #[must_use]
    pub const fn max_lifetime(&self) -> Duration {
        self.max_lifetime
    }

    /// Creates a session and returns its ID.
    pub fn create(&self, email: &str, display_name: &str) -> String {
        self.create_at(email, display_name, Utc::now())
    }

    fn create_at(&self, email: &str, display_name: &str, now: DateTime<Utc>) -> String {
        self.purge_expired(now);
        let id = sp_crypto::random_session_id();
        self.sessions.insert(
            id.clone(),
            Session {
                email: email.to_string(),
                display_name: display_name.to_string(),
                created_at: now,
            },
        );
        id
    }

    /// Looks up a live session.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        self.get_at(id, Utc::now())
    }

    /// Looks up a session as of `now`, removing it if it has expired.
    #[must_use]
    pub fn get_at(&self, id: &str, now: DateTime<Utc>) -> Option<Session> {
        let session = self.sessions.get(id).map(|s| s.value().clone())?;
        if session.is_expired(self.max_lifetime, now) {
            self.sessions.remove(id);
            tracing::debug!(email = %session.email, "session expired");
            return None;
        }
        Some(session)
    }

    /// Ends a session, returning it if it existed.
    pub fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.remove(id).map(|(_, s)| s)
    }

    /// Drops every session that has expired at `now`.
    pub fn purge_expired(&self, now: DateTime<Utc>) {
        let max_lifetime = self.max_lifetime;
        self.sessions.retain(|_, s| !s.is_expired(max_lifetime, now));
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Extracts the session ID from a `Cookie` header value.
#[must_use]
pub fn session_id_from_cookie(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Duration::hours(1))
    }

    #[test]
    fn create_and_get() {
        let store = store();
        let id = store.create("a@example.com", "A");
        assert_eq!(store.get(&id).unwrap().email, "a@example.com");
        assert!(store.get("missing").is_none());
        assert_eq!(store.len(), 1);

        assert!(store.remove(&id).is_some());
        assert!(store.is_empty());
        assert!(store.remove(&id).is_none());
    }

    #[test]
    fn aged_session_is_not_returned() {
        let store = store();
        let login = Utc::now() - Duration::hours(2);
        let id = store.create_at("a@example.com", "A", login);

        assert!(store.get_at(&id, login + Duration::minutes(59)).is_some());
        assert!(store.get_at(&id, login + Duration::hours(1)).is_some());
        assert!(store.get(&id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn creating_a_session_purges_expired_ones() {
        let store = store();
        store.create_at("old@example.com", "Old", Utc::now() - Duration::days(1));
        assert_eq!(store.len(), 1);

        let id = store.create("new@example.com", "New");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().email, "new@example.com");
    }

    #[test]
    fn cookie_parsing() {
        assert_eq!(
            session_id_from_cookie("theme=dark; sp_session=abc123; other=1"),
            Some("abc123")
        );
        assert_eq!(session_id_from_cookie("sp_session="), None);
        assert_eq!(session_id_from_cookie("theme=dark"), None);
    }
}
