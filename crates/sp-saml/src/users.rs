//! Directory of known users.

use dashmap::DashMap;
use serde::Serialize;

/// A known user and their display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnownUser {
    /// Subject email.
    pub email: String,
    /// Display name.
    pub name: String,
}

/// Concurrent map from subject email to display name.
///
/// Updates to the same email are last-write-wins. Shared between request
/// handlers through an `Arc`.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: DashMap<String, String>,
}

impl UserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the display name for `email`.
    ///
    /// Returns the previous name, if any.
    pub fn upsert(&self, email: impl Into<String>, name: impl Into<String>) -> Option<String> {
        self.users.insert(email.into(), name.into())
    }

    /// Returns the display name for `email`.
    #[must_use]
    pub fn get(&self, email: &str) -> Option<String> {
        self.users.get(email).map(|entry| entry.value().clone())
    }

    /// Returns true if `email` is known.
    #[must_use]
    pub fn contains(&self, email: &str) -> bool {
        self.users.contains_key(email)
    }

    /// Number of known users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns true if no user is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Lists all users sorted by email.
    #[must_use]
    pub fn list(&self) -> Vec<KnownUser> {
        let mut users: Vec<KnownUser> = self
            .users
            .iter()
            .map(|entry| KnownUser {
                email: entry.key().clone(),
                name: entry.value().clone(),
            })
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        users
    }
}
