//! The set of users currently online, as last reported by the server.

use std::collections::BTreeSet;

/// Online usernames, kept sorted for display. Never holds duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceSet {
    users: BTreeSet<String>,
}

impl PresenceSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            users: BTreeSet::new(),
        }
    }

    /// Replaces the whole set with a fresh snapshot (from `online_list`).
    pub fn replace_all<I>(&mut self, users: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.users = users.into_iter().collect();
    }

    /// Adds a user. Returns `false` if they were already present.
    pub fn insert(&mut self, user: &str) -> bool {
        self.users.insert(user.to_string())
    }

    /// Removes a user. Returns `false` if they were not present.
    pub fn remove(&mut self, user: &str) -> bool {
        self.users.remove(user)
    }

    /// Whether `user` is online.
    #[must_use]
    pub fn contains(&self, user: &str) -> bool {
        self.users.contains(user)
    }

    /// Number of online users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether nobody is online.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Iterates usernames in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.users.iter().map(String::as_str)
    }

    /// Forgets everyone.
    pub fn clear(&mut self) {
        self.users.clear();
    }
}
