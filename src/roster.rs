//! Ordered, duplicate-free list of participant names.

use thiserror::Error;

/// Returned by [`Roster::admit`] when the name is already listed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} is already in the roster")]
pub struct DuplicateName(pub String);

/// The players currently in the room.
///
/// Order is insertion order as shown to the user (newest arrivals first);
/// it carries no game meaning. No name ever appears twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    names: Vec<String>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster from the server's initial player list.
    ///
    /// Repeated names keep their first position.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut roster = Self::new();
        for name in names {
            let name = name.into();
            if !roster.contains(&name) {
                roster.names.push(name);
            }
        }
        roster
    }

    /// Put a newly arrived player at the front of the roster.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateName`] and leaves the roster untouched if the name
    /// is already present.
    pub fn admit(&mut self, name: impl Into<String>) -> Result<(), DuplicateName> {
        let name = name.into();
        if self.contains(&name) {
            return Err(DuplicateName(name));
        }
        self.names.insert(0, name);
        Ok(())
    }

    /// Remove every occurrence of `name`, returning how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.names.len();
        self.names.retain(|n| n != name);
        before - self.names.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.names.clone()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn admit_puts_newcomer_first() {
        let mut roster = Roster::from_names(["Alice"]);
        roster.admit("Bob").unwrap();
        assert_eq!(roster.to_vec(), vec!["Bob", "Alice"]);
    }

    #[test]
    fn admit_rejects_duplicate_without_changes() {
        let mut roster = Roster::from_names(["Alice", "Bob"]);
        let err = roster.admit("Alice").unwrap_err();
        assert_eq!(err, DuplicateName("Alice".into()));
        assert_eq!(roster.to_vec(), vec!["Alice", "Bob"]);
    }

    #[test]
    fn remove_absent_name_is_noop() {
        let mut roster = Roster::from_names(["Alice"]);
        assert_eq!(roster.remove("Zed"), 0);
        assert_eq!(roster.remove("Zed"), 0);
        assert_eq!(roster.to_vec(), vec!["Alice"]);
    }

    #[test]
    fn remove_returns_count() {
        let mut roster = Roster::from_names(["Alice", "Bob"]);
        assert_eq!(roster.remove("Alice"), 1);
        assert_eq!(roster.to_vec(), vec!["Bob"]);
        assert!(!roster.contains("Alice"));
    }

    #[test]
    fn initial_list_is_deduplicated() {
        let roster = Roster::from_names(["Alice", "Bob", "Alice"]);
        assert_eq!(roster.to_vec(), vec!["Alice", "Bob"]);
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn empty_roster() {
        let roster = Roster::new();
        assert!(roster.is_empty());
        assert_eq!(roster.iter().count(), 0);
    }
}
