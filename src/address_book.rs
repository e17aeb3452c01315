//! Persisted user-to-address mapping
//!
//! A flat JSON object on disk, rewritten in full on every mutation. The
//! loader tolerates trailing-comma artifacts left behind by earlier faulty
//! writers.

use crate::chat::UserId;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AddressBookError {
    #[error("address book I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("address book is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type AddressBookResult<T> = Result<T, AddressBookError>;

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("valid regex"))
}

/// User identity → verified contact address.
///
/// Entries are kept in a `BTreeMap` so the reverse lookup has a stable,
/// defined iteration order (ascending user identity). Entries are never
/// deleted; a user supplying a new address overwrites the old one.
pub struct AddressBook {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<UserId, String>>,
}

impl AddressBook {
    /// Load the book from `path`, starting empty if the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> AddressBookResult<Self> {
        let path = path.as_ref();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let cleaned = trailing_comma_re().replace_all(&raw, "$1");
            serde_json::from_str(&cleaned)?
        } else {
            tracing::info!(path = %path.display(), "No address book file yet; starting empty");
            BTreeMap::new()
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            entries: Mutex::new(entries),
        })
    }

    /// In-memory book with no backing file (for tests).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// The address stored for a user, if any.
    pub fn address_of(&self, user: &UserId) -> Option<String> {
        self.entries.lock().unwrap().get(user).cloned()
    }

    /// First user identity (ascending order) whose stored address equals
    /// `address`. The mapping is not required to be unique.
    pub fn user_for_address(&self, address: &str) -> Option<UserId> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|(_, stored)| stored.as_str() == address)
            .map(|(user, _)| user.clone())
    }

    /// Store an address for a user and persist immediately (write-through).
    pub fn remember(&self, user: &UserId, address: &str) -> AddressBookResult<()> {
        let snapshot = {
            let mut entries = self.entries.lock().unwrap();
            entries.insert(user.clone(), address.to_string());
            entries.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, entries: &BTreeMap<UserId, String>) -> AddressBookResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(entries)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("addresses.json");

        let book = AddressBook::load(&path).unwrap();
        book.remember(&"user-b@c.us".to_string(), "b@example.com")
            .unwrap();
        book.remember(&"user-a@c.us".to_string(), "a@example.com")
            .unwrap();

        let reloaded = AddressBook::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.address_of(&"user-a@c.us".to_string()),
            Some("a@example.com".to_string())
        );
    }

    #[test]
    fn overwrite_replaces_address() {
        let book = AddressBook::in_memory();
        let user = "user@c.us".to_string();
        book.remember(&user, "old@example.com").unwrap();
        book.remember(&user, "new@example.com").unwrap();
        assert_eq!(book.address_of(&user), Some("new@example.com".to_string()));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn tolerates_trailing_comma_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("addresses.json");
        std::fs::write(&path, "{\n  \"user@c.us\": \"a@example.com\",\n}").unwrap();

        let book = AddressBook::load(&path).unwrap();
        assert_eq!(
            book.address_of(&"user@c.us".to_string()),
            Some("a@example.com".to_string())
        );
    }

    #[test]
    fn reverse_lookup_takes_first_in_key_order() {
        let book = AddressBook::in_memory();
        book.remember(&"zed@c.us".to_string(), "shared@example.com")
            .unwrap();
        book.remember(&"amy@c.us".to_string(), "shared@example.com")
            .unwrap();

        // Both users share the address; the smaller identity wins.
        assert_eq!(
            book.user_for_address("shared@example.com"),
            Some("amy@c.us".to_string())
        );
        // Unchanged book ⇒ same answer on a second lookup.
        assert_eq!(
            book.user_for_address("shared@example.com"),
            Some("amy@c.us".to_string())
        );
    }

    #[test]
    fn unknown_address_resolves_to_nobody() {
        let book = AddressBook::in_memory();
        assert_eq!(book.user_for_address("ghost@example.com"), None);
    }
}
