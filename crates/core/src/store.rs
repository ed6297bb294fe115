//! Credential storage backends
//!
//! A store holds exactly one serialized [`AuthRecord`] under
//! [`AUTH_STORAGE_KEY`]. Stores are synchronous; a write has completed by the
//! time `save` or `clear` returns.

use crate::error::StoreError;
use crate::record::AuthRecord;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Fixed key the auth record is stored under
pub const AUTH_STORAGE_KEY: &str = "auth";

/// Key/value persistence for the auth record
pub trait CredentialStore: Send + Sync {
    /// Read the stored record, `None` if nothing is stored
    fn load(&self) -> Result<Option<AuthRecord>, StoreError>;

    /// Replace the stored record
    fn save(&self, record: &AuthRecord) -> Result<(), StoreError>;

    /// Remove the stored record. Clearing an empty store succeeds.
    fn clear(&self) -> Result<(), StoreError>;
}

/// In-process store, the equivalent of browser local storage in tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<&'static str, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw JSON currently held under the auth key
    pub fn raw(&self) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(AUTH_STORAGE_KEY).cloned())
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<AuthRecord>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries
            .get(AUTH_STORAGE_KEY)
            .map(|raw| AuthRecord::from_json(raw))
            .transpose()
    }

    fn save(&self, record: &AuthRecord) -> Result<(), StoreError> {
        let raw = record.to_json()?;
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(AUTH_STORAGE_KEY, raw);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(AUTH_STORAGE_KEY);
        Ok(())
    }
}

/// Store backed by `<dir>/auth.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store inside `dir`. The directory is created on first save.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{AUTH_STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> Result<Option<AuthRecord>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            warn!(path = %self.path.display(), "Ignoring empty auth record file");
            return Ok(None);
        }
        AuthRecord::from_json(&raw).map(Some)
    }

    fn save(&self, record: &AuthRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write to a sibling file first so a crash never leaves half a record
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, record.to_json()?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "Saved auth record");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Removed auth record");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CredentialPair, Role, User};

    fn record() -> AuthRecord {
        AuthRecord::new(
            User {
                id: 11,
                email: "teacher@devtrack.test".into(),
                first_name: "Marta".into(),
                last_name: String::new(),
                role: Role::Teacher,
                session_timeout_minutes: None,
            },
            CredentialPair {
                access: "acc".into(),
                refresh: "ref".into(),
            },
        )
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&record()).unwrap();
        assert_eq!(store.load().unwrap(), Some(record()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(store.raw().is_none());
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert!(store.load().unwrap().is_none());
        store.save(&record()).unwrap();
        assert!(store.path().exists());
        assert_eq!(store.load().unwrap(), Some(record()));

        store.clear().unwrap();
        assert!(!store.path().exists());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Malformed(_))));
    }
}
