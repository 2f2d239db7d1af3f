//! Identity storage: a session-lifetime scope plus an opt-in persistent scope.
//!
//! Readers never see storage or parse failures. A corrupt or unreadable entry
//! degrades to "no identity" (logged out), which keeps navigation and request
//! flows running on bad local state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::identity::{parse_identity, serialize_identity, IdentityRecord};

/// Well-known key the identity record is stored under, in both scopes.
pub const IDENTITY_KEY: &str = "userInfo";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file {0} is corrupt: {1}")]
    Corrupt(PathBuf, String),

    #[error("failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage lock poisoned")]
    Poisoned,

    #[error("no platform data directory available")]
    NoDataDir,
}

/// A string key/value scope (session or persistent).
pub trait StorageScope: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory scope. Its lifetime is the owning process, which makes it the
/// natural session scope: a restart starts logged out.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageScope for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Persistent scope backed by a JSON object on disk.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    /// `<platform data dir>/heritage/storage.json`.
    pub fn default_location() -> Result<Self, StorageError> {
        let dir = dirs::data_dir().ok_or(StorageError::NoDataDir)?;
        Ok(Self::new(dir.join("heritage").join("storage.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::Corrupt(self.path.clone(), e.to_string()))
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let bytes = serde_json::to_vec_pretty(entries)?;
        std::fs::write(&self.path, bytes).map_err(io_err)
    }
}

impl StorageScope for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.read().map_err(|_| StorageError::Poisoned)?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.write().map_err(|_| StorageError::Poisoned)?;
        // A corrupt file is replaced rather than blocking every future login.
        let mut entries = self.load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "discarding corrupt persistent storage");
            BTreeMap::new()
        });
        entries.insert(key.to_string(), value.to_string());
        self.store(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.write().map_err(|_| StorageError::Poisoned)?;
        let mut entries = self.load().unwrap_or_default();
        if entries.remove(key).is_some() {
            self.store(&entries)?;
        }
        Ok(())
    }
}

/// Accessor for the single identity record, over both storage scopes.
#[derive(Clone)]
pub struct IdentityStore {
    session: Arc<dyn StorageScope>,
    persistent: Arc<dyn StorageScope>,
}

impl IdentityStore {
    pub fn new(session: Arc<dyn StorageScope>, persistent: Arc<dyn StorageScope>) -> Self {
        Self {
            session,
            persistent,
        }
    }

    /// Both scopes in memory (tests, short-lived tools).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryStorage::new()))
    }

    pub fn session_scope(&self) -> &Arc<dyn StorageScope> {
        &self.session
    }

    pub fn persistent_scope(&self) -> &Arc<dyn StorageScope> {
        &self.persistent
    }

    /// Identity of the current session; session scope only.
    pub fn read_identity(&self) -> Option<IdentityRecord> {
        read_scope(self.session.as_ref(), "session")
    }

    /// Session scope first, then the persistent scope.
    pub fn read_identity_with_fallback(&self) -> Option<IdentityRecord> {
        self.read_identity()
            .or_else(|| read_scope(self.persistent.as_ref(), "persistent"))
    }

    /// Record a successful login for this session.
    pub fn write_identity(&self, record: &IdentityRecord) -> Result<(), StorageError> {
        let raw = serialize_identity(record)?;
        self.session.set(IDENTITY_KEY, &raw)?;
        tracing::debug!(user_id = %record.id, role = %record.role, "identity written");
        Ok(())
    }

    /// Like [`write_identity`](Self::write_identity), and also keep the record
    /// in the persistent scope ("remember me").
    pub fn remember_identity(&self, record: &IdentityRecord) -> Result<(), StorageError> {
        self.write_identity(record)?;
        let raw = serialize_identity(record)?;
        self.persistent.set(IDENTITY_KEY, &raw)
    }

    /// Logout: remove the record from both scopes.
    pub fn clear_identity(&self) -> Result<(), StorageError> {
        self.session.remove(IDENTITY_KEY)?;
        self.persistent.remove(IDENTITY_KEY)?;
        tracing::debug!("identity cleared");
        Ok(())
    }
}

fn read_scope(scope: &dyn StorageScope, scope_name: &'static str) -> Option<IdentityRecord> {
    let raw = match scope.get(IDENTITY_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(scope = scope_name, error = %err, "identity storage unreadable; treating as signed out");
            return None;
        }
    };

    match parse_identity(&raw) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::warn!(scope = scope_name, error = %err, "ignoring unusable stored identity");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use heritage_core::UserId;

    fn record(id: i64, role: Role) -> IdentityRecord {
        IdentityRecord::new(UserId::from(id), role).with_profile_field("username", "tester")
    }

    #[test]
    fn write_then_read_round_trips() {
        let store = IdentityStore::in_memory();
        let rec = record(7, Role::Admin);
        store.write_identity(&rec).unwrap();
        assert_eq!(store.read_identity(), Some(rec));
    }

    #[test]
    fn clear_then_read_is_absent() {
        let store = IdentityStore::in_memory();
        store.remember_identity(&record(7, Role::Admin)).unwrap();
        store.clear_identity().unwrap();
        assert_eq!(store.read_identity(), None);
        assert_eq!(store.read_identity_with_fallback(), None);
    }

    #[test]
    fn malformed_session_entry_reads_as_absent() {
        let store = IdentityStore::in_memory();
        store.session_scope().set(IDENTITY_KEY, "{\"id\": 1, ").unwrap();
        assert_eq!(store.read_identity(), None);
    }

    #[test]
    fn session_read_ignores_persistent_scope() {
        let store = IdentityStore::in_memory();
        let rec = record(9, Role::Standard);
        store
            .persistent_scope()
            .set(IDENTITY_KEY, &serialize_identity(&rec).unwrap())
            .unwrap();

        assert_eq!(store.read_identity(), None);
        assert_eq!(store.read_identity_with_fallback(), Some(rec));
    }

    #[test]
    fn corrupt_session_entry_falls_back_to_persistent() {
        let store = IdentityStore::in_memory();
        let rec = record(4, Role::SuperAdmin);
        store.session_scope().set(IDENTITY_KEY, "garbage").unwrap();
        store
            .persistent_scope()
            .set(IDENTITY_KEY, &serialize_identity(&rec).unwrap())
            .unwrap();
        assert_eq!(store.read_identity_with_fallback(), Some(rec));
    }

    #[test]
    fn session_entry_wins_over_persistent() {
        let store = IdentityStore::in_memory();
        store.remember_identity(&record(1, Role::Standard)).unwrap();
        let newer = record(2, Role::Admin);
        store.write_identity(&newer).unwrap();
        assert_eq!(store.read_identity_with_fallback(), Some(newer));
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let first = FileStorage::new(&path);
        first.set(IDENTITY_KEY, "value").unwrap();
        first.set("other", "x").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get(IDENTITY_KEY).unwrap().as_deref(), Some("value"));
        reopened.remove(IDENTITY_KEY).unwrap();
        assert_eq!(reopened.get(IDENTITY_KEY).unwrap(), None);
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn corrupt_file_reads_as_absent_and_is_replaced_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        let persistent = Arc::new(FileStorage::new(&path));
        let store = IdentityStore::new(Arc::new(MemoryStorage::new()), persistent.clone());
        assert_eq!(store.read_identity_with_fallback(), None);

        let rec = record(5, Role::Admin);
        store.remember_identity(&rec).unwrap();
        let reopened = IdentityStore::new(Arc::new(MemoryStorage::new()), persistent);
        assert_eq!(reopened.read_identity(), None);
        assert_eq!(reopened.read_identity_with_fallback(), Some(rec));
    }
}
