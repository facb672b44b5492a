use crate::error::StorageError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Storage key holding the anonymous session id.
pub const SESSION_STORAGE_KEY: &str = "cw_chat_session_id";
/// Prefix stamped on every generated id so it cannot be mistaken for the
/// host page's own storage entries.
pub const SESSION_ID_PREFIX: &str = "cw_";

/// Durable per-browser key-value storage (the host's `localStorage`).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON-file backed store, standing in for a browser profile between CLI runs.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Opens the store, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => HashMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        let raw = serde_json::to_string_pretty(&*entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// Returns the stored session id, creating and persisting one on first use.
/// An id that cannot be persisted is still used for the current page.
pub fn session_id(store: &dyn KeyValueStore) -> String {
    if let Some(existing) = store.get(SESSION_STORAGE_KEY).filter(|v| !v.is_empty()) {
        return existing;
    }
    let fresh = format!("{SESSION_ID_PREFIX}{}", uuid::Uuid::new_v4());
    match store.set(SESSION_STORAGE_KEY, &fresh) {
        Ok(()) => debug!(session_id = %fresh, "created chat session id"),
        Err(err) => warn!(?err, "failed to persist chat session id"),
    }
    fresh
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "quota").into())
        }
    }

    #[test]
    fn creates_prefixed_id_once() {
        let store = MemoryStore::new();
        let first = session_id(&store);
        assert!(first.starts_with(SESSION_ID_PREFIX));
        assert_eq!(store.get(SESSION_STORAGE_KEY).as_deref(), Some(first.as_str()));
        assert_eq!(session_id(&store), first);
    }

    #[test]
    fn keeps_existing_id() {
        let store = MemoryStore::new();
        store.set(SESSION_STORAGE_KEY, "cw_returning").unwrap();
        assert_eq!(session_id(&store), "cw_returning");
    }

    #[test]
    fn falls_back_when_storage_rejects_writes() {
        let id = session_id(&ReadOnlyStore);
        assert!(id.starts_with(SESSION_ID_PREFIX));
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let first = session_id(&FileStore::open(&path).unwrap());
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(session_id(&reopened), first);
    }
}
