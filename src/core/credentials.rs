//! Local credential storage
//!
//! A tiny key/value store holding the AI API key, the server-side analogue of
//! browser local storage. The key is read when the AI client is first
//! initialized; a missing key is reported to the user instead of failing.

use super::error::CredentialError;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Name under which the AI API key is stored
pub const API_KEY_CREDENTIAL: &str = "schemachat_api_key";

pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError>;

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError>;

    fn remove(&self, key: &str) -> Result<(), CredentialError>;

    /// Whether a non-empty value is stored under `key`
    fn contains(&self, key: &str) -> bool {
        self.get(key)
            .ok()
            .flatten()
            .is_some_and(|value| !value.is_empty())
    }
}

/// Process-local store, used in tests and when no file is configured
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CredentialError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

#[cfg(feature = "ssr")]
pub use file::FileCredentialStore;

#[cfg(feature = "ssr")]
mod file {
    use super::{CredentialError, CredentialStore};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Mutex, PoisonError};

    /// JSON object on disk mapping credential names to values
    #[derive(Debug)]
    pub struct FileCredentialStore {
        path: PathBuf,
        // Serializes read-modify-write cycles
        lock: Mutex<()>,
    }

    impl FileCredentialStore {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self {
                path: path.into(),
                lock: Mutex::new(()),
            }
        }

        fn load(&self) -> Result<HashMap<String, String>, CredentialError> {
            match std::fs::read_to_string(&self.path) {
                Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
                Ok(contents) => Ok(serde_json::from_str(&contents)?),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
                Err(e) => Err(e.into()),
            }
        }

        fn save(&self, values: &HashMap<String, String>) -> Result<(), CredentialError> {
            if let Some(parent) = self.path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
            Ok(())
        }
    }

    impl CredentialStore for FileCredentialStore {
        fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(self.load()?.remove(key))
        }

        fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut values = self.load()?;
            values.insert(key.to_string(), value.to_string());
            self.save(&values)?;
            tracing::info!("Stored credential '{}' in {}", key, self.path.display());
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), CredentialError> {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut values = self.load()?;
            if values.remove(key).is_some() {
                self.save(&values)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get(API_KEY_CREDENTIAL).unwrap(), None);
        assert!(!store.contains(API_KEY_CREDENTIAL));

        store.set(API_KEY_CREDENTIAL, "sk-test").unwrap();
        assert_eq!(
            store.get(API_KEY_CREDENTIAL).unwrap(),
            Some("sk-test".to_string())
        );
        assert!(store.contains(API_KEY_CREDENTIAL));

        store.remove(API_KEY_CREDENTIAL).unwrap();
        assert!(!store.contains(API_KEY_CREDENTIAL));
    }

    #[test]
    fn test_empty_value_is_not_contained() {
        let store = MemoryCredentialStore::with_value(API_KEY_CREDENTIAL, "");
        assert!(!store.contains(API_KEY_CREDENTIAL));
    }

    #[cfg(feature = "ssr")]
    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = FileCredentialStore::new(&path);
        assert_eq!(store.get(API_KEY_CREDENTIAL).unwrap(), None);

        store.set(API_KEY_CREDENTIAL, "sk-file").unwrap();
        store.set("other", "value").unwrap();

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(
            reopened.get(API_KEY_CREDENTIAL).unwrap(),
            Some("sk-file".to_string())
        );

        reopened.remove(API_KEY_CREDENTIAL).unwrap();
        assert_eq!(store.get(API_KEY_CREDENTIAL).unwrap(), None);
        assert_eq!(store.get("other").unwrap(), Some("value".to_string()));
    }

    #[cfg(feature = "ssr")]
    #[test]
    fn test_file_store_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileCredentialStore::new(&path);
        assert!(matches!(
            store.get(API_KEY_CREDENTIAL),
            Err(CredentialError::Format(_))
        ));
    }
}
