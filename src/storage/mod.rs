// Device-local key-value storage for preferences and the signed in user

pub mod preferences;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Serialize, de::DeserializeOwned};

use crate::config::APP_DIR_NAME;
use crate::errors::PitwallError;

pub use preferences::Preferences;

pub const PREFERENCES_KEY: &str = "pitwall_preferences";
pub const TOKEN_KEY: &str = "pitwall_token";
pub const USER_KEY: &str = "pitwall_user";

const STORE_FILE_NAME: &str = "storage.json";

/// Trait defining a string key-value store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PitwallError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), PitwallError>;

    fn remove(&mut self, key: &str) -> Result<(), PitwallError>;
}

/// Read a JSON value. A stored value that no longer parses as `T` reads as absent.
pub fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, PitwallError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            debug!("Ignoring unreadable value for {}: {}", key, e);
            Ok(None)
        }
    }
}

pub fn set_json<T: Serialize>(
    store: &mut dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), PitwallError> {
    let raw = serde_json::to_string(value).map_err(|e| PitwallError::StorageSerializeError {
        key: key.to_string(),
        source: e,
    })?;
    store.set(key, &raw)
}

/// Store kept in memory only, for tests and one-off runs
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PitwallError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PitwallError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PitwallError> {
        self.values.remove(key);
        Ok(())
    }
}

/// File-based store, one JSON object holding every key
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`, starting empty when the file does not exist yet
    pub fn open(path: PathBuf) -> Result<Self, PitwallError> {
        let values = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|e| PitwallError::StorageIOError {
                operation: format!("read {}", path.display()),
                source: e,
            })?;
            // a damaged file is treated as empty rather than locking the user out
            serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Local storage at {} is unreadable, starting over: {}", path.display(), e);
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, values })
    }

    /// Open the store in the default application data directory
    pub fn open_default() -> Result<Self, PitwallError> {
        Self::open(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf, PitwallError> {
        let app_data_dir = dirs::data_dir().ok_or(PitwallError::NoConfigDir)?;
        Ok(app_data_dir.join(APP_DIR_NAME).join(STORE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), PitwallError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PitwallError::StorageIOError {
                operation: format!("create {}", parent.display()),
                source: e,
            })?;
        }
        let raw = serde_json::to_string_pretty(&self.values).map_err(|e| {
            PitwallError::StorageSerializeError {
                key: STORE_FILE_NAME.to_string(),
                source: e,
            }
        })?;
        fs::write(&self.path, raw).map_err(|e| PitwallError::StorageIOError {
            operation: format!("write {}", self.path.display()),
            source: e,
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PitwallError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PitwallError> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), PitwallError> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_persists_between_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pitwall").join("storage.json");

        let mut store = FileStore::open(path.clone()).unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        store.set(TOKEN_KEY, "abc").unwrap();
        store.set(USER_KEY, "{}").unwrap();

        let mut reopened = FileStore::open(path.clone()).unwrap();
        assert_eq!(reopened.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));

        reopened.remove(TOKEN_KEY).unwrap();
        let reopened = FileStore::open(path).unwrap();
        assert_eq!(reopened.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(reopened.get(USER_KEY).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_damaged_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "[1, 2").unwrap();

        let store = FileStore::open(path).unwrap();
        assert_eq!(store.get(PREFERENCES_KEY).unwrap(), None);
    }

    #[test]
    fn test_json_helpers() {
        let mut store = MemoryStore::new();
        set_json(&mut store, "numbers", &vec![1, 2, 3]).unwrap();
        let numbers: Option<Vec<i32>> = get_json(&store, "numbers").unwrap();
        assert_eq!(numbers, Some(vec![1, 2, 3]));

        store.set("numbers", "not json").unwrap();
        let numbers: Option<Vec<i32>> = get_json(&store, "numbers").unwrap();
        assert_eq!(numbers, None);
    }
}
