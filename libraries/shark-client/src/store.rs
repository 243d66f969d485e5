//! Persisted client settings.
//!
//! The engine only reads and writes two opaque strings, the session id and
//! the cached user id. Where they live is up to the application.

use crate::error::{ClientError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Key of the persisted session id.
pub const SESSION_ID_KEY: &str = "sessionid";

/// Key of the persisted user id.
pub const USER_ID_KEY: &str = "userID";

/// Opaque key/value storage for client state that survives restarts.
pub trait SettingsStore: Send + Sync {
    /// Read a value. Missing keys yield `None`.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, or remove it when `value` is `None`.
    fn set(&self, key: &str, value: Option<&str>) -> Result<()>;
}

/// In-memory store. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the given entries.
    pub fn with_values<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Option<&str>) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| ClientError::Settings("settings lock poisoned".into()))?;
        match value {
            Some(value) => values.insert(key.to_string(), value.to_string()),
            None => values.remove(key),
        };
        Ok(())
    }
}

/// Store backed by a small JSON object on disk.
///
/// The file is rewritten on every change, synchronously: `set` returns once
/// the write is done. The engine persists from its own task, so a slow disk
/// stalls call processing for the length of the write. Use [`MemoryStore`]
/// or a custom [`SettingsStore`] where that matters.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`. A missing file starts out empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let raw = std::fs::read(&path)?;
            serde_json::from_slice(&raw).map_err(|e| {
                ClientError::Settings(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = values.len(), "Opened settings store");

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_vec_pretty(values)
            .map_err(|e| ClientError::Settings(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl SettingsStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Option<&str>) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| ClientError::Settings("settings lock poisoned".into()))?;
        let changed = match value {
            Some(value) => values.insert(key.to_string(), value.to_string()).as_deref() != Some(value),
            None => values.remove(key).is_some(),
        };
        if changed {
            self.flush(&values)?;
        }
        Ok(())
    }
}

/// Write a value, logging instead of failing. Used by the engine, which
/// has no caller to report a storage error to.
pub(crate) fn persist(store: &dyn SettingsStore, key: &str, value: &str) {
    let value = (!value.is_empty()).then_some(value);
    if let Err(e) = store.set(key, value) {
        warn!(key = %key, error = %e, "Failed to persist setting");
    }
}
