//! Persisted clipper state
//!
//! A small string-keyed JSON store standing in for browser extension
//! storage. Keys used by the clipper:
//!
//! - [`USER_ROOT_URL_KEY`] - root node URL entered during setup
//! - [`USER_NODE_ID_KEY`] - user node id derived from that URL
//! - [`ARTICLE_NODES_KEY`] - object mapping page URL to article node id
//!
//! Writes are last-writer-wins; there is no compare-and-swap.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

use crate::config::config_dir;
use crate::services::ClipperError;

pub const USER_ROOT_URL_KEY: &str = "userRootUrl";
pub const USER_NODE_ID_KEY: &str = "userNodeId";
pub const ARTICLE_NODES_KEY: &str = "articleNodes";

const STATE_FILE: &str = "state.json";

/// String-keyed JSON value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, ClipperError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), ClipperError>;

    async fn remove(&self, key: &str) -> Result<(), ClipperError>;

    /// Remove every key
    async fn clear(&self) -> Result<(), ClipperError>;
}

/// Read `key` and deserialize it
///
/// A stored value of the wrong shape is a [`ClipperError::Serialization`].
pub async fn get_typed<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, ClipperError> {
    match store.get(key).await? {
        Some(Value::Null) | None => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ClipperError::serialization(format!("Stored '{}' is malformed: {}", key, e))),
    }
}

/// Serialize `value` and store it under `key`
pub async fn set_typed<T: Serialize + Sync>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), ClipperError> {
    store.set(key, serde_json::to_value(value)?).await
}

/// Store kept in memory only
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, ClipperError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), ClipperError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), ClipperError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClipperError> {
        self.entries.write().await.clear();
        Ok(())
    }
}

/// Store backed by one JSON object on disk
///
/// The file is read on every access, so edits by other processes are seen.
/// A missing file is an empty store.
#[derive(Debug)]
pub struct JsonFileKeyValueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `~/.mew-clipper/state.json`
    pub fn default_location() -> Result<Self, ClipperError> {
        let dir = config_dir()
            .ok_or_else(|| ClipperError::storage("Cannot determine home directory"))?;
        Ok(Self::new(dir.join(STATE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>, ClipperError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let contents = fs::read_to_string(&self.path).await.map_err(|e| {
            ClipperError::storage(format!("Failed to read {:?}: {}", self.path, e))
        })?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&contents) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ClipperError::serialization(format!(
                "{:?} does not hold a JSON object",
                self.path
            ))),
            Err(e) => Err(ClipperError::serialization(format!(
                "Failed to parse {:?}: {}",
                self.path, e
            ))),
        }
    }

    async fn write_all(&self, map: Map<String, Value>) -> Result<(), ClipperError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ClipperError::storage(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }

        // The state file is only ever replaced whole
        let contents = serde_json::to_string_pretty(&Value::Object(map))?;
        let staging = self.staging_path();
        fs::write(&staging, contents).await.map_err(|e| {
            ClipperError::storage(format!("Failed to write {:?}: {}", staging, e))
        })?;
        fs::rename(&staging, &self.path).await.map_err(|e| {
            ClipperError::storage(format!("Failed to replace {:?}: {}", self.path, e))
        })?;
        Ok(())
    }

    /// `<state file>.tmp`
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl KeyValueStore for JsonFileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, ClipperError> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), ClipperError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_all().await?;
        map.insert(key.to_string(), value);
        self.write_all(map).await
    }

    async fn remove(&self, key: &str) -> Result<(), ClipperError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_all().await?;
        if map.remove(key).is_some() {
            self.write_all(map).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClipperError> {
        let _guard = self.write_lock.lock().await;
        if self.path.exists() {
            fs::remove_file(&self.path).await.map_err(|e| {
                ClipperError::storage(format!("Failed to remove {:?}: {}", self.path, e))
            })?;
            tracing::debug!("Cleared clipper state at {:?}", self.path);
        }
        Ok(())
    }
}
