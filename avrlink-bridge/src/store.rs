//! Key-value stores the bridge mirrors into.

use crate::error::BridgeError;
use crate::write::WriteRequest;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;

/// A key-value store holding mirrored fields and pending write requests
/// under one path.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Stores a mirrored field value.
    async fn set(&self, key: &str, value: Value) -> Result<(), BridgeError>;

    /// Returns pending write-request entries and removes them from the store.
    ///
    /// Only entries that were removed are returned.
    async fn take_writes(&self) -> Result<Vec<(String, Value)>, BridgeError>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    /// Inserts an entry as an external writer would.
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.entries.lock().insert(key.into(), value);
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn set(&self, key: &str, value: Value) -> Result<(), BridgeError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn take_writes(&self) -> Result<Vec<(String, Value)>, BridgeError> {
        let mut entries = self.entries.lock();
        let keys: Vec<String> = entries
            .keys()
            .filter(|key| WriteRequest::is_write_key(key))
            .cloned()
            .collect();
        Ok(keys
            .into_iter()
            .filter_map(|key| entries.remove(&key).map(|value| (key, value)))
            .collect())
    }
}

/// REST database store (Firebase Realtime Database style).
///
/// Entries live at `<url>/<path>/<key>.json`.
pub struct RestStore {
    http: reqwest::Client,
    base_url: String,
    path: String,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            path: path.into().trim_matches('/').to_string(),
        }
    }

    /// Returns the URL of the whole path, or of one key under it.
    pub fn url(&self, key: Option<&str>) -> String {
        match key {
            Some(key) => format!("{}/{}/{}.json", self.base_url, self.path, key),
            None => format!("{}/{}.json", self.base_url, self.path),
        }
    }
}

#[async_trait]
impl StatusStore for RestStore {
    async fn set(&self, key: &str, value: Value) -> Result<(), BridgeError> {
        self.http
            .put(self.url(Some(key)))
            .json(&value)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn take_writes(&self) -> Result<Vec<(String, Value)>, BridgeError> {
        let body: Value = self
            .http
            .get(self.url(None))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Value::Object(entries) = body else {
            return Ok(Vec::new());
        };

        let mut writes = Vec::new();
        for (key, value) in entries {
            if !WriteRequest::is_write_key(&key) {
                continue;
            }
            // A request that cannot be removed stays for the next poll.
            let removed = self
                .http
                .delete(self.url(Some(&key)))
                .send()
                .await
                .and_then(|response| response.error_for_status());
            match removed {
                Ok(_) => writes.push((key, value)),
                Err(e) => tracing::warn!("Failed to remove write request {}: {}", key, e),
            }
        }
        Ok(writes)
    }
}
