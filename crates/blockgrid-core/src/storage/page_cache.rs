//! Namespaced page-config map on top of a [`LocalCache`].
//!
//! All page configs live under one key as a JSON object `{ page_id: config }`.
//! Failures are logged and reported as "no cache"; they never reach the caller.

use super::{LocalCache, StorageError, StorageResult};
use crate::page::PageConfig;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Default namespace key for locally cached page configs.
pub const LOCAL_CACHE_KEY: &str = "page_configs_local_v1";

pub struct PageCache<L: LocalCache> {
    cache: Arc<L>,
    key: String,
}

impl<L: LocalCache> PageCache<L> {
    pub fn new(cache: Arc<L>, key: impl Into<String>) -> Self {
        Self {
            cache,
            key: key.into(),
        }
    }

    /// The stored map. A missing key is an empty map; content that is not a JSON object
    /// is a `Serialization` error.
    pub fn load(&self) -> StorageResult<Map<String, Value>> {
        let Some(raw) = self.cache.get_item(&self.key)? else {
            return Ok(Map::new());
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StorageError::Serialization("page cache is not a JSON object".to_string())),
            Err(e) => Err(StorageError::Serialization(e.to_string())),
        }
    }

    /// Every cached page config, raw. Empty when storage is unavailable or corrupt.
    pub fn read_all(&self) -> Map<String, Value> {
        self.load().unwrap_or_else(|e| {
            log::warn!("local page cache unreadable: {}", e);
            Map::new()
        })
    }

    /// The raw cached config for `page_id`.
    pub fn read(&self, page_id: &str) -> Option<Value> {
        self.read_all().remove(page_id)
    }

    /// Store `config` under `page_id`. Returns whether the write reached storage.
    pub fn write(&self, page_id: &str, config: &PageConfig) -> bool {
        let value = match serde_json::to_value(config) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("page config {} not serializable: {}", page_id, e);
                return false;
            }
        };
        let Some(mut all) = self.load_for_update() else {
            return false;
        };
        all.insert(page_id.to_string(), value);
        self.store(all)
    }

    /// Drop the cached config for `page_id`.
    pub fn remove(&self, page_id: &str) -> bool {
        let Some(mut all) = self.load_for_update() else {
            return false;
        };
        if all.remove(page_id).is_none() {
            return true;
        }
        self.store(all)
    }

    /// The map to rewrite. Corrupt content is replaced; a failed read skips the write so
    /// other pages' configs survive.
    fn load_for_update(&self) -> Option<Map<String, Value>> {
        match self.load() {
            Ok(all) => Some(all),
            Err(StorageError::Serialization(e)) => {
                log::warn!("replacing corrupt local page cache: {}", e);
                Some(Map::new())
            }
            Err(e) => {
                log::warn!("local page cache unreadable, skipping write: {}", e);
                None
            }
        }
    }

    fn store(&self, all: Map<String, Value>) -> bool {
        let json = Value::Object(all).to_string();
        match self.cache.set_item(&self.key, &json) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("local page cache write failed: {}", e);
                false
            }
        }
    }
}
