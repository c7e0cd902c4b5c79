//! In-memory local cache.

use super::{LocalCache, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory cache for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryCache {
    items: RwLock<HashMap<String, String>>,
    unavailable: RwLock<bool>,
}

impl MemoryCache {
    /// Create a new empty memory cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate disabled storage: every read and write fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut flag) = self.unavailable.write() {
            *flag = unavailable;
        }
    }

    fn check_available(&self) -> StorageResult<()> {
        let unavailable = self
            .unavailable
            .read()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        if *unavailable {
            return Err(StorageError::Unavailable("storage disabled".to_string()));
        }
        Ok(())
    }
}

impl LocalCache for MemoryCache {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.check_available()?;
        let items = self
            .items
            .read()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.check_available()?;
        let mut items = self
            .items
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.check_available()?;
        let mut items = self
            .items
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        items.remove(key);
        Ok(())
    }
}
