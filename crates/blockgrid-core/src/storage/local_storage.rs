//! `window.localStorage` cache for WebAssembly.

use super::{LocalCache, StorageError, StorageResult};
use web_sys::Storage;

/// Origin-scoped cache backed by the browser's localStorage.
///
/// Note: The storage handle is looked up on every call; private browsing modes may
/// revoke it at any time.
#[derive(Default)]
pub struct WebLocalStorage;

impl WebLocalStorage {
    pub fn new() -> Self {
        Self
    }

    fn storage(&self) -> StorageResult<Storage> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("No window object".to_string()))?;
        window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("localStorage error: {:?}", e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage not available".to_string()))
    }
}

impl LocalCache for WebLocalStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.storage()?
            .get_item(key)
            .map_err(|e| StorageError::Other(format!("Read error: {:?}", e)))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Io(format!("Write error (quota?): {:?}", e)))
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.storage()?
            .remove_item(key)
            .map_err(|e| StorageError::Other(format!("Remove error: {:?}", e)))
    }
}
