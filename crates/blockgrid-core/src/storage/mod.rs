//! Local cache abstraction for persisted page configs.

mod memory;
mod page_cache;

#[cfg(not(target_arch = "wasm32"))]
mod file;

#[cfg(target_arch = "wasm32")]
mod local_storage;

pub use memory::MemoryCache;
pub use page_cache::{PageCache, LOCAL_CACHE_KEY};

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileCache;

#[cfg(target_arch = "wasm32")]
pub use local_storage::WebLocalStorage;

use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Synchronous string key-value store scoped to one origin (or one user data directory).
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait LocalCache: Send + Sync {
    /// Read the value stored under `key`, `None` if absent.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

/// Synchronous string key-value store (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait LocalCache {
    /// Read the value stored under `key`, `None` if absent.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

/// Local cache backend of the current platform.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformCache = FileCache;

#[cfg(target_arch = "wasm32")]
pub type PlatformCache = WebLocalStorage;

/// Create the platform's local cache in its default location.
#[cfg(not(target_arch = "wasm32"))]
pub fn create_default_cache() -> StorageResult<std::sync::Arc<PlatformCache>> {
    Ok(std::sync::Arc::new(FileCache::default_location()?))
}

#[cfg(target_arch = "wasm32")]
pub fn create_default_cache() -> StorageResult<std::sync::Arc<PlatformCache>> {
    Ok(std::sync::Arc::new(WebLocalStorage::new()))
}
