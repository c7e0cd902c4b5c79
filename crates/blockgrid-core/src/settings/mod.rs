//! Remote settings object and the backend that persists it.

mod memory;

pub use memory::MemorySettings;

use crate::timestamp::parse_timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// The application settings object, as held by the remote store.
///
/// Only `page_configs` is interpreted here; everything else is carried opaquely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Raw page configs keyed by page id.
    #[serde(default)]
    pub page_configs: Map<String, Value>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Settings {
    /// Partial settings carrying a single page config.
    pub fn page_patch(page_id: &str, config: Value) -> Self {
        let mut page_configs = Map::new();
        page_configs.insert(page_id.to_string(), config);
        Self {
            page_configs,
            other: Map::new(),
        }
    }

    pub fn page_config(&self, page_id: &str) -> Option<&Value> {
        self.page_configs.get(page_id)
    }

    /// Apply a partial update: top-level keys replace, page configs merge newest-first.
    pub fn apply_patch(&mut self, patch: &Settings) {
        for (key, value) in &patch.other {
            self.other.insert(key.clone(), value.clone());
        }
        self.page_configs = merge_page_configs(&self.page_configs, &patch.page_configs);
    }
}

fn updated_at(config: &Value) -> Option<chrono::DateTime<chrono::Utc>> {
    config
        .get("updated_at")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
}

/// Merge incoming page configs into the current ones without letting a stale write win.
///
/// Per page: when both sides are stamped the newer stamp wins (ties keep the current one);
/// a stamped config beats an unstamped one; two unstamped configs resolve to the incoming one.
/// Non-object values on either side are replaced by the incoming value.
pub fn merge_page_configs(current: &Map<String, Value>, incoming: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = current.clone();

    for (page_id, next) in incoming {
        let keep_current = match merged.get(page_id) {
            Some(prev) if prev.is_object() && next.is_object() => {
                match (updated_at(prev), updated_at(next)) {
                    (Some(prev_ts), Some(next_ts)) => next_ts <= prev_ts,
                    (Some(_), None) => true,
                    (None, _) => false,
                }
            }
            _ => false,
        };
        if !keep_current {
            merged.insert(page_id.clone(), next.clone());
        }
    }

    merged
}

/// Asynchronous remote settings store.
///
/// `save_settings` resolves to the updated settings, or `None` when nothing was written.
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait SettingsBackend: Send + Sync {
    /// Persist a partial settings object.
    fn save_settings(&self, patch: Settings) -> BoxFuture<'_, Option<Settings>>;
}

/// Asynchronous remote settings store (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait SettingsBackend {
    /// Persist a partial settings object.
    fn save_settings(&self, patch: Settings) -> BoxFuture<'_, Option<Settings>>;
}
