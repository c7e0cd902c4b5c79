//! In-memory settings backend.

use super::{BoxFuture, Settings, SettingsBackend};
use serde_json::Value;
use std::sync::RwLock;

/// In-memory remote settings for tests and offline use.
///
/// Saves apply the same page-config merge a real settings server does, and every
/// accepted patch is recorded.
#[derive(Default)]
pub struct MemorySettings {
    settings: RwLock<Settings>,
    saved: RwLock<Vec<Settings>>,
    failing: RwLock<bool>,
}

impl MemorySettings {
    /// Create an empty settings store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `settings`.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
            ..Self::default()
        }
    }

    /// Current settings.
    pub fn snapshot(&self) -> Settings {
        self.settings
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Make subsequent saves fail (resolve to `None`) while set.
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.write() {
            *flag = failing;
        }
    }

    /// Number of save calls, failed ones included.
    pub fn save_count(&self) -> usize {
        self.saved.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Every patch passed to `save_settings`, in call order.
    pub fn saved_patches(&self) -> Vec<Settings> {
        self.saved.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// Overwrite one page config directly, as another writer would.
    pub fn put_page_config(&self, page_id: &str, config: Value) {
        if let Ok(mut settings) = self.settings.write() {
            settings.page_configs.insert(page_id.to_string(), config);
        }
    }
}

impl SettingsBackend for MemorySettings {
    fn save_settings(&self, patch: Settings) -> BoxFuture<'_, Option<Settings>> {
        Box::pin(async move {
            if let Ok(mut saved) = self.saved.write() {
                saved.push(patch.clone());
            }
            if self.failing.read().map(|f| *f).unwrap_or(true) {
                return None;
            }
            let mut settings = self.settings.write().ok()?;
            settings.apply_patch(&patch);
            Some(settings.clone())
        })
    }
}
