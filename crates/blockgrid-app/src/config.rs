//! Application configuration.

use blockgrid_core::{DragConfig, StoreOptions};
use std::path::PathBuf;

/// Environment variable overriding the local cache directory.
pub const CACHE_DIR_ENV: &str = "BLOCKGRID_CACHE_DIR";

/// Environment variable selecting the default output format (`table` or `json`).
pub const OUTPUT_ENV: &str = "BLOCKGRID_OUTPUT";

/// How commands print page configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl OutputFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "table" => Some(Self::Table),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub title: String,
    pub output: OutputFormat,
    /// Local cache directory; the platform default when `None`.
    pub cache_dir: Option<PathBuf>,
    pub store: StoreOptions,
    pub drag: DragConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Blockgrid".to_string(),
            output: OutputFormat::Table,
            cache_dir: None,
            store: StoreOptions::default(),
            drag: DragConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `BLOCKGRID_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(dir) = lookup(CACHE_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            config.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = lookup(OUTPUT_ENV) {
            match OutputFormat::parse(&raw) {
                Some(output) => config.output = output,
                None => log::warn!("ignoring unknown {} value {:?}", OUTPUT_ENV, raw),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.output, OutputFormat::Table);
        assert_eq!(config.store.cache_key, "page_configs_local_v1");
        assert_eq!(config.drag.move_threshold, 8.0);
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_lookup(|key| match key {
            CACHE_DIR_ENV => Some("/tmp/blockgrid".to_string()),
            OUTPUT_ENV => Some("JSON".to_string()),
            _ => None,
        });
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/blockgrid")));
        assert_eq!(config.output, OutputFormat::Json);
    }

    #[test]
    fn test_unknown_output_keeps_default() {
        let config = AppConfig::from_lookup(|key| (key == OUTPUT_ENV).then(|| "yaml".to_string()));
        assert_eq!(config.output, OutputFormat::Table);
    }
}
