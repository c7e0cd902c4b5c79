//! Normalization of untrusted page configs (remote settings or local cache).
//!
//! Malformed input never fails: offending blocks are dropped, and a config that cannot
//! be read at all falls back to the template.

use crate::block::{Block, BlockKind, BlockLayout, BlockProps};
use crate::page::PageConfig;
use crate::registry;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Normalize a raw config against `template`.
///
/// Returns a clone of the template when `raw` is missing, not an object, or has no
/// `blocks` array. The result always carries the template's page id.
pub fn normalize_page_config(raw: Option<&Value>, template: &PageConfig) -> PageConfig {
    let Some(obj) = raw.and_then(Value::as_object) else {
        return template.clone();
    };
    let Some(raw_blocks) = obj.get("blocks").and_then(Value::as_array) else {
        log::debug!("page config {} has no blocks array, using template", template.id);
        return template.clone();
    };

    let mut seen = HashSet::new();
    let blocks = raw_blocks
        .iter()
        .filter_map(normalize_block)
        .filter(|block| seen.insert(block.id.clone()))
        .collect();

    PageConfig {
        id: template.id.clone(),
        version: obj
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(template.version),
        blocks,
        updated_at: obj
            .get("updated_at")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string),
    }
}

/// Normalize one block entry. `None` drops the entry.
pub fn normalize_block(raw: &Value) -> Option<Block> {
    let obj = raw.as_object()?;
    let id = obj.get("id").and_then(Value::as_str)?.trim();
    if id.is_empty() {
        return None;
    }
    let Some(kind) = obj.get("type").and_then(Value::as_str).and_then(BlockKind::parse) else {
        log::debug!("dropping block {id} with unknown type");
        return None;
    };

    let spec = registry::spec(kind);
    let layout = obj
        .get("layout")
        .and_then(Value::as_object)
        .map(|layout| normalize_layout(layout, spec.default_layout))
        .unwrap_or(spec.default_layout);

    let props = match obj.get("props") {
        None | Some(Value::Null) => spec.create_default_props(),
        Some(value) => BlockProps::from_value(kind, value.clone()).unwrap_or_else(|e| {
            log::debug!("block {id} has malformed props ({e}), using defaults");
            spec.create_default_props()
        }),
    };

    Some(Block {
        id: id.to_string(),
        layout,
        props,
    })
}

fn normalize_layout(raw: &Map<String, Value>, default: BlockLayout) -> BlockLayout {
    let number = |key: &str| raw.get(key).and_then(Value::as_f64);
    BlockLayout::sanitized(
        number("colSpan").unwrap_or(f64::from(default.col_span)),
        number("colStart"),
        number("rowStart"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> PageConfig {
        PageConfig::from_kinds("home", &[BlockKind::TitleDescription])
    }

    #[test]
    fn test_missing_or_malformed_config_uses_template() {
        let template = template();
        assert_eq!(normalize_page_config(None, &template), template);
        assert_eq!(normalize_page_config(Some(&json!("nope")), &template), template);
        assert_eq!(normalize_page_config(Some(&json!({ "blocks": 3 })), &template), template);
    }

    #[test]
    fn test_drops_bad_blocks() {
        let raw = json!({
            "id": "other",
            "version": 1,
            "updated_at": "2024-03-01T00:00:00.000Z",
            "blocks": [
                { "id": "a", "type": "text", "layout": { "colSpan": 60 }, "props": { "text": "hi" } },
                { "id": "b", "type": "gallery", "layout": { "colSpan": 20 } },
                { "type": "kpi", "layout": { "colSpan": 15 } },
                { "id": "", "type": "kpi" },
                "junk",
                { "id": "a", "type": "kpi", "layout": { "colSpan": 15 } },
                { "id": "c", "type": "kpi", "layout": { "colSpan": 15.4, "colStart": 17, "rowStart": 2 } }
            ]
        });
        let page = normalize_page_config(Some(&raw), &template());
        assert_eq!(page.id, "home");
        assert_eq!(page.updated_at.as_deref(), Some("2024-03-01T00:00:00.000Z"));
        let ids: Vec<_> = page.blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        let c = page.block("c").unwrap();
        assert_eq!(c.layout.col_span, 15);
        assert_eq!(c.layout.col_start, Some(16));
        assert_eq!(c.layout.row_start, Some(2));
    }

    #[test]
    fn test_layout_is_clamped() {
        let raw = json!({ "id": "x", "type": "chart", "layout": { "colSpan": 900, "colStart": 7 } });
        let block = normalize_block(&raw).unwrap();
        assert_eq!(block.layout.col_span, 60);
        assert_eq!(block.layout.col_start, Some(1));

        let raw = json!({ "id": "y", "type": "chart", "layout": { "colSpan": -3 } });
        assert_eq!(normalize_block(&raw).unwrap().layout.col_span, 1);
    }

    #[test]
    fn test_missing_layout_uses_registry_default() {
        let raw = json!({ "id": "k", "type": "kpi" });
        let block = normalize_block(&raw).unwrap();
        assert_eq!(block.layout, registry::spec(BlockKind::Kpi).default_layout);
        assert_eq!(block.props, registry::spec(BlockKind::Kpi).create_default_props());
    }

    #[test]
    fn test_malformed_props_use_defaults() {
        let raw = json!({ "id": "p", "type": "pipeline", "props": { "stages": 12 } });
        let block = normalize_block(&raw).unwrap();
        assert_eq!(block.props, registry::spec(BlockKind::Pipeline).create_default_props());
    }

    #[test]
    fn test_blank_stamp_is_dropped() {
        let raw = json!({ "blocks": [], "updated_at": "  " });
        assert!(normalize_page_config(Some(&raw), &template()).updated_at.is_none());
    }
}
