//! Page configuration: the persisted unit of a page's blocks.

use crate::block::{Block, BlockKind};
use crate::layout::{GRID_COLUMNS, PackItem, PackedItem, pack};
use crate::timestamp::{format_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Current page configuration schema version.
pub const PAGE_CONFIG_VERSION: u32 = 1;

/// A page's ordered blocks plus the stamp used to resolve concurrent writers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageConfig {
    /// Page identifier.
    pub id: String,
    pub version: u32,
    /// Blocks in packing-hint order.
    pub blocks: Vec<Block>,
    /// ISO-8601 stamp of the last edit. Configs without one are older than any stamped config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl PageConfig {
    /// Create an empty, unstamped page.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: PAGE_CONFIG_VERSION,
            blocks: Vec::new(),
            updated_at: None,
        }
    }

    /// Create a page holding fresh blocks of the given kinds, packed.
    pub fn from_kinds(id: impl Into<String>, kinds: &[BlockKind]) -> Self {
        let mut page = Self::new(id);
        page.blocks = kinds.iter().map(|&kind| Block::new(kind)).collect();
        page.repack();
        page
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parsed `updated_at`, if present and valid.
    pub fn updated_at_time(&self) -> Option<DateTime<Utc>> {
        self.updated_at.as_deref().and_then(parse_timestamp)
    }

    /// Set `updated_at` to `at`.
    pub fn stamp(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(format_timestamp(at));
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn block_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether every block id is unique.
    pub fn has_unique_ids(&self) -> bool {
        let mut seen = HashSet::new();
        self.blocks.iter().all(|b| seen.insert(b.id.as_str()))
    }

    /// Pack items for the current blocks, each preferring its current column.
    pub fn pack_items(&self) -> Vec<PackItem> {
        self.blocks
            .iter()
            .map(|b| PackItem::new(b.id.clone(), b.layout.col_span, b.layout.col_start))
            .collect()
    }

    /// Write packed cells back into the blocks and reorder them into reading order.
    pub fn apply_packing(&mut self, packed: &[PackedItem]) {
        let cells: HashMap<&str, _> = packed
            .iter()
            .map(|p| (p.id.as_str(), p.placement))
            .collect();
        for block in &mut self.blocks {
            if let Some(placement) = cells.get(block.id.as_str()) {
                block.layout.place(*placement);
            }
        }
        self.sort_reading_order();
    }

    /// Repack every block from its current column hints.
    pub fn repack(&mut self) {
        let packed = pack(&self.pack_items(), GRID_COLUMNS);
        self.apply_packing(&packed);
    }

    /// Stable sort by `(row_start, col_start)`; unplaced blocks keep their relative order at the end.
    pub fn sort_reading_order(&mut self) {
        self.blocks.sort_by_key(|b| {
            (
                b.layout.row_start.unwrap_or(u32::MAX),
                b.layout.col_start.unwrap_or(u32::MAX),
            )
        });
    }
}
