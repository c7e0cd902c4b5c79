//! Page editor: block operations, drag wiring and grid cell output.

use crate::block::{Block, BlockKind, BlockProps};
use crate::config_store::{ConfigStore, FlushOutcome};
use crate::drag::{DragConfig, DragController, DropOutcome, PointerInput, ViewportGeometry};
use crate::layout::{GRID_COLUMNS, Placement, clamp_span, pack, snap_col_start};
use crate::page::PageConfig;
use crate::registry::{self, BlockSpec};
use crate::settings::{Settings, SettingsBackend};
use crate::storage::LocalCache;
use kurbo::Rect;
use serde_json::{Map, Value};
use thiserror::Error;

/// Editor errors.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Block not found: {0}")]
    BlockNotFound(String),
    #[error("Deletion of block {0} was not confirmed")]
    NotConfirmed(String),
    #[error("Block {id} is a {expected} block, got {found} props")]
    KindMismatch {
        id: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Invalid props for block {id}: {source}")]
    InvalidProps {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

/// One rendered grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    /// Block id. The drop indicator carries the dragged block's id.
    pub id: String,
    pub kind: BlockKind,
    pub placement: Placement,
    /// Whether this cell is the drop indicator of an active drag.
    pub placeholder: bool,
}

impl GridCell {
    /// CSS `grid-column` value.
    pub fn grid_column(&self) -> String {
        format!("{} / span {}", self.placement.col_start, self.placement.col_span)
    }

    /// CSS `grid-row` value.
    pub fn grid_row(&self) -> String {
        self.placement.row_start.to_string()
    }
}

/// Edits one page. Every mutation repacks the page and commits it to the [`ConfigStore`].
pub struct PageEditor<B: SettingsBackend, L: LocalCache> {
    store: ConfigStore<B, L>,
    drag: DragController,
}

impl<B: SettingsBackend, L: LocalCache> PageEditor<B, L> {
    pub fn new(store: ConfigStore<B, L>, drag_config: DragConfig) -> Self {
        Self {
            store,
            drag: DragController::new(drag_config),
        }
    }

    /// The current page.
    pub fn page(&self) -> &PageConfig {
        self.store.config()
    }

    pub fn store(&self) -> &ConfigStore<B, L> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConfigStore<B, L> {
        &mut self.store
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    /// Block kinds that can be added.
    pub fn library(&self) -> Vec<BlockSpec> {
        registry::library()
    }

    /// Load the page.
    pub fn start(&mut self, settings: Settings) {
        self.store.start(settings);
    }

    /// Remote settings changed.
    pub fn settings_changed(&mut self, settings: Settings) {
        self.store.rehydrate(settings);
    }

    /// Append a fresh block of `kind`. Returns its id.
    pub fn add_block(&mut self, kind: BlockKind) -> String {
        self.insert_block(Block::new(kind), None)
    }

    /// Insert `block` at `index` (appended when `None`). Returns its id.
    pub fn insert_block(&mut self, block: Block, index: Option<usize>) -> String {
        let id = block.id.clone();
        let mut page = self.page().clone();
        let index = index.unwrap_or(page.len()).min(page.len());
        page.blocks.insert(index, block);
        log::debug!("adding block {} at {}", id, index);
        self.commit_repacked(page);
        id
    }

    /// Copy a block under a fresh id, right after the original. Returns the new id.
    pub fn duplicate_block(&mut self, id: &str) -> EditorResult<String> {
        let index = self.index_of(id)?;
        let source = &self.page().blocks[index];
        let mut copy = source.duplicate();
        copy.layout.col_start = source.layout.col_start;
        Ok(self.insert_block(copy, Some(index + 1)))
    }

    /// Remove a block once `confirm` agrees. The remaining blocks are repacked.
    pub fn delete_block(
        &mut self,
        id: &str,
        confirm: impl FnOnce(&Block) -> bool,
    ) -> EditorResult<Block> {
        let index = self.index_of(id)?;
        if !confirm(&self.page().blocks[index]) {
            return Err(EditorError::NotConfirmed(id.to_string()));
        }
        let mut page = self.page().clone();
        let removed = page.blocks.remove(index);
        log::debug!("deleting block {}", id);
        self.commit_repacked(page);
        Ok(removed)
    }

    /// Change a block's width. The span is rounded and clamped, the column re-snapped.
    pub fn resize_block(&mut self, id: &str, span: f64) -> EditorResult<()> {
        let index = self.index_of(id)?;
        let span = clamp_span(span, GRID_COLUMNS);
        let mut page = self.page().clone();
        let layout = &mut page.blocks[index].layout;
        layout.col_span = span;
        layout.col_start = layout
            .col_start
            .map(|col| snap_col_start(f64::from(col), span, GRID_COLUMNS));
        self.commit_repacked(page);
        Ok(())
    }

    /// Replace a block's props. The props must be of the block's kind.
    pub fn update_props(&mut self, id: &str, props: BlockProps) -> EditorResult<()> {
        let index = self.index_of(id)?;
        let expected = self.page().blocks[index].kind();
        if props.kind() != expected {
            return Err(EditorError::KindMismatch {
                id: id.to_string(),
                expected: expected.as_str(),
                found: props.kind().as_str(),
            });
        }
        let mut page = self.page().clone();
        page.blocks[index].props = props;
        self.store.commit(page);
        Ok(())
    }

    /// Shallow-merge `patch` into a block's props.
    pub fn patch_props(&mut self, id: &str, patch: &Map<String, Value>) -> EditorResult<()> {
        let index = self.index_of(id)?;
        let mut page = self.page().clone();
        page.blocks[index]
            .patch_props(patch)
            .map_err(|source| EditorError::InvalidProps {
                id: id.to_string(),
                source,
            })?;
        self.store.commit(page);
        Ok(())
    }

    pub fn pointer_down(
        &mut self,
        pointer: PointerInput,
        block_id: &str,
        geometry: &dyn ViewportGeometry,
    ) -> bool {
        self.drag
            .pointer_down(pointer, block_id, self.store.config(), geometry)
    }

    pub fn pointer_move(&mut self, pointer: PointerInput, geometry: &mut dyn ViewportGeometry) -> bool {
        self.drag.pointer_move(pointer, self.store.config(), geometry)
    }

    /// Finish a drag. Returns whether the page changed.
    pub fn pointer_up(&mut self, pointer: PointerInput) -> bool {
        match self.drag.pointer_up(pointer, self.store.config()) {
            DropOutcome::Moved(page) => {
                self.store.commit(page);
                true
            }
            DropOutcome::Unchanged | DropOutcome::Ignored => false,
        }
    }

    pub fn pointer_cancel(&mut self, pointer_id: i32) -> bool {
        self.drag.pointer_cancel(pointer_id)
    }

    /// Floating copy of the dragged block.
    pub fn ghost(&self) -> Option<Rect> {
        self.drag.ghost()
    }

    /// Grid cells to render, in reading order. While a drag is active the other blocks
    /// follow the live preview and the dragged block is shown as the drop indicator.
    pub fn render_cells(&self) -> Vec<GridCell> {
        let page = self.page();
        let mut cells: Vec<GridCell> = match (self.drag.preview(), self.drag.dragging_block()) {
            (Some(preview), Some(dragged)) => page
                .blocks
                .iter()
                .filter_map(|block| {
                    if block.id == dragged {
                        Some(GridCell {
                            id: block.id.clone(),
                            kind: block.kind(),
                            placement: preview.placeholder,
                            placeholder: true,
                        })
                    } else {
                        preview.placements.get(&block.id).map(|placement| GridCell {
                            id: block.id.clone(),
                            kind: block.kind(),
                            placement: *placement,
                            placeholder: false,
                        })
                    }
                })
                .collect(),
            _ => pack(&page.pack_items(), GRID_COLUMNS)
                .into_iter()
                .zip(&page.blocks)
                .map(|(packed, block)| GridCell {
                    id: packed.id,
                    kind: block.kind(),
                    placement: packed.placement,
                    placeholder: false,
                })
                .collect(),
        };
        cells.sort_by_key(|cell| (cell.placement.row_start, cell.placement.col_start));
        cells
    }

    pub async fn tick(&mut self) -> FlushOutcome {
        self.store.tick().await
    }

    pub async fn on_page_hide(&mut self) -> FlushOutcome {
        self.store.on_page_hide().await
    }

    pub async fn on_visibility_change(&mut self, hidden: bool) -> FlushOutcome {
        self.store.on_visibility_change(hidden).await
    }

    /// Tear down, flushing any unsaved edit.
    pub async fn dispose(self) -> FlushOutcome {
        self.store.dispose().await
    }

    fn index_of(&self, id: &str) -> EditorResult<usize> {
        self.page()
            .index_of(id)
            .ok_or_else(|| EditorError::BlockNotFound(id.to_string()))
    }

    fn commit_repacked(&mut self, mut page: PageConfig) {
        page.repack();
        self.store.commit(page);
    }
}
