//! Pointer-driven drag reordering of page blocks.

use super::geometry::{PointerInput, ViewportGeometry};
use super::state::{DragPhase, DragState};
use crate::layout::{GRID_COLUMNS, GridTracks, PackItem, Placement, pack, snap_col_start};
use crate::page::PageConfig;
use kurbo::{Point, Rect};
use std::collections::HashMap;

/// Tuning constants for drag interactions, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragConfig {
    /// Distance the pointer must travel before a press becomes a drag.
    pub move_threshold: f64,
    /// Distance from the last committed position before a new target is committed.
    pub hysteresis: f64,
    /// Margin around the container that still counts as a valid drop region.
    pub outside_padding: f64,
    /// Distance from the viewport top/bottom edge that triggers auto-scroll.
    pub edge_margin: f64,
    /// Pixels scrolled per move tick while in the edge margin.
    pub scroll_step: f64,
    /// Column gap of the rendered grid.
    pub grid_gap: f64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            move_threshold: 8.0,
            hysteresis: 14.0,
            outside_padding: 64.0,
            edge_margin: 84.0,
            scroll_step: 18.0,
            grid_gap: 16.0,
        }
    }
}

/// Trial layout shown while a drag is active.
#[derive(Debug, Clone, PartialEq)]
pub struct DragPreview {
    /// Cells of every block except the dragged one.
    pub placements: HashMap<String, Placement>,
    /// Cell of the drop indicator.
    pub placeholder: Placement,
    pub invalid: bool,
}

/// Result of releasing the pointer.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// The release did not belong to the tracked drag.
    Ignored,
    /// The drag ended without changing the page.
    Unchanged,
    /// The page with the dragged block moved and every block repacked.
    Moved(PageConfig),
}

/// Candidate target computed from one pointer sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Target {
    col_start: u32,
    index: usize,
    invalid: bool,
}

/// Drives a single drag at a time.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    config: DragConfig,
    state: Option<DragState>,
    preview: Option<DragPreview>,
}

impl DragController {
    pub fn new(config: DragConfig) -> Self {
        Self {
            config,
            state: None,
            preview: None,
        }
    }

    pub fn config(&self) -> &DragConfig {
        &self.config
    }

    pub fn state(&self) -> Option<&DragState> {
        self.state.as_ref()
    }

    pub fn phase(&self) -> DragPhase {
        self.state.as_ref().map_or(DragPhase::Idle, DragState::phase)
    }

    /// Live preview, present only while a drag is active.
    pub fn preview(&self) -> Option<&DragPreview> {
        self.preview.as_ref()
    }

    /// Id of the block being dragged, once the drag is active.
    pub fn dragging_block(&self) -> Option<&str> {
        self.state
            .as_ref()
            .filter(|s| s.active)
            .map(|s| s.block_id.as_str())
    }

    /// Floating copy of the dragged block under the pointer.
    pub fn ghost(&self) -> Option<Rect> {
        let state = self.state.as_ref().filter(|s| s.active)?;
        Some(Rect::from_origin_size(state.ghost_origin(), state.block_size))
    }

    /// Register a press on `block_id`. Returns false when ignored: another drag is
    /// in progress, or the block is not on the page or not rendered.
    pub fn pointer_down(
        &mut self,
        pointer: PointerInput,
        block_id: &str,
        page: &PageConfig,
        geometry: &dyn ViewportGeometry,
    ) -> bool {
        if self.state.is_some() {
            return false;
        }
        let Some(source_index) = page.index_of(block_id) else {
            return false;
        };
        let Some(rect) = geometry.block_rect(block_id) else {
            return false;
        };
        let layout = page.blocks[source_index].layout;

        self.state = Some(DragState {
            block_id: block_id.to_string(),
            pointer_id: pointer.pointer_id,
            start: pointer.position,
            current: pointer.position,
            grab_offset: pointer.position - rect.origin(),
            block_size: rect.size(),
            source_index,
            insertion_index: source_index,
            target_col_start: snap_col_start(
                f64::from(layout.col_start.unwrap_or(1)),
                layout.col_span,
                GRID_COLUMNS,
            ),
            active: false,
            invalid: false,
            stable: pointer.position,
        });
        self.preview = None;
        true
    }

    /// Track a pointer move. Returns true when the committed target changed (or the
    /// drag just became active) and the preview was recomputed.
    pub fn pointer_move(
        &mut self,
        pointer: PointerInput,
        page: &PageConfig,
        geometry: &mut dyn ViewportGeometry,
    ) -> bool {
        let config = self.config;
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        if state.pointer_id != pointer.pointer_id {
            return false;
        }
        state.current = pointer.position;

        let mut changed = false;
        if !state.active {
            if state.moved() <= config.move_threshold {
                return false;
            }
            state.active = true;
            changed = true;
            log::debug!("drag of {} became active", state.block_id);
        }

        auto_scroll(&config, pointer.position, geometry);

        if let Some(target) = compute_target(&config, state, page, geometry) {
            let committed = Target {
                col_start: state.target_col_start,
                index: state.insertion_index,
                invalid: state.invalid,
            };
            if target != committed && state.stable.distance(pointer.position) >= config.hysteresis {
                state.target_col_start = target.col_start;
                state.insertion_index = target.index;
                state.invalid = target.invalid;
                state.stable = pointer.position;
                changed = true;
                log::debug!(
                    "drag target for {}: col {} index {} invalid {}",
                    state.block_id,
                    target.col_start,
                    target.index,
                    target.invalid
                );
            }
        }

        if changed {
            let preview = build_preview(state, page);
            self.preview = preview;
        }
        changed
    }

    /// Finish the drag. An inactive drag or a drop outside the region changes nothing.
    pub fn pointer_up(&mut self, pointer: PointerInput, page: &PageConfig) -> DropOutcome {
        match &self.state {
            Some(state) if state.pointer_id == pointer.pointer_id => {}
            _ => return DropOutcome::Ignored,
        }
        let Some(state) = self.state.take() else {
            return DropOutcome::Ignored;
        };
        self.preview = None;

        if !state.active || state.invalid {
            return DropOutcome::Unchanged;
        }
        let Some(source) = page.index_of(&state.block_id) else {
            return DropOutcome::Unchanged;
        };

        let mut next = page.clone();
        let mut dragged = next.blocks.remove(source);
        dragged.layout.col_start = Some(state.target_col_start);
        let index = state.insertion_index.min(next.blocks.len());
        next.blocks.insert(index, dragged);

        let packed = pack(&next.pack_items(), GRID_COLUMNS);
        next.apply_packing(&packed);

        if next.blocks == page.blocks {
            DropOutcome::Unchanged
        } else {
            DropOutcome::Moved(next)
        }
    }

    /// Abandon the drag without touching the page.
    pub fn pointer_cancel(&mut self, pointer_id: i32) -> bool {
        if self.state.as_ref().is_some_and(|s| s.pointer_id == pointer_id) {
            self.state = None;
            self.preview = None;
            return true;
        }
        false
    }
}

fn auto_scroll(config: &DragConfig, pointer: Point, geometry: &mut dyn ViewportGeometry) {
    if pointer.y < config.edge_margin {
        geometry.scroll_by(-config.scroll_step);
    } else if pointer.y > geometry.viewport_height() - config.edge_margin {
        geometry.scroll_by(config.scroll_step);
    }
}

/// Candidate target for the current pointer sample. `None` when the geometry is not
/// usable this tick.
fn compute_target(
    config: &DragConfig,
    state: &DragState,
    page: &PageConfig,
    geometry: &dyn ViewportGeometry,
) -> Option<Target> {
    let container = geometry.container_rect()?;
    let dragged = page.block(&state.block_id)?;

    let tracks = GridTracks::new(container, config.grid_gap, GRID_COLUMNS);
    // Project the ghost's left edge, not the pointer, so the grab point does not shift the slot.
    let left_edge = state.current.x - state.grab_offset.x;
    let col_start = tracks.snap_x(left_edge, dragged.layout.col_span);

    let index = geometry
        .block_rects()
        .iter()
        .filter(|(id, _)| *id != state.block_id && page.block(id).is_some())
        .filter(|(_, rect)| rect.center().y < state.current.y)
        .count();

    let region = container.inflate(config.outside_padding, config.outside_padding);
    let invalid = !region.contains(state.current);

    Some(Target {
        col_start,
        index,
        invalid,
    })
}

/// Pack the other blocks around a placeholder at the committed target.
fn build_preview(state: &DragState, page: &PageConfig) -> Option<DragPreview> {
    let dragged = page.block(&state.block_id)?;
    let mut items: Vec<PackItem> = page
        .blocks
        .iter()
        .filter(|b| b.id != state.block_id)
        .map(|b| PackItem::new(b.id.clone(), b.layout.col_span, b.layout.col_start))
        .collect();
    let index = state.insertion_index.min(items.len());
    items.insert(
        index,
        PackItem::new(
            format!("{}::placeholder", state.block_id),
            dragged.layout.col_span,
            Some(state.target_col_start),
        ),
    );

    let mut packed = pack(&items, GRID_COLUMNS);
    let placeholder = packed.remove(index).placement;
    Some(DragPreview {
        placements: packed.into_iter().map(|p| (p.id, p.placement)).collect(),
        placeholder,
        invalid: state.invalid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockKind};

    /// 60 tracks of 10px with no gap: column n starts at x = (n - 1) * 10.
    /// Rows are 100px tall starting at y = 0.
    struct FakeViewport {
        container: Option<Rect>,
        rects: Vec<(String, Rect)>,
        height: f64,
        scrolled: f64,
    }

    impl FakeViewport {
        fn for_page(page: &PageConfig) -> Self {
            let rects = page
                .blocks
                .iter()
                .map(|b| {
                    let col = f64::from(b.layout.col_start.unwrap() - 1);
                    let row = f64::from(b.layout.row_start.unwrap() - 1);
                    let span = f64::from(b.layout.col_span);
                    let rect = Rect::new(col * 10.0, row * 100.0, (col + span) * 10.0, row * 100.0 + 90.0);
                    (b.id.clone(), rect)
                })
                .collect();
            Self {
                container: Some(Rect::new(0.0, 0.0, 600.0, 1000.0)),
                rects,
                height: 1000.0,
                scrolled: 0.0,
            }
        }
    }

    impl ViewportGeometry for FakeViewport {
        fn container_rect(&self) -> Option<Rect> {
            self.container
        }

        fn block_rects(&self) -> Vec<(String, Rect)> {
            self.rects.clone()
        }

        fn viewport_height(&self) -> f64 {
            self.height
        }

        fn scroll_by(&mut self, dy: f64) {
            self.scrolled += dy;
        }
    }

    fn controller() -> DragController {
        DragController::new(DragConfig {
            grid_gap: 0.0,
            ..DragConfig::default()
        })
    }

    /// Three stacked span-20 blocks in column 1: a (row 1), b (row 2), c (row 3).
    fn page() -> PageConfig {
        let mut page = PageConfig::new("p");
        for id in ["a", "b", "c"] {
            page.blocks.push(Block::with_id(id, BlockKind::Kpi).with_span(20));
        }
        page.repack();
        page
    }

    fn at(x: f64, y: f64) -> PointerInput {
        PointerInput::new(1, x, y)
    }

    #[test]
    fn test_press_below_threshold_is_not_a_drag() {
        let page = page();
        let mut viewport = FakeViewport::for_page(&page);
        let mut drag = controller();

        assert!(drag.pointer_down(at(50.0, 150.0), "b", &page, &viewport));
        assert_eq!(drag.phase(), DragPhase::Pressed);
        assert!(!drag.pointer_move(at(55.0, 154.0), &page, &mut viewport));
        assert!(drag.preview().is_none());
        assert_eq!(drag.pointer_up(at(55.0, 154.0), &page), DropOutcome::Unchanged);
        assert_eq!(drag.phase(), DragPhase::Idle);
    }

    #[test]
    fn test_second_pointer_is_ignored() {
        let page = page();
        let mut viewport = FakeViewport::for_page(&page);
        let mut drag = controller();

        assert!(drag.pointer_down(at(50.0, 150.0), "b", &page, &viewport));
        assert!(!drag.pointer_down(PointerInput::new(2, 50.0, 50.0), "a", &page, &viewport));
        assert!(!drag.pointer_move(PointerInput::new(2, 300.0, 150.0), &page, &mut viewport));
        assert_eq!(drag.pointer_up(PointerInput::new(2, 300.0, 150.0), &page), DropOutcome::Ignored);
        assert_eq!(drag.state().unwrap().block_id, "b");
    }

    #[test]
    fn test_activation_produces_preview() {
        let page = page();
        let mut viewport = FakeViewport::for_page(&page);
        let mut drag = controller();

        drag.pointer_down(at(50.0, 150.0), "b", &page, &viewport);
        assert!(drag.pointer_move(at(60.0, 150.0), &page, &mut viewport));
        assert_eq!(drag.phase(), DragPhase::Dragging);
        let preview = drag.preview().unwrap();
        assert_eq!(preview.placeholder, Placement { col_start: 1, row_start: 2, col_span: 20 });
        assert_eq!(preview.placements["a"].row_start, 1);
        assert_eq!(preview.placements["c"].row_start, 3);
        assert!(!preview.placements.contains_key("b"));
    }

    #[test]
    fn test_move_to_next_column() {
        let page = page();
        let mut viewport = FakeViewport::for_page(&page);
        let mut drag = controller();

        // Grab b 50px from its left edge, move right by 200px: left edge at x = 200 -> column 21.
        drag.pointer_down(at(50.0, 150.0), "b", &page, &viewport);
        drag.pointer_move(at(250.0, 150.0), &page, &mut viewport);
        assert_eq!(drag.state().unwrap().target_col_start, 21);
        assert_eq!(drag.preview().unwrap().placeholder.col_start, 21);

        let DropOutcome::Moved(next) = drag.pointer_up(at(250.0, 150.0), &page) else {
            panic!("expected a move");
        };
        let b = next.block("b").unwrap();
        assert_eq!((b.layout.row_start, b.layout.col_start), (Some(1), Some(21)));
        let c = next.block("c").unwrap();
        assert_eq!((c.layout.row_start, c.layout.col_start), (Some(2), Some(1)));
    }

    #[test]
    fn test_column_follows_ghost_left_edge() {
        let page = page();
        let mut viewport = FakeViewport::for_page(&page);
        let mut drag = controller();

        // Grabbed near its right edge, b's left edge only reaches x = 10 (column 2).
        drag.pointer_down(at(190.0, 150.0), "b", &page, &viewport);
        assert!(drag.pointer_move(at(200.0, 150.0), &page, &mut viewport));
        assert_eq!(drag.state().unwrap().target_col_start, 1);
        assert_eq!(drag.preview().unwrap().placeholder.col_start, 1);
    }

    #[test]
    fn test_hysteresis_delays_commit() {
        let page = page();
        let mut viewport = FakeViewport::for_page(&page);
        let mut drag = controller();

        drag.pointer_down(at(50.0, 150.0), "b", &page, &viewport);
        // Active after 9px; the target is still b's own slot.
        assert!(drag.pointer_move(at(50.0, 141.0), &page, &mut viewport));
        assert_eq!(drag.state().unwrap().insertion_index, 1);
        // Pointer above a's midpoint (45) commits index 0 once 14px away from the start.
        drag.pointer_move(at(50.0, 40.0), &page, &mut viewport);
        assert_eq!(drag.state().unwrap().insertion_index, 0);
        let stable = drag.state().unwrap().stable;
        assert_eq!(stable, Point::new(50.0, 40.0));
        // Back below a's midpoint, but only 10px from the last commit: held.
        assert!(!drag.pointer_move(at(50.0, 50.0), &page, &mut viewport));
        assert_eq!(drag.state().unwrap().insertion_index, 0);
        // Further away: committed.
        assert!(drag.pointer_move(at(50.0, 60.0), &page, &mut viewport));
        assert_eq!(drag.state().unwrap().insertion_index, 1);
    }

    #[test]
    fn test_reorder_to_top() {
        let page = page();
        let mut viewport = FakeViewport::for_page(&page);
        let mut drag = controller();

        drag.pointer_down(at(50.0, 250.0), "c", &page, &viewport);
        drag.pointer_move(at(50.0, 20.0), &page, &mut viewport);
        let DropOutcome::Moved(next) = drag.pointer_up(at(50.0, 20.0), &page) else {
            panic!("expected a move");
        };
        let order: Vec<_> = next.blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        assert_eq!(next.block("c").unwrap().layout.row_start, Some(1));
    }

    #[test]
    fn test_drop_outside_changes_nothing() {
        let page = page();
        let mut viewport = FakeViewport::for_page(&page);
        let mut drag = controller();

        drag.pointer_down(at(50.0, 150.0), "b", &page, &viewport);
        drag.pointer_move(at(800.0, 150.0), &page, &mut viewport);
        assert!(drag.state().unwrap().invalid);
        assert!(drag.preview().unwrap().invalid);
        assert_eq!(drag.pointer_up(at(800.0, 150.0), &page), DropOutcome::Unchanged);
    }

    #[test]
    fn test_padding_keeps_near_drop_valid() {
        let page = page();
        let mut viewport = FakeViewport::for_page(&page);
        let mut drag = controller();

        drag.pointer_down(at(50.0, 150.0), "b", &page, &viewport);
        drag.pointer_move(at(650.0, 150.0), &page, &mut viewport);
        assert!(!drag.state().unwrap().invalid);
    }

    #[test]
    fn test_cancel_discards() {
        let page = page();
        let mut viewport = FakeViewport::for_page(&page);
        let mut drag = controller();

        drag.pointer_down(at(50.0, 150.0), "b", &page, &viewport);
        drag.pointer_move(at(250.0, 150.0), &page, &mut viewport);
        assert!(!drag.pointer_cancel(7));
        assert!(drag.pointer_cancel(1));
        assert_eq!(drag.phase(), DragPhase::Idle);
        assert!(drag.preview().is_none());
        assert_eq!(drag.pointer_up(at(250.0, 150.0), &page), DropOutcome::Ignored);
    }

    #[test]
    fn test_auto_scroll_near_edges() {
        let page = page();
        let mut viewport = FakeViewport::for_page(&page);
        let mut drag = controller();

        drag.pointer_down(at(50.0, 150.0), "b", &page, &viewport);
        drag.pointer_move(at(50.0, 960.0), &page, &mut viewport);
        assert_eq!(viewport.scrolled, 18.0);
        drag.pointer_move(at(50.0, 970.0), &page, &mut viewport);
        assert_eq!(viewport.scrolled, 36.0);
        drag.pointer_move(at(50.0, 30.0), &page, &mut viewport);
        assert_eq!(viewport.scrolled, 18.0);
    }

    #[test]
    fn test_unmounted_container_keeps_state() {
        let page = page();
        let mut viewport = FakeViewport::for_page(&page);
        let mut drag = controller();

        drag.pointer_down(at(50.0, 150.0), "b", &page, &viewport);
        viewport.container = None;
        drag.pointer_move(at(250.0, 20.0), &page, &mut viewport);
        let state = drag.state().unwrap();
        assert_eq!((state.target_col_start, state.insertion_index), (1, 1));
    }

    #[test]
    fn test_ghost_follows_pointer() {
        let page = page();
        let mut viewport = FakeViewport::for_page(&page);
        let mut drag = controller();

        drag.pointer_down(at(50.0, 150.0), "b", &page, &viewport);
        assert!(drag.ghost().is_none());
        drag.pointer_move(at(70.0, 180.0), &page, &mut viewport);
        assert_eq!(drag.ghost(), Some(Rect::new(20.0, 130.0, 220.0, 220.0)));
    }

    #[test]
    fn test_drop_in_place_is_unchanged() {
        let page = page();
        let mut viewport = FakeViewport::for_page(&page);
        let mut drag = controller();

        drag.pointer_down(at(50.0, 150.0), "b", &page, &viewport);
        drag.pointer_move(at(62.0, 152.0), &page, &mut viewport);
        assert_eq!(drag.pointer_up(at(62.0, 152.0), &page), DropOutcome::Unchanged);
    }
}
