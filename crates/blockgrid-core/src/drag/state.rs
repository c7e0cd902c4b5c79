//! Drag state definitions.

use kurbo::{Point, Size, Vec2};

/// Phase of the drag state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragPhase {
    /// No pointer is holding a block.
    #[default]
    Idle,
    /// Pointer is down on a block but has not moved past the threshold.
    Pressed,
    /// Drag is active and producing previews.
    Dragging,
}

/// One pointer-driven drag, from pointer-down to pointer-up or cancel.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub block_id: String,
    pub pointer_id: i32,
    pub start: Point,
    pub current: Point,
    /// Offset from the block's top-left corner to the grab point.
    pub grab_offset: Vec2,
    /// Size of the block when the drag started (ghost size).
    pub block_size: Size,
    pub source_index: usize,
    /// Committed insertion index among the other blocks.
    pub insertion_index: usize,
    /// Committed column start for the dragged block.
    pub target_col_start: u32,
    /// Whether the pointer has moved past the move threshold.
    pub active: bool,
    /// Whether the committed drop point is outside the drop region.
    pub invalid: bool,
    /// Pointer position at the last committed state change.
    pub stable: Point,
}

impl DragState {
    pub fn phase(&self) -> DragPhase {
        if self.active {
            DragPhase::Dragging
        } else {
            DragPhase::Pressed
        }
    }

    /// Distance moved since pointer-down.
    pub fn moved(&self) -> f64 {
        self.start.distance(self.current)
    }

    /// Top-left corner of the ghost under the pointer.
    pub fn ghost_origin(&self) -> Point {
        self.current - self.grab_offset
    }
}
