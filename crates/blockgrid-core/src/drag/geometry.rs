//! Pointer input and the viewport geometry a drag reads from.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A pointer sample in client (viewport) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerInput {
    /// Platform pointer id; a drag only follows the pointer that started it.
    pub pointer_id: i32,
    pub position: Point,
}

impl PointerInput {
    pub fn new(pointer_id: i32, x: f64, y: f64) -> Self {
        Self {
            pointer_id,
            position: Point::new(x, y),
        }
    }
}

/// Geometry of the rendered page, in the same client coordinates as [`PointerInput`].
///
/// The browser implementation reads bounding rectangles from the DOM; tests supply
/// fixed rectangles.
pub trait ViewportGeometry {
    /// Bounding box of the grid container, `None` while it is not mounted.
    fn container_rect(&self) -> Option<Rect>;

    /// Bounding boxes of the rendered blocks, keyed by block id.
    fn block_rects(&self) -> Vec<(String, Rect)>;

    /// Height of the visible viewport.
    fn viewport_height(&self) -> f64;

    /// Scroll the page vertically by `dy` pixels.
    fn scroll_by(&mut self, dy: f64);

    /// Bounding box of one block.
    fn block_rect(&self, id: &str) -> Option<Rect> {
        self.block_rects()
            .into_iter()
            .find(|(block_id, _)| block_id == id)
            .map(|(_, rect)| rect)
    }
}
