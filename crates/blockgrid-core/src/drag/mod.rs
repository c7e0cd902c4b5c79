//! Drag-and-drop of blocks across the page grid.
//!
//! A drag is driven by pointer events in client coordinates. The controller reads the
//! rendered layout through [`ViewportGeometry`], keeps a live [`DragPreview`] and on
//! release produces the repacked page.

mod controller;
mod geometry;
mod state;

pub use controller::{DragConfig, DragController, DragPreview, DropOutcome};
pub use geometry::{PointerInput, ViewportGeometry};
pub use state::{DragPhase, DragState};
