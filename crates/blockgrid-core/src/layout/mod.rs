//! Grid layout: slot geometry and block packing.

mod packer;
mod slots;

pub use packer::{PackItem, PackedItem, Placement, pack};
pub use slots::{
    GRID_COLUMNS, GridTracks, allowed_column_starts, clamp_span, snap_col_start,
};
