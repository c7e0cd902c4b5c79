//! Slot functionality for aligning block column starts to the grid.

use kurbo::Rect;

/// Number of column tracks on a page grid.
pub const GRID_COLUMNS: u32 = 60;

/// Round and clamp a raw span into `1..=total_columns`.
pub fn clamp_span(span: f64, total_columns: u32) -> u32 {
    let total = total_columns.max(1);
    if !span.is_finite() {
        return total;
    }
    (span.round().max(1.0) as u32).min(total)
}

/// Legal column starts for a block of `span` columns.
///
/// Starts step by `span` from column 1. When the span does not evenly divide the grid,
/// the start that keeps the block flush with the right edge is appended.
pub fn allowed_column_starts(span: u32, total_columns: u32) -> Vec<u32> {
    let total = total_columns.max(1);
    let span = span.clamp(1, total);
    let max_start = total - span + 1;

    let mut starts: Vec<u32> = (1..=max_start).step_by(span as usize).collect();
    if starts.last() != Some(&max_start) {
        starts.push(max_start);
    }
    starts
}

/// Snap a column start to the closest legal slot for `span`.
/// Ties resolve to the smaller (leftward) start.
pub fn snap_col_start(col_start: f64, span: u32, total_columns: u32) -> u32 {
    let starts = allowed_column_starts(span, total_columns);
    let target = if col_start.is_finite() { col_start.round() } else { 1.0 };

    let mut best = starts[0];
    let mut best_dist = (f64::from(best) - target).abs();
    for &start in &starts[1..] {
        let dist = (f64::from(start) - target).abs();
        if dist < best_dist {
            best = start;
            best_dist = dist;
        }
    }
    best
}

/// Track geometry of a rendered grid container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTracks {
    /// Container bounds in client coordinates.
    pub bounds: Rect,
    /// Horizontal gap between tracks in pixels.
    pub gap: f64,
    /// Number of tracks.
    pub columns: u32,
}

impl GridTracks {
    pub fn new(bounds: Rect, gap: f64, columns: u32) -> Self {
        Self {
            bounds,
            gap: gap.max(0.0),
            columns: columns.max(1),
        }
    }

    /// Width of a single track (container width minus gaps, divided into tracks).
    pub fn track_width(&self) -> f64 {
        let gaps = self.gap * f64::from(self.columns - 1);
        ((self.bounds.width() - gaps) / f64::from(self.columns)).max(0.0)
    }

    /// Distance between the left edges of two neighbouring tracks.
    pub fn pitch(&self) -> f64 {
        self.track_width() + self.gap
    }

    /// Project an x coordinate onto a fractional 1-based column.
    pub fn column_at(&self, x: f64) -> f64 {
        let pitch = self.pitch();
        if pitch <= 0.0 {
            return 1.0;
        }
        (x - self.bounds.x0) / pitch + 1.0
    }

    /// Snap the left edge `x` of a block with `span` columns to a legal slot.
    pub fn snap_x(&self, x: f64, span: u32) -> u32 {
        snap_col_start(self.column_at(x), span, self.columns)
    }

    /// Left pixel edge of a 1-based column.
    pub fn column_left(&self, col: u32) -> f64 {
        self.bounds.x0 + f64::from(col.max(1) - 1) * self.pitch()
    }
}
