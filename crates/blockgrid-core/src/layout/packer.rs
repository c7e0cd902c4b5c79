//! Deterministic packing of variable-width blocks onto a fixed-column grid.
//!
//! Items are placed in input order. A row accepts a single span only: the first block
//! placed in a row commits the row's span and later blocks of another span move further
//! down. Together with the preferred-column hint this keeps equal-width blocks stacked in
//! the column they were dropped into.

use super::slots::{allowed_column_starts, snap_col_start};
use serde::{Deserialize, Serialize};

/// Minimal projection of a block needed for packing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackItem {
    pub id: String,
    pub span: u32,
    pub preferred_col: Option<u32>,
}

impl PackItem {
    pub fn new(id: impl Into<String>, span: u32, preferred_col: Option<u32>) -> Self {
        Self {
            id: id.into(),
            span,
            preferred_col,
        }
    }
}

/// Concrete grid cell assigned to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub col_start: u32,
    pub row_start: u32,
    pub col_span: u32,
}

impl Placement {
    /// Last column covered by this placement (inclusive).
    pub fn col_end(&self) -> u32 {
        self.col_start + self.col_span - 1
    }

    /// Whether two placements share at least one cell.
    pub fn overlaps(&self, other: &Placement) -> bool {
        self.row_start == other.row_start
            && self.col_start <= other.col_end()
            && other.col_start <= self.col_end()
    }
}

/// A packed item, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedItem {
    pub id: String,
    pub placement: Placement,
}

#[derive(Debug, Clone)]
struct Row {
    span: Option<u32>,
    occupied: Vec<bool>,
}

impl Row {
    fn new(total_columns: u32) -> Self {
        Self {
            span: None,
            occupied: vec![false; total_columns as usize],
        }
    }

    fn accepts_span(&self, span: u32) -> bool {
        self.span.is_none_or(|s| s == span)
    }

    fn is_free(&self, col_start: u32, span: u32) -> bool {
        let from = (col_start - 1) as usize;
        let to = from + span as usize;
        to <= self.occupied.len() && self.occupied[from..to].iter().all(|cell| !cell)
    }

    fn occupy(&mut self, col_start: u32, span: u32) {
        let from = (col_start - 1) as usize;
        let to = (from + span as usize).min(self.occupied.len());
        for cell in &mut self.occupied[from..to] {
            *cell = true;
        }
        self.span = Some(span);
    }
}

/// Row ceiling for the regular scans. Every item fits into a fresh row, so this bound
/// is never reached with consistent input.
fn row_ceiling(item_count: usize) -> usize {
    item_count * 2 + 8
}

struct Grid {
    total_columns: u32,
    rows: Vec<Row>,
}

impl Grid {
    fn new(total_columns: u32) -> Self {
        Self {
            total_columns,
            rows: Vec::new(),
        }
    }

    fn row_mut(&mut self, index: usize) -> &mut Row {
        while self.rows.len() <= index {
            self.rows.push(Row::new(self.total_columns));
        }
        &mut self.rows[index]
    }

    fn fits(&mut self, index: usize, col_start: u32, span: u32) -> bool {
        let row = self.row_mut(index);
        row.accepts_span(span) && row.is_free(col_start, span)
    }
}

/// Assign every item a non-overlapping `(row_start, col_start)` on a grid of
/// `total_columns` columns. The result is in input order.
pub fn pack(items: &[PackItem], total_columns: u32) -> Vec<PackedItem> {
    let total_columns = total_columns.max(1);
    let ceiling = row_ceiling(items.len());
    let mut grid = Grid::new(total_columns);
    let mut packed = Vec::with_capacity(items.len());

    for item in items {
        let span = item.span.clamp(1, total_columns);
        let starts = allowed_column_starts(span, total_columns);
        let preferred = snap_col_start(
            f64::from(item.preferred_col.unwrap_or(1)),
            span,
            total_columns,
        );

        let mut slot = (0..ceiling)
            .find(|&row| grid.fits(row, preferred, span))
            .map(|row| (row, preferred));

        if slot.is_none() {
            slot = (0..ceiling).find_map(|row| {
                starts
                    .iter()
                    .copied()
                    .filter(|&col| col != preferred)
                    .find(|&col| grid.fits(row, col, span))
                    .map(|col| (row, col))
            });
        }

        let (row, col) = slot.unwrap_or_else(|| {
            log::warn!("grid packer overflow for block {}", item.id);
            (grid.rows.len().max(ceiling), starts[0])
        });

        grid.row_mut(row).occupy(col, span);
        packed.push(PackedItem {
            id: item.id.clone(),
            placement: Placement {
                col_start: col,
                row_start: row as u32 + 1,
                col_span: span,
            },
        });
    }

    packed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::slots::GRID_COLUMNS;

    fn placement_of<'a>(packed: &'a [PackedItem], id: &str) -> &'a Placement {
        &packed.iter().find(|p| p.id == id).unwrap().placement
    }

    #[test]
    fn test_empty_input() {
        assert!(pack(&[], GRID_COLUMNS).is_empty());
    }

    #[test]
    fn test_full_width_blocks_stack() {
        let items = vec![
            PackItem::new("a", 60, None),
            PackItem::new("b", 60, None),
        ];
        let packed = pack(&items, GRID_COLUMNS);
        assert_eq!(placement_of(&packed, "a").row_start, 1);
        assert_eq!(placement_of(&packed, "b").row_start, 2);
    }

    #[test]
    fn test_same_span_fills_row_at_preferred_columns() {
        let items = vec![
            PackItem::new("a", 20, Some(1)),
            PackItem::new("b", 20, Some(21)),
            PackItem::new("c", 20, Some(41)),
        ];
        let packed = pack(&items, GRID_COLUMNS);
        for (id, col) in [("a", 1), ("b", 21), ("c", 41)] {
            let p = placement_of(&packed, id);
            assert_eq!((p.row_start, p.col_start), (1, col));
        }
    }

    #[test]
    fn test_mixed_spans_never_share_a_row() {
        let items = vec![
            PackItem::new("a", 20, Some(1)),
            PackItem::new("b", 30, Some(31)),
        ];
        let packed = pack(&items, GRID_COLUMNS);
        assert_eq!(placement_of(&packed, "a").row_start, 1);
        assert_eq!(placement_of(&packed, "b").row_start, 2);
        assert_eq!(placement_of(&packed, "b").col_start, 31);
    }

    #[test]
    fn test_stacking_preference() {
        let items = vec![
            PackItem::new("a", 20, Some(21)),
            PackItem::new("b", 20, Some(21)),
            PackItem::new("c", 20, Some(21)),
        ];
        let packed = pack(&items, GRID_COLUMNS);
        for (id, row) in [("a", 1), ("b", 2), ("c", 3)] {
            let p = placement_of(&packed, id);
            assert_eq!((p.row_start, p.col_start), (row, 21));
        }
    }

    #[test]
    fn test_preferred_column_is_snapped() {
        let packed = pack(&[PackItem::new("a", 20, Some(33))], GRID_COLUMNS);
        assert_eq!(placement_of(&packed, "a").col_start, 41);
    }

    #[test]
    fn test_uneven_span_flush_slot_does_not_overlap() {
        let items = vec![
            PackItem::new("a", 25, Some(26)),
            PackItem::new("b", 25, Some(36)),
        ];
        let packed = pack(&items, GRID_COLUMNS);
        let a = placement_of(&packed, "a");
        let b = placement_of(&packed, "b");
        assert!(!a.overlaps(b));
        assert_eq!((a.row_start, a.col_start), (1, 26));
        assert_eq!((b.row_start, b.col_start), (2, 36));
    }

    #[test]
    fn test_placement_overlaps() {
        let a = Placement { col_start: 1, row_start: 1, col_span: 20 };
        let b = Placement { col_start: 20, row_start: 1, col_span: 20 };
        let c = Placement { col_start: 21, row_start: 1, col_span: 20 };
        let d = Placement { col_start: 1, row_start: 2, col_span: 20 };
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&d));
    }
}
