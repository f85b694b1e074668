//! Drop-position geometry for drag-and-drop reordering in the tab grid.
//!
//! Pure functions: grid metrics are measured from the rendered item rectangles,
//! and a pointer position is mapped to an insertion index plus the coordinates
//! of the insertion indicator.

use crate::types::input::{Point, Rect};

/// Fraction of a column past which a drop means "after" that column's item.
pub const DEFAULT_INSERT_AFTER_THRESHOLD: f64 = 0.65;

/// Vertical tolerance in pixels for two items to count as one row.
pub const DEFAULT_ROW_TOLERANCE: f64 = 5.0;

/// Grid metrics measured from the rendered items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridInfo {
    pub item_width: f64,
    pub item_height: f64,
    pub gap: f64,
    pub columns: usize,
    /// Container's top-left corner in pointer coordinates.
    pub origin: Point,
    /// First item's offset from the container's top-left corner.
    pub first_offset: Point,
}

/// Where the insertion indicator is drawn, relative to the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indicator {
    pub x: f64,
    pub y: f64,
    pub height: f64,
}

/// Result of mapping a pointer position onto the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropPosition {
    /// Index to move the dragged tab to; equal to the item count for "append".
    pub target_index: usize,
    pub indicator: Indicator,
    pub row: usize,
    /// Column after clamping to the grid width.
    pub col: usize,
}

impl GridInfo {
    /// Measures the grid from the container rectangle and the items in order.
    ///
    /// Returns `None` for an empty grid. The gap comes from two neighbours on
    /// the same row (the first pair found); a grid with one item per row has
    /// no horizontal gap to measure and gets 0.
    pub fn measure(container: Rect, items: &[Rect], row_tolerance: f64) -> Option<GridInfo> {
        let first = items.first()?;
        let same_row = |a: &Rect, b: &Rect| (a.top - b.top).abs() < row_tolerance;

        let gap = items
            .windows(2)
            .find(|pair| same_row(&pair[0], &pair[1]))
            .map(|pair| (pair[1].left - pair[0].right()).max(0.0))
            .unwrap_or(0.0);

        let columns = 1 + items[1..]
            .iter()
            .take_while(|item| same_row(item, first))
            .count();

        Some(GridInfo {
            item_width: first.width,
            item_height: first.height,
            gap,
            columns,
            origin: Point::new(container.left, container.top),
            first_offset: Point::new(first.left - container.left, first.top - container.top),
        })
    }

    pub fn column_width(&self) -> f64 {
        self.item_width + self.gap
    }

    pub fn row_height(&self) -> f64 {
        self.item_height + self.gap
    }

    /// Maps a pointer position to a drop target for a grid of `count` items.
    ///
    /// Past `threshold` of a column the pointer counts as the next column. A
    /// pointer below the last row, or right of the last item on the last row,
    /// appends (`count`) with the indicator at the last item's right edge.
    pub fn drop_position(&self, pointer: Point, count: usize, threshold: f64) -> Option<DropPosition> {
        if count == 0 || self.columns == 0 {
            return None;
        }
        let col_width = self.column_width();
        let row_height = self.row_height();
        if col_width <= 0.0 || row_height <= 0.0 {
            return None;
        }

        let x = pointer.x - self.origin.x - self.first_offset.x;
        let y = pointer.y - self.origin.y - self.first_offset.y;

        let row = (y / row_height).floor().max(0.0) as usize;
        let col_float = x / col_width;
        let col_floor = col_float.floor();
        let col = if col_float - col_floor > threshold {
            col_floor + 1.0
        } else {
            col_floor
        }
        .max(0.0) as usize;
        let clamped_col = col.min(self.columns - 1);

        let last = count - 1;
        let last_row = last / self.columns;
        let last_col = last % self.columns;

        if row > last_row || (row == last_row && col > last_col) {
            return Some(DropPosition {
                target_index: count,
                indicator: Indicator {
                    x: self.first_offset.x + (last_col + 1) as f64 * col_width,
                    y: self.first_offset.y + last_row as f64 * row_height,
                    height: self.item_height,
                },
                row,
                col: clamped_col,
            });
        }

        let target_index = (row * self.columns + clamped_col).min(last);
        Some(DropPosition {
            target_index,
            indicator: Indicator {
                x: self.first_offset.x + (target_index % self.columns) as f64 * col_width,
                y: self.first_offset.y + (target_index / self.columns) as f64 * row_height,
                height: self.item_height,
            },
            row,
            col: clamped_col,
        })
    }
}

/// Lays out `count` items of `width`×`height` in `columns` columns with `gap`
/// spacing, starting `offset` from the container's corner.
pub fn layout_grid(container: Rect, offset: Point, width: f64, height: f64, gap: f64, columns: usize, count: usize) -> Vec<Rect> {
    let columns = columns.max(1);
    (0..count)
        .map(|i| {
            let row = (i / columns) as f64;
            let col = (i % columns) as f64;
            Rect::new(
                container.left + offset.x + col * (width + gap),
                container.top + offset.y + row * (height + gap),
                width,
                height,
            )
        })
        .collect()
}
