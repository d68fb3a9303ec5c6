use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::coord::{CellCoord, RowKey};

/// A rectangular block of display cells, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRect {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl SelectionRect {
    /// Create a new rectangle, normalizing so start <= end on both axes.
    pub fn new(r1: usize, c1: usize, r2: usize, c2: usize) -> Self {
        Self {
            row_start: r1.min(r2),
            row_end: r1.max(r2),
            col_start: c1.min(c2),
            col_end: c1.max(c2),
        }
    }

    pub fn single(row: usize, col: usize) -> Self {
        Self::new(row, col, row, col)
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.row_start && row <= self.row_end && col >= self.col_start && col <= self.col_end
    }

    pub fn row_count(&self) -> usize {
        self.row_end - self.row_start + 1
    }

    pub fn col_count(&self) -> usize {
        self.col_end - self.col_start + 1
    }

    pub fn cell_count(&self) -> usize {
        self.row_count() * self.col_count()
    }

    /// Iterate over all cells in this rectangle (row-major order).
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        let (col_start, col_end) = (self.col_start, self.col_end);
        (self.row_start..=self.row_end).flat_map(move |r| (col_start..=col_end).map(move |c| (r, c)))
    }

    pub fn is_single(&self) -> bool {
        self.row_start == self.row_end && self.col_start == self.col_end
    }
}

/// Maps display positions to durable identities.
///
/// The selection model only ever stores keys and fields; positions are
/// looked up through this trait against the current display ordering.
pub trait GridAxes {
    fn row_count(&self) -> usize;
    fn col_count(&self) -> usize;
    fn row_key_at(&self, row: usize) -> Option<&RowKey>;
    fn field_at(&self, col: usize) -> Option<&str>;

    fn row_index_of(&self, key: &RowKey) -> Option<usize> {
        (0..self.row_count()).find(|&r| self.row_key_at(r) == Some(key))
    }

    fn col_index_of(&self, field: &str) -> Option<usize> {
        (0..self.col_count()).find(|&c| self.field_at(c) == Some(field))
    }
}

/// Modifier held during a cell click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickModifier {
    /// Plain click: collapse to the clicked cell.
    #[default]
    None,
    /// Ctrl/Cmd click: toggle membership of the clicked cell.
    Toggle,
    /// Shift click: rectangle from the anchor to the clicked cell.
    Range,
}

/// Active cell, anchor and the set of selected cells.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    active: Option<CellCoord>,
    anchor: Option<CellCoord>,
    /// `"rowKey::field"` -> row key
    selected: FxHashMap<String, RowKey>,
    rect: Option<SelectionRect>,
    /// Cells at the rectangle's two defining corners, for re-resolution
    corners: Option<(CellCoord, CellCoord)>,
    /// The selected set is exactly the cells inside `rect`
    rect_filled: bool,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&CellCoord> {
        self.active.as_ref()
    }

    pub fn anchor(&self) -> Option<&CellCoord> {
        self.anchor.as_ref()
    }

    pub fn rect(&self) -> Option<SelectionRect> {
        self.rect
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, row_key: &RowKey, field: &str) -> bool {
        self.selected.contains_key(&row_key.cell_id(field))
    }

    /// Membership strings of every selected cell (unordered).
    pub fn cell_ids(&self) -> impl Iterator<Item = &str> {
        self.selected.keys().map(String::as_str)
    }

    /// Distinct row keys that have at least one selected cell.
    pub fn row_keys(&self) -> Vec<&RowKey> {
        let mut keys: Vec<&RowKey> = self.selected.values().collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn clear(&mut self) {
        self.active = None;
        self.anchor = None;
        self.selected.clear();
        self.rect = None;
        self.corners = None;
        self.rect_filled = false;
    }

    /// Apply a click with the given modifier.
    pub fn click(&mut self, cell: CellCoord, modifier: ClickModifier, axes: &impl GridAxes) {
        match modifier {
            ClickModifier::None => self.select_cell(cell),
            ClickModifier::Toggle => self.toggle_cell(cell),
            ClickModifier::Range => self.extend_to(cell, axes),
        }
    }

    /// Collapse to a single cell; it becomes both active and anchor.
    pub fn select_cell(&mut self, cell: CellCoord) {
        self.selected.clear();
        self.selected.insert(cell.cell_id(), cell.row_key.clone());
        self.rect = Some(SelectionRect::single(cell.row_index, cell.col_index));
        self.corners = Some((cell.clone(), cell.clone()));
        self.rect_filled = true;
        self.anchor = Some(cell.clone());
        self.active = Some(cell);
    }

    /// Toggle one cell. The rectangle is left alone; the anchor is only set
    /// when there was none.
    pub fn toggle_cell(&mut self, cell: CellCoord) {
        let id = cell.cell_id();
        if self.selected.remove(&id).is_none() {
            self.selected.insert(id, cell.row_key.clone());
        }
        if self.anchor.is_none() {
            self.anchor = Some(cell.clone());
        }
        self.rect_filled = false;
        self.active = Some(cell);
    }

    /// Rectangle from the anchor to `cell`, rebuilding the selected set from
    /// every position inside it. Without a resolvable anchor this is a plain
    /// click.
    pub fn extend_to(&mut self, cell: CellCoord, axes: &impl GridAxes) {
        let anchor_pos = self.anchor.as_ref().and_then(|a| {
            Some((axes.row_index_of(&a.row_key)?, axes.col_index_of(&a.field)?))
        });
        let (Some((anchor_row, anchor_col)), Some(anchor)) = (anchor_pos, self.anchor.clone()) else {
            self.select_cell(cell);
            return;
        };

        let rect = SelectionRect::new(anchor_row, anchor_col, cell.row_index, cell.col_index);
        self.fill_from_rect(rect, axes);
        self.rect = Some(rect);
        self.corners = Some((anchor, cell.clone()));
        self.rect_filled = true;
        self.active = Some(cell);
    }

    fn fill_from_rect(&mut self, rect: SelectionRect, axes: &impl GridAxes) {
        self.selected.clear();
        for (r, c) in rect.cells() {
            if let (Some(key), Some(field)) = (axes.row_key_at(r), axes.field_at(c)) {
                self.selected.insert(key.cell_id(field), key.clone());
            }
        }
    }

    /// Re-resolve the positional caches of the active and anchor cells and
    /// rebuild the rectangle from its corner cells. Cells whose row or field
    /// has left the display are dropped.
    ///
    /// A selected set that came from a click or range click is rebuilt from
    /// the moved rectangle, so rows sorted in between the corners join it.
    /// Toggled selections keep their own cells.
    pub fn refresh_positions(&mut self, axes: &impl GridAxes) {
        fn resolve(cell: &mut Option<CellCoord>, axes: &impl GridAxes) {
            let pos = cell.as_ref().and_then(|c| {
                Some((axes.row_index_of(&c.row_key)?, axes.col_index_of(&c.field)?))
            });
            match pos {
                Some((r, c)) => {
                    if let Some(cell) = cell.as_mut() {
                        cell.row_index = r;
                        cell.col_index = c;
                    }
                }
                None => *cell = None,
            }
        }
        resolve(&mut self.active, axes);
        resolve(&mut self.anchor, axes);

        if let Some((a, b)) = self.corners.take() {
            let (mut a, mut b) = (Some(a), Some(b));
            resolve(&mut a, axes);
            resolve(&mut b, axes);
            match (a, b) {
                (Some(a), Some(b)) => {
                    let rect = SelectionRect::new(a.row_index, a.col_index, b.row_index, b.col_index);
                    if self.rect_filled {
                        self.fill_from_rect(rect, axes);
                    }
                    self.rect = Some(rect);
                    self.corners = Some((a, b));
                }
                _ => {
                    self.rect = None;
                    if self.rect_filled {
                        self.selected.clear();
                        self.rect_filled = false;
                    }
                }
            }
        }
    }
}
