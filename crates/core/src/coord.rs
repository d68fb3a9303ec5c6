//! Row identity and cell coordinates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable row identity.
///
/// Assigned once when a row enters the grid and never regenerated while the
/// row persists. Positional indices go stale after every sort, filter or
/// page change; the key does not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowKey(String);

impl RowKey {
    #[inline]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Generate a fresh, collision-resistant key (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Membership string used by the selected-cell set.
    pub fn cell_id(&self, field: &str) -> String {
        format!("{}::{}", self.0, field)
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A cell address.
///
/// `row_key` and `field` are the durable identity. `row_index` and
/// `col_index` are positional caches against the display ordering at the
/// time the coordinate was taken and must be re-resolved before use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellCoord {
    pub row_key: RowKey,
    pub field: String,
    pub row_index: usize,
    pub col_index: usize,
}

impl CellCoord {
    pub fn new(row_key: RowKey, field: impl Into<String>, row_index: usize, col_index: usize) -> Self {
        Self {
            row_key,
            field: field.into(),
            row_index,
            col_index,
        }
    }

    /// The `"rowKey::field"` membership string for this cell.
    pub fn cell_id(&self) -> String {
        self.row_key.cell_id(&self.field)
    }

    /// Same cell, ignoring the positional caches.
    pub fn same_cell(&self, other: &CellCoord) -> bool {
        self.row_key == other.row_key && self.field == other.field
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{} @ ({}, {})", self.row_key, self.field, self.row_index, self.col_index)
    }
}
