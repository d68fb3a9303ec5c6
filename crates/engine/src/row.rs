//! Row storage and synthetic row fields.
//!
//! A row is an opaque field map plus three synthetic entries that the engine
//! owns: a stable key, a lifecycle status and (for tree grids) topology
//! metadata. Synthetic entries serialize under `_rowKey`, `_rowStatus` and
//! `_tree` so a collection read back through `rows()` keeps its identity
//! when fed to `replace_rows`.

use onegrid_core::RowKey;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tree::TreeMeta;

/// Plain field map, the export shape of a row.
pub type Record = Map<String, Value>;

pub const KEY_FIELD: &str = "_rowKey";
pub const STATUS_FIELD: &str = "_rowStatus";
pub const TREE_FIELD: &str = "_tree";

/// Row lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RowStatus {
    /// Loaded and untouched
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "I")]
    Inserted,
    #[serde(rename = "U")]
    Updated,
    #[serde(rename = "D")]
    Deleted,
}

impl RowStatus {
    pub fn code(&self) -> &'static str {
        match self {
            RowStatus::None => "",
            RowStatus::Inserted => "I",
            RowStatus::Updated => "U",
            RowStatus::Deleted => "D",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    #[serde(rename = "_rowKey", default, skip_serializing_if = "Option::is_none")]
    pub(crate) key: Option<RowKey>,

    #[serde(rename = "_rowStatus", default)]
    pub status: RowStatus,

    #[serde(rename = "_tree", default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<TreeMeta>,

    #[serde(flatten)]
    pub fields: Record,
}

impl Row {
    pub fn new(fields: Record) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Build a row from an arbitrary JSON value. Non-object values yield an
    /// empty row.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => serde_json::from_value(Value::Object(map.clone()))
                .unwrap_or_else(|_| Row::new(strip_synthetic(map))),
            _ => Row::default(),
        }
    }

    pub fn with_key(mut self, key: RowKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn key(&self) -> Option<&RowKey> {
        self.key.as_ref()
    }

    pub fn has_key(&self, key: &RowKey) -> bool {
        self.key.as_ref() == Some(key)
    }

    /// Field value; missing and explicit null are both `None`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn is_deleted(&self) -> bool {
        self.status == RowStatus::Deleted
    }

    /// Export shape: plain fields with every synthetic entry removed.
    pub fn to_export(&self) -> Record {
        self.fields.clone()
    }
}

fn strip_synthetic(mut map: Record) -> Record {
    map.remove(KEY_FIELD);
    map.remove(STATUS_FIELD);
    map.remove(TREE_FIELD);
    map
}

// =============================================================================
// RowStore
// =============================================================================

/// Canonical row collection. Every row held here carries a key.
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    rows: Vec<Row>,
}

impl RowStore {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: Self::attach_keys(rows),
        }
    }

    /// Give `row` a key if it lacks one. Idempotent.
    pub fn assign_key(row: &mut Row) -> &RowKey {
        row.key.get_or_insert_with(RowKey::generate)
    }

    pub fn attach_keys(mut rows: Vec<Row>) -> Vec<Row> {
        for row in rows.iter_mut() {
            Self::assign_key(row);
        }
        rows
    }

    pub fn get_key(row: &Row) -> Option<&RowKey> {
        row.key()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn as_slice(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn position_of(&self, key: &RowKey) -> Option<usize> {
        self.rows.iter().position(|r| r.has_key(key))
    }

    pub fn get(&self, key: &RowKey) -> Option<&Row> {
        self.rows.iter().find(|r| r.has_key(key))
    }

    pub fn get_mut(&mut self, key: &RowKey) -> Option<&mut Row> {
        self.rows.iter_mut().find(|r| r.has_key(key))
    }

    pub fn at(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Insert at `index` (clamped to the end). Returns the row's key.
    pub fn insert(&mut self, index: usize, mut row: Row) -> RowKey {
        let key = Self::assign_key(&mut row).clone();
        let index = index.min(self.rows.len());
        self.rows.insert(index, row);
        key
    }

    pub fn remove(&mut self, index: usize) -> Option<Row> {
        (index < self.rows.len()).then(|| self.rows.remove(index))
    }

    /// Replace the whole collection, keeping keys already present.
    pub fn replace(&mut self, rows: Vec<Row>) {
        self.rows = Self::attach_keys(rows);
    }

    /// The collection as history snapshots see it.
    pub fn as_vec(&self) -> &Vec<Row> {
        &self.rows
    }

    pub fn snapshot(&self) -> Vec<Row> {
        self.rows.clone()
    }

    pub fn restore(&mut self, rows: Vec<Row>) {
        self.rows = rows;
    }

    /// Mutable access for topology rewrites that move blocks of rows.
    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }
}
