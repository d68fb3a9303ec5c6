//! Hierarchical rows as a flat array.
//!
//! Tree rows live in the ordinary row store in depth-first order, each
//! carrying a [`TreeMeta`] with its id, parent id and level. A subtree is
//! therefore always a contiguous block: the root followed by every row with
//! a greater level.

use onegrid_core::RowKey;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GridError, Result};
use crate::row::{Record, Row};
use crate::value::value_text;

/// Key on an input node that pre-sets its expansion state.
pub const EXPANDED_FIELD: &str = "_expanded";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeMeta {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub level: usize,
    #[serde(default)]
    pub has_children: bool,
    #[serde(default = "default_expanded")]
    pub expanded: bool,
}

fn default_expanded() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TreeConfig {
    pub id_field: String,
    pub children_field: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            children_field: "children".to_string(),
        }
    }
}

/// Where a dragged row lands relative to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropMode {
    Before,
    After,
    Child,
}

/// Nested input node.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: String,
    /// Data fields, id field included, children field excluded
    pub fields: Record,
    pub expanded: Option<bool>,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(id: impl Into<String>, fields: Record) -> Self {
        Self {
            id: id.into(),
            fields,
            expanded: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.children = children;
        self
    }

    /// Parse `{ id, children?, ...fields }`. Ids may be strings or numbers.
    pub fn from_json(value: &Value, config: &TreeConfig) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(GridError::InvalidTreeNode(format!("expected an object, got {value}")));
        };
        let id = match map.get(&config.id_field) {
            Some(v @ (Value::String(_) | Value::Number(_))) => value_text(v),
            _ => {
                return Err(GridError::InvalidTreeNode(format!(
                    "missing '{}' on {value}",
                    config.id_field
                )))
            }
        };

        let mut fields = map.clone();
        let children = match fields.remove(&config.children_field) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|child| TreeNode::from_json(child, config))
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(GridError::InvalidTreeNode(format!(
                    "'{}' must be an array, got {other}",
                    config.children_field
                )))
            }
        };
        let expanded = fields.remove(EXPANDED_FIELD).and_then(|v| v.as_bool());

        Ok(Self {
            id,
            fields,
            expanded,
            children,
        })
    }

    pub fn list_from_json(value: &Value, config: &TreeConfig) -> Result<Vec<Self>> {
        match value {
            Value::Array(items) => items.iter().map(|v| TreeNode::from_json(v, config)).collect(),
            other => Err(GridError::InvalidTreeNode(format!("expected an array, got {other}"))),
        }
    }
}

/// Depth-first flatten. Roots are level 0; `expanded` defaults to true.
pub fn flatten(nodes: &[TreeNode]) -> Vec<Row> {
    fn walk(nodes: &[TreeNode], level: usize, parent: Option<&str>, out: &mut Vec<Row>) {
        for node in nodes {
            let mut row = Row::new(node.fields.clone());
            row.tree = Some(TreeMeta {
                id: node.id.clone(),
                parent_id: parent.map(str::to_string),
                level,
                has_children: !node.children.is_empty(),
                expanded: node.expanded.unwrap_or(true),
            });
            out.push(row);
            walk(&node.children, level + 1, Some(&node.id), out);
        }
    }
    let mut out = Vec::new();
    walk(nodes, 0, None, &mut out);
    out
}

/// Rebuild nested nodes from flat rows, preserving row order among
/// siblings. Rows without tree metadata, or whose parent is absent, become
/// roots.
pub fn unflatten(rows: &[Row]) -> Vec<TreeNode> {
    let index_of: FxHashMap<&str, usize> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.tree.as_ref().map(|t| (t.id.as_str(), i)))
        .collect();

    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
    let mut roots = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let parent = row
            .tree
            .as_ref()
            .and_then(|t| t.parent_id.as_deref())
            .and_then(|p| index_of.get(p).copied())
            .filter(|&p| p != i);
        match parent {
            Some(p) => children_of[p].push(i),
            None => roots.push(i),
        }
    }

    fn build(i: usize, rows: &[Row], children_of: &[Vec<usize>], depth: usize) -> TreeNode {
        let row = &rows[i];
        let (id, expanded) = match &row.tree {
            Some(t) => (t.id.clone(), Some(t.expanded)),
            None => (String::new(), None),
        };
        // A parent cycle cannot be deeper than the row count
        let children = if depth < rows.len() {
            children_of[i]
                .iter()
                .map(|&c| build(c, rows, children_of, depth + 1))
                .collect()
        } else {
            Vec::new()
        };
        TreeNode {
            id,
            fields: row.fields.clone(),
            expanded,
            children,
        }
    }

    roots
        .into_iter()
        .map(|i| build(i, rows, &children_of, 0))
        .collect()
}

/// Flip `expanded` on the row with `key`. Rows without children are left
/// alone. Returns whether anything changed.
pub fn toggle_row(rows: &mut [Row], key: &RowKey) -> bool {
    match rows.iter_mut().find(|r| r.has_key(key)).and_then(|r| r.tree.as_mut()) {
        Some(meta) if meta.has_children => {
            meta.expanded = !meta.expanded;
            true
        }
        _ => false,
    }
}

/// Ancestor-expansion lookup over every tree row.
pub struct Visibility<'a> {
    by_id: FxHashMap<&'a str, &'a TreeMeta>,
    limit: usize,
}

impl<'a> Visibility<'a> {
    /// Index every tree row, deleted ones included.
    pub fn new(rows: &'a [Row]) -> Self {
        Self {
            by_id: rows
                .iter()
                .filter_map(|r| r.tree.as_ref().map(|t| (t.id.as_str(), t)))
                .collect(),
            limit: rows.len(),
        }
    }

    /// True unless an ancestor has `expanded == false`.
    pub fn visible(&self, row: &Row) -> bool {
        let mut parent = row.tree.as_ref().and_then(|t| t.parent_id.as_deref());
        let mut steps = 0;
        while let Some(pid) = parent {
            let Some(meta) = self.by_id.get(pid) else {
                break;
            };
            if !meta.expanded {
                return false;
            }
            steps += 1;
            if steps > self.limit {
                break;
            }
            parent = meta.parent_id.as_deref();
        }
        true
    }
}

// =============================================================================
// Drag-and-drop reparenting
// =============================================================================

/// The contiguous span `[start, end)` of the subtree rooted at `start`.
fn block_span(rows: &[Row], start: usize) -> (usize, usize) {
    let level = rows[start].tree.as_ref().map_or(0, |t| t.level);
    let len = rows[start + 1..]
        .iter()
        .take_while(|r| r.tree.as_ref().map_or(0, |t| t.level) > level)
        .count();
    (start, start + 1 + len)
}

fn is_ancestor_or_self(rows: &[Row], ancestor_id: &str, node: &Row) -> bool {
    let by_id: FxHashMap<&str, &TreeMeta> = rows
        .iter()
        .filter_map(|r| r.tree.as_ref().map(|t| (t.id.as_str(), t)))
        .collect();
    let mut seen = FxHashSet::default();
    let mut current = node.tree.as_ref();
    while let Some(meta) = current {
        if meta.id == ancestor_id {
            return true;
        }
        if !seen.insert(meta.id.as_str()) {
            return false;
        }
        current = meta.parent_id.as_deref().and_then(|p| by_id.get(p).copied());
    }
    false
}

/// Check that a drop can be applied without touching anything.
pub fn validate_drop(rows: &[Row], source: &RowKey, target: Option<&RowKey>) -> Result<()> {
    let src = rows
        .iter()
        .position(|r| r.has_key(source))
        .ok_or_else(|| GridError::UnknownRow(source.clone()))?;
    let Some(src_meta) = rows[src].tree.as_ref() else {
        return Err(GridError::InvalidDrop(format!("row {source} is not a tree row")));
    };

    let Some(target) = target else {
        return Ok(());
    };
    let tgt = rows
        .iter()
        .position(|r| r.has_key(target))
        .ok_or_else(|| GridError::UnknownRow(target.clone()))?;
    if rows[tgt].tree.is_none() {
        return Err(GridError::InvalidDrop(format!("row {target} is not a tree row")));
    }

    let (start, end) = block_span(rows, src);
    if (start..end).contains(&tgt) || is_ancestor_or_self(rows, &src_meta.id, &rows[tgt]) {
        return Err(GridError::InvalidDrop(format!(
            "cannot move {source} into itself or its descendant {target}"
        )));
    }
    Ok(())
}

/// Move `source` and its subtree relative to `target` (or to the end of
/// the root level when `target` is `None`).
pub fn reparent(rows: &mut Vec<Row>, source: &RowKey, target: Option<&RowKey>, mode: DropMode) -> Result<()> {
    validate_drop(rows, source, target)?;

    let src = rows
        .iter()
        .position(|r| r.has_key(source))
        .ok_or_else(|| GridError::UnknownRow(source.clone()))?;
    let (start, end) = block_span(rows, src);
    let mut block: Vec<Row> = rows.drain(start..end).collect();
    let src_level = block[0].tree.as_ref().map_or(0, |t| t.level);

    let (insert_at, parent_id, new_level) = match target {
        None => (rows.len(), None, 0),
        Some(target) => {
            let tgt = rows
                .iter()
                .position(|r| r.has_key(target))
                .ok_or_else(|| GridError::UnknownRow(target.clone()))?;
            let Some(meta) = rows[tgt].tree.as_mut() else {
                return Err(GridError::InvalidDrop(format!("row {target} is not a tree row")));
            };
            match mode {
                DropMode::Child => {
                    meta.has_children = true;
                    meta.expanded = true;
                    (tgt + 1, Some(meta.id.clone()), meta.level + 1)
                }
                DropMode::Before => (tgt, meta.parent_id.clone(), meta.level),
                // Lands directly after the target row, not after its subtree:
                // the target's children then display under the moved block.
                DropMode::After => (tgt + 1, meta.parent_id.clone(), meta.level),
            }
        }
    };

    let delta = new_level as isize - src_level as isize;
    for (i, row) in block.iter_mut().enumerate() {
        let Some(meta) = row.tree.as_mut() else {
            continue;
        };
        if i == 0 {
            meta.parent_id = parent_id.clone();
            meta.level = new_level;
        } else {
            meta.level = (meta.level as isize + delta).max(0) as usize;
        }
    }

    let insert_at = insert_at.min(rows.len());
    rows.splice(insert_at..insert_at, block);
    recompute_has_children(rows);
    Ok(())
}

/// Set every row's `has_children` from actual parent references.
pub fn recompute_has_children(rows: &mut [Row]) {
    let parents: FxHashSet<String> = rows
        .iter()
        .filter_map(|r| r.tree.as_ref().and_then(|t| t.parent_id.clone()))
        .collect();
    for meta in rows.iter_mut().filter_map(|r| r.tree.as_mut()) {
        meta.has_children = parents.contains(&meta.id);
    }
}
