//! Column definitions and the column model.
//!
//! Columns arrive as a tree: group columns carry `children`, only leaves
//! bind data. The model flattens the tree, keeps a user-controlled leaf
//! order and per-field resize overrides, and resolves the header list with
//! the synthetic row-number and checkbox columns in front.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::format::Formatter;
use crate::validation::Validator;

pub const ROW_NUM_FIELD: &str = "__rowNum__";
pub const ROW_CHECK_FIELD: &str = "__rowCheck__";
pub const ROW_NUM_WIDTH: f32 = 50.0;
pub const ROW_CHECK_WIDTH: f32 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorKind {
    #[default]
    Text,
    Number,
    Date,
    Dropdown,
    Combo,
    Custom,
}

/// A `{ value, label }` pair for dropdown editors and header filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueOption {
    pub value: Value,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    #[serde(rename = "type", default)]
    pub kind: EditorKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ValueOption>,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl EditorConfig {
    pub fn new(kind: EditorKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub field: String,
    #[serde(default, alias = "headerName")]
    pub header: String,
    /// Fixed width; `None` shares the remaining space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub align: Align,
    /// Declaring an editor is what makes a column editable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<EditorConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_options: Option<Vec<ValueOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<Formatter>,
    #[serde(default)]
    pub is_tree_column: bool,
    /// Indent per tree level in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_indent: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Column>,
}

impl Column {
    pub fn new(field: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            header: header.into(),
            ..Self::default()
        }
    }

    /// Group column with children.
    pub fn group(header: impl Into<String>, children: Vec<Column>) -> Self {
        Self {
            header: header.into(),
            children,
            ..Self::default()
        }
    }

    pub fn row_number() -> Self {
        Self {
            field: ROW_NUM_FIELD.to_string(),
            header: "#".to_string(),
            width: Some(ROW_NUM_WIDTH),
            align: Align::Center,
            ..Self::default()
        }
    }

    pub fn row_check() -> Self {
        Self {
            field: ROW_CHECK_FIELD.to_string(),
            header: String::new(),
            width: Some(ROW_CHECK_WIDTH),
            align: Align::Center,
            ..Self::default()
        }
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Shorthand for a text editor.
    pub fn editable(self) -> Self {
        self.with_editor(EditorConfig::new(EditorKind::Text))
    }

    pub fn with_editor(mut self, editor: EditorConfig) -> Self {
        self.editor = Some(editor);
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn with_filter_options(mut self, options: Vec<ValueOption>) -> Self {
        self.filter_options = Some(options);
        self
    }

    pub fn tree_column(mut self) -> Self {
        self.is_tree_column = true;
        self
    }

    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_row_number(&self) -> bool {
        self.field == ROW_NUM_FIELD
    }

    pub fn is_synthetic(&self) -> bool {
        self.field == ROW_NUM_FIELD || self.field == ROW_CHECK_FIELD
    }

    pub fn is_editable(&self) -> bool {
        self.editor.is_some() && !self.is_synthetic() && !self.is_group()
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable && !self.is_row_number()
    }

    pub fn is_filterable(&self) -> bool {
        self.filterable && !self.is_synthetic()
    }
}

/// Depth-first leaf list of a column tree.
pub fn flatten_leaves(columns: &[Column]) -> Vec<&Column> {
    fn walk<'a>(columns: &'a [Column], out: &mut Vec<&'a Column>) {
        for col in columns {
            if col.is_group() {
                walk(&col.children, out);
            } else {
                out.push(col);
            }
        }
    }
    let mut out = Vec::new();
    walk(columns, &mut out);
    out
}

// =============================================================================
// ColumnModel
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ColumnModel {
    columns: Vec<Column>,
    /// Leaf field order (drag reorder)
    order: Vec<String>,
    /// Resize overrides by field
    width_overrides: FxHashMap<String, f32>,
}

impl ColumnModel {
    pub fn new(columns: Vec<Column>) -> Self {
        let order = flatten_leaves(&columns).iter().map(|c| c.field.clone()).collect();
        Self {
            columns,
            order,
            width_overrides: FxHashMap::default(),
        }
    }

    /// Replace the column tree. Surviving fields keep their relative order;
    /// new fields are appended.
    pub fn set_columns(&mut self, columns: Vec<Column>) {
        let fields: Vec<String> = flatten_leaves(&columns).iter().map(|c| c.field.clone()).collect();
        let mut order: Vec<String> = self
            .order
            .iter()
            .filter(|f| fields.contains(f))
            .cloned()
            .collect();
        for field in fields {
            if !order.contains(&field) {
                order.push(field);
            }
        }
        self.width_overrides.retain(|field, _| order.contains(field));
        self.order = order;
        self.columns = columns;
    }

    /// The column tree as given.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn leaf(&self, field: &str) -> Option<&Column> {
        flatten_leaves(&self.columns).into_iter().find(|c| c.field == field)
    }

    /// Leaves in display order, hidden ones included.
    pub fn leaves(&self) -> Vec<&Column> {
        let leaves = flatten_leaves(&self.columns);
        self.order
            .iter()
            .filter_map(|field| leaves.iter().find(|c| &c.field == field).copied())
            .collect()
    }

    pub fn visible_leaves(&self) -> Vec<&Column> {
        self.leaves().into_iter().filter(|c| !c.hidden).collect()
    }

    /// `[rowNum?, rowCheck?, ...visible leaves]`
    pub fn header_columns(&self, show_row_number: bool, show_checkbox: bool) -> Vec<Column> {
        let mut out = Vec::with_capacity(self.order.len() + 2);
        if show_row_number {
            out.push(Column::row_number());
        }
        if show_checkbox {
            out.push(Column::row_check());
        }
        out.extend(self.visible_leaves().into_iter().cloned());
        out
    }

    /// Move `drag_field` to the slot currently held by `target_field`.
    /// Returns false when either field is unknown or they are the same.
    pub fn move_column(&mut self, drag_field: &str, target_field: &str) -> bool {
        let from = self.order.iter().position(|f| f == drag_field);
        let to = self.order.iter().position(|f| f == target_field);
        match (from, to) {
            (Some(from), Some(to)) if from != to => {
                let moved = self.order.remove(from);
                self.order.insert(to, moved);
                true
            }
            _ => false,
        }
    }

    /// Record a resize; the width is clamped to `min_width`. Returns the
    /// applied width, or `None` for an unknown field.
    pub fn resize_column(&mut self, field: &str, width: f32, min_width: f32) -> Option<f32> {
        if !self.order.iter().any(|f| f == field) {
            return None;
        }
        let applied = width.max(min_width);
        self.width_overrides.insert(field.to_string(), applied);
        Some(applied)
    }

    pub fn width_override(&self, field: &str) -> Option<f32> {
        self.width_overrides.get(field).copied()
    }

    /// Resolve a width for every header column.
    ///
    /// Precedence: explicit width, then resize override, then an equal
    /// share of what remains of `available`. Without a measured width,
    /// flexible columns get `default_width`.
    pub fn resolve_widths(
        &self,
        header: &[Column],
        available: Option<f32>,
        default_width: f32,
        min_width: f32,
    ) -> Vec<f32> {
        let fixed: Vec<Option<f32>> = header
            .iter()
            .map(|c| c.width.or_else(|| self.width_override(&c.field)))
            .collect();

        let used: f32 = fixed.iter().flatten().sum();
        let flex_count = header
            .iter()
            .zip(&fixed)
            .filter(|(c, w)| w.is_none() && !c.is_synthetic())
            .count();

        let share = match available {
            Some(total) if flex_count > 0 => ((total - used) / flex_count as f32).max(min_width),
            _ => default_width,
        };

        fixed.into_iter().map(|w| w.unwrap_or(share)).collect()
    }
}
