//! View pipeline: store rows -> display rows.
//!
//! Fixed stage order:
//! 1. filter (deleted rows, then header filters)
//! 2. sort (stable, nulls first)
//! 3. tree visibility (collapsed ancestors)
//! 4. pagination
//!
//! The output is a list of store indices. It is recomputed from scratch on
//! every change; nothing downstream caches positions across passes.

use onegrid_config::{PaginationKind, PaginationMode, PaginationOptions};
use ordered_float::OrderedFloat;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::column::{ValueOption, ROW_NUM_FIELD};
use crate::row::Row;
use crate::tree::Visibility;
use crate::value::value_text;

// =============================================================================
// FilterKey: typed key for membership and ordering
// =============================================================================

/// Comparable form of a cell value.
///
/// Variant order is the cross-type sort order: blanks, numbers, text,
/// booleans, then anything structured.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterKey {
    /// Null or missing
    Blank,
    Number(OrderedFloat<f64>),
    Text(String),
    Bool(bool),
    /// Arrays and objects, compared by their JSON text
    Other(String),
}

impl FilterKey {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => FilterKey::Blank,
            Some(Value::Number(n)) => n
                .as_f64()
                .map(|f| FilterKey::Number(OrderedFloat(f)))
                .unwrap_or_else(|| FilterKey::Other(n.to_string())),
            Some(Value::String(s)) => FilterKey::Text(s.clone()),
            Some(Value::Bool(b)) => FilterKey::Bool(*b),
            Some(other) => FilterKey::Other(other.to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, FilterKey::Blank)
    }
}

// =============================================================================
// Sorting
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub field: String,
    pub direction: SortDirection,
}

impl SortState {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Header click cycle: unsorted -> asc -> desc -> unsorted. A different
/// field always starts at asc.
pub fn next_sort_state(prev: Option<&SortState>, field: &str) -> Option<SortState> {
    match prev {
        Some(s) if s.field == field => match s.direction {
            SortDirection::Asc => Some(SortState::desc(field)),
            SortDirection::Desc => None,
        },
        _ => Some(SortState::asc(field)),
    }
}

/// Compare two keys. Blanks sort first regardless of direction.
fn compare_keys(a: &FilterKey, b: &FilterKey, direction: SortDirection) -> Ordering {
    match (a.is_blank(), b.is_blank()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => match direction {
            SortDirection::Asc => a.cmp(b),
            SortDirection::Desc => b.cmp(a),
        },
    }
}

/// Stable sort of store indices by `sort.field`. The row-number column is
/// never sorted.
pub fn sort_indices(indices: &mut Vec<usize>, rows: &[Row], sort: &SortState) {
    if sort.field == ROW_NUM_FIELD {
        return;
    }
    let mut keyed: Vec<(FilterKey, usize)> = indices
        .iter()
        .map(|&i| (FilterKey::from_value(rows[i].get(&sort.field)), i))
        .collect();
    // sort_by is stable: equal keys keep their incoming order
    keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, sort.direction));
    *indices = keyed.into_iter().map(|(_, i)| i).collect();
}

// =============================================================================
// Header filters
// =============================================================================

/// Selected values per column. A column with an empty selection does not
/// filter.
#[derive(Debug, Clone, Default)]
pub struct ColumnFilters {
    selected: FxHashMap<String, FxHashSet<FilterKey>>,
}

impl ColumnFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection for `field`. An empty list clears it.
    pub fn set(&mut self, field: &str, values: &[Value]) {
        if values.is_empty() {
            self.selected.remove(field);
            return;
        }
        let keys = values.iter().map(|v| FilterKey::from_value(Some(v))).collect();
        self.selected.insert(field.to_string(), keys);
    }

    pub fn clear(&mut self, field: &str) {
        self.selected.remove(field);
    }

    pub fn clear_all(&mut self) {
        self.selected.clear();
    }

    pub fn is_active(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn is_filtered(&self, field: &str) -> bool {
        self.selected.contains_key(field)
    }

    /// Drop filters for fields `keep` rejects.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.selected.retain(|field, _| keep(field));
    }

    /// Row matches every active filter.
    pub fn passes(&self, row: &Row) -> bool {
        self.selected
            .iter()
            .all(|(field, keys)| keys.contains(&FilterKey::from_value(row.get(field))))
    }
}

/// Header filter choices for `field`: the column's own options, otherwise
/// the distinct non-empty values across `rows` in first-seen order.
pub fn filter_options(rows: &[Row], field: &str, preset: Option<&[ValueOption]>) -> Vec<ValueOption> {
    if let Some(preset) = preset {
        return preset.to_vec();
    }
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for value in rows.iter().filter_map(|r| r.get(field)) {
        if value.as_str() == Some("") {
            continue;
        }
        if seen.insert(FilterKey::from_value(Some(value))) {
            out.push(ValueOption {
                value: value.clone(),
                label: value_text(value),
            });
        }
    }
    out
}

// =============================================================================
// Pagination
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub page_count: usize,
}

impl PageInfo {
    /// `requested_page` is clamped into `[1, page_count]`.
    pub fn new(mode: PaginationMode, requested_page: usize, page_size: usize, total_count: usize) -> Self {
        if mode == PaginationMode::None {
            return Self {
                current_page: 1,
                page_size,
                total_count,
                page_count: 1,
            };
        }
        let size = page_size.max(1);
        let page_count = total_count.div_ceil(size).max(1);
        Self {
            current_page: requested_page.clamp(1, page_count),
            page_size: size,
            total_count,
            page_count,
        }
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.page_count
    }
}

/// Slice tree-visible rows for the current page.
pub fn paginate(indices: Vec<usize>, options: &PaginationOptions, info: &PageInfo) -> Vec<usize> {
    match (options.mode, options.kind) {
        (PaginationMode::Page, PaginationKind::Client) => {
            let start = (info.current_page - 1) * info.page_size;
            indices.into_iter().skip(start).take(info.page_size).collect()
        }
        (PaginationMode::Scroll, PaginationKind::Client) => {
            indices.into_iter().take(info.current_page * info.page_size).collect()
        }
        _ => indices,
    }
}

// =============================================================================
// Pipeline
// =============================================================================

#[derive(Debug, Clone)]
pub struct ViewParams<'a> {
    pub header_filter: bool,
    pub filters: &'a ColumnFilters,
    pub sort: Option<&'a SortState>,
    pub pagination: &'a PaginationOptions,
    pub page: usize,
    pub page_size: usize,
    /// Server-reported total; falls back to the visible row count
    pub external_total: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewOutput {
    /// Store indices in display order
    pub display: Vec<usize>,
    pub page_info: PageInfo,
}

pub fn compute_view(rows: &[Row], params: &ViewParams<'_>) -> ViewOutput {
    // 1. filter
    let mut indices: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_deleted())
        .filter(|(_, r)| !params.header_filter || params.filters.passes(r))
        .map(|(i, _)| i)
        .collect();

    // 2. sort
    if let Some(sort) = params.sort {
        sort_indices(&mut indices, rows, sort);
    }

    // 3. tree visibility, resolved against the whole store
    let visibility = Visibility::new(rows);
    indices.retain(|&i| visibility.visible(&rows[i]));

    // 4. paginate
    let total = params.external_total.unwrap_or(indices.len());
    let page_info = PageInfo::new(params.pagination.mode, params.page, params.page_size, total);
    let display = paginate(indices, params.pagination, &page_info);

    let display_len = display.len();
    tracing::trace!(
        store = rows.len(),
        display = display_len,
        page = page_info.current_page,
        "view recomputed"
    );

    ViewOutput { display, page_info }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::RowStatus;
    use serde_json::json;

    fn rows(values: &[Value]) -> Vec<Row> {
        values.iter().map(|v| Row::from_value(v.clone())).collect()
    }

    fn names(rows: &[Row], idx: &[usize]) -> Vec<String> {
        idx.iter().map(|&i| rows[i].get("n").map(value_text).unwrap_or_default()).collect()
    }

    #[test]
    fn test_sort_cycle() {
        let s1 = next_sort_state(None, "a");
        assert_eq!(s1, Some(SortState::asc("a")));
        let s2 = next_sort_state(s1.as_ref(), "a");
        assert_eq!(s2, Some(SortState::desc("a")));
        let s3 = next_sort_state(s2.as_ref(), "a");
        assert_eq!(s3, None);
        assert_eq!(next_sort_state(s2.as_ref(), "b"), Some(SortState::asc("b")));
    }

    #[test]
    fn test_nulls_first_both_directions() {
        let data = rows(&[json!({"n": "x", "v": 2}), json!({"n": "y"}), json!({"n": "z", "v": 1})]);
        let mut idx = vec![0, 1, 2];
        sort_indices(&mut idx, &data, &SortState::asc("v"));
        assert_eq!(names(&data, &idx), vec!["y", "z", "x"]);

        let mut idx = vec![0, 1, 2];
        sort_indices(&mut idx, &data, &SortState::desc("v"));
        assert_eq!(names(&data, &idx), vec!["y", "x", "z"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let data = rows(&[
            json!({"n": "a", "g": 1}),
            json!({"n": "b", "g": 0}),
            json!({"n": "c", "g": 1}),
            json!({"n": "d", "g": 0}),
        ]);
        let mut idx = vec![0, 1, 2, 3];
        sort_indices(&mut idx, &data, &SortState::asc("g"));
        assert_eq!(names(&data, &idx), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_row_number_never_sorts() {
        let data = rows(&[json!({"n": "b"}), json!({"n": "a"})]);
        let mut idx = vec![0, 1];
        sort_indices(&mut idx, &data, &SortState::desc(ROW_NUM_FIELD));
        assert_eq!(idx, vec![0, 1]);
    }

    #[test]
    fn test_filter_membership() {
        let data = rows(&[json!({"n": "a", "c": "red"}), json!({"n": "b", "c": "blue"}), json!({"n": "c", "c": 1})]);
        let mut filters = ColumnFilters::new();
        filters.set("c", &[json!("red"), json!(1.0)]);
        assert!(filters.passes(&data[0]));
        assert!(!filters.passes(&data[1]));
        assert!(filters.passes(&data[2]), "1 and 1.0 are the same number");

        filters.set("c", &[]);
        assert!(!filters.is_active());
    }

    #[test]
    fn test_filter_options_first_seen() {
        let data = rows(&[json!({"c": "b"}), json!({"c": ""}), json!({"c": "a"}), json!({"c": "b"}), json!({})]);
        let opts = filter_options(&data, "c", None);
        let labels: Vec<_> = opts.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "a"]);

        let preset = vec![ValueOption { value: json!(1), label: "One".into() }];
        assert_eq!(filter_options(&data, "c", Some(&preset)), preset);
    }

    #[test]
    fn test_page_info() {
        let info = PageInfo::new(PaginationMode::Page, 99, 15, 500);
        assert_eq!(info.page_count, 34);
        assert_eq!(info.current_page, 34);

        let empty = PageInfo::new(PaginationMode::Page, 3, 15, 0);
        assert_eq!(empty.page_count, 1);
        assert_eq!(empty.current_page, 1);

        let none = PageInfo::new(PaginationMode::None, 7, 15, 500);
        assert_eq!(none.page_count, 1);
        assert_eq!(none.current_page, 1);
    }

    #[test]
    fn test_paginate_modes() {
        let info = PageInfo::new(PaginationMode::Page, 2, 3, 8);
        let mut opts = PaginationOptions {
            mode: PaginationMode::Page,
            ..PaginationOptions::default()
        };
        assert_eq!(paginate((0..8).collect(), &opts, &info), vec![3, 4, 5]);

        opts.mode = PaginationMode::Scroll;
        assert_eq!(paginate((0..8).collect(), &opts, &info), vec![0, 1, 2, 3, 4, 5]);

        opts.kind = PaginationKind::Server;
        assert_eq!(paginate((0..8).collect(), &opts, &info).len(), 8);
    }

    #[test]
    fn test_pipeline_hides_deleted_and_respects_filter_switch() {
        let mut data = rows(&[json!({"n": "a", "c": 1}), json!({"n": "b", "c": 2}), json!({"n": "c", "c": 1})]);
        data[2].status = RowStatus::Deleted;

        let mut filters = ColumnFilters::new();
        filters.set("c", &[json!(2)]);
        let pagination = PaginationOptions::default();
        let mut params = ViewParams {
            header_filter: false,
            filters: &filters,
            sort: None,
            pagination: &pagination,
            page: 1,
            page_size: 15,
            external_total: None,
        };
        let out = compute_view(&data, &params);
        assert_eq!(out.display, vec![0, 1]);
        assert_eq!(out.page_info.total_count, 2);

        params.header_filter = true;
        assert_eq!(compute_view(&data, &params).display, vec![1]);
    }

    #[test]
    fn test_pipeline_500_rows_last_page() {
        let data: Vec<Row> = (0..500).map(|i| Row::from_value(json!({"n": i}))).collect();
        let filters = ColumnFilters::new();
        let pagination = PaginationOptions {
            mode: PaginationMode::Page,
            ..PaginationOptions::default()
        };
        let params = ViewParams {
            header_filter: false,
            filters: &filters,
            sort: None,
            pagination: &pagination,
            page: 34,
            page_size: 15,
            external_total: None,
        };
        let out = compute_view(&data, &params);
        assert_eq!(out.page_info.page_count, 34);
        assert_eq!(out.display.len(), 5);
        assert_eq!(out.display[0], 495);
    }
}
