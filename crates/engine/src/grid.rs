//! The grid: one owner for rows, columns and every interaction state.
//!
//! All mutation goes through `&mut self` methods that finish by
//! recomputing the view, so a query always sees display rows consistent
//! with the last change. Positions handed out (display row/column indices)
//! are only valid until the next mutation; keys and fields are durable.

use onegrid_config::{GridOptions, PaginationMode};
use onegrid_core::{CellCoord, ClickModifier, GridAxes, RowKey, SelectionController};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clipboard::{build_tsv, parse_tsv, plan_paste};
use crate::column::{Column, ColumnModel, EditorKind, ValueOption, ROW_CHECK_FIELD, ROW_NUM_FIELD};
use crate::edit::{can_edit, tab_target, CommitOutcome, EditController, EditSession};
use crate::error::{GridError, Result};
use crate::events::{
    ChangeReason, EditRejectedEvent, EventCallback, GridEvent, PageChangedEvent, PageSizeChangedEvent,
    RowsChangedEvent,
};
use crate::history::HistoryManager;
use crate::layout::{header_layout, HeaderLayout};
use crate::lifecycle::{self, RemoveDisposition};
use crate::row::{Record, Row, RowStatus, RowStore};
use crate::tree::{self, DropMode, TreeNode};
use crate::validation::run_validators;
use crate::value::{parse_number, value_text};
use crate::view::{self, ColumnFilters, PageInfo, SortState, ViewOutput, ViewParams};
use crate::window::{reached_bottom, VirtualWindow};

/// Where `add_row` / `remove_row` act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowPosition {
    First,
    #[default]
    Last,
    /// At an explicit index, else at the active cell's row
    Index,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddRowOptions {
    /// Store index for `RowPosition::Index` (clamped)
    #[serde(default)]
    pub index: Option<usize>,
    /// Initial field values
    #[serde(default)]
    pub row: Option<Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoveRowOptions {
    /// Index into the live, filtered rows for `RowPosition::Index`
    #[serde(default)]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Viewport {
    scroll_offset: f32,
    height: f32,
    width: Option<f32>,
}

/// Display rows and header columns as selection axes.
struct DisplayAxes<'a> {
    keys: &'a [RowKey],
    header: &'a [Column],
}

impl GridAxes for DisplayAxes<'_> {
    fn row_count(&self) -> usize {
        self.keys.len()
    }

    fn col_count(&self) -> usize {
        self.header.len()
    }

    fn row_key_at(&self, row: usize) -> Option<&RowKey> {
        self.keys.get(row)
    }

    fn field_at(&self, col: usize) -> Option<&str> {
        self.header.get(col).map(|c| c.field.as_str())
    }
}

pub struct Grid {
    options: GridOptions,
    columns: ColumnModel,
    store: RowStore,
    history: HistoryManager<Vec<Row>>,
    selection: SelectionController,
    edit: EditController,
    checked: FxHashSet<RowKey>,
    filters: ColumnFilters,
    sort: Option<SortState>,
    page: usize,
    page_size: usize,
    external_total: Option<usize>,
    viewport: Viewport,
    on_event: Option<EventCallback>,

    // Derived on every refresh
    view: ViewOutput,
    header: Vec<Column>,
    display_keys: Vec<RowKey>,
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("rows", &self.store.len())
            .field("display", &self.display_keys.len())
            .field("columns", &self.header.len())
            .field("sort", &self.sort)
            .field("page", &self.page)
            .field("editing", &self.edit.is_editing())
            .finish()
    }
}

impl Grid {
    pub fn new(columns: Vec<Column>, rows: Vec<Row>, options: GridOptions) -> Self {
        let page_size = options.pagination.default_page_size.max(1);
        let history = HistoryManager::new(options.history_limit);
        let mut grid = Self {
            columns: ColumnModel::new(columns),
            store: RowStore::new(rows),
            history,
            selection: SelectionController::new(),
            edit: EditController::new(),
            checked: FxHashSet::default(),
            filters: ColumnFilters::new(),
            sort: None,
            page: 1,
            page_size,
            external_total: None,
            viewport: Viewport::default(),
            on_event: None,
            view: ViewOutput {
                display: Vec::new(),
                page_info: PageInfo::new(options.pagination.mode, 1, page_size, 0),
            },
            header: Vec::new(),
            display_keys: Vec::new(),
            options,
        };
        grid.refresh();
        tracing::debug!(rows = grid.store.len(), columns = grid.header.len(), "grid initialized");
        grid
    }

    /// Grid over hierarchical data, flattened depth-first.
    pub fn with_tree(columns: Vec<Column>, nodes: &[TreeNode], options: GridOptions) -> Self {
        Self::new(columns, tree::flatten(nodes), options)
    }

    pub fn set_event_callback(&mut self, callback: EventCallback) {
        self.on_event = Some(callback);
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    fn emit(&mut self, event: GridEvent) {
        if let Some(cb) = self.on_event.as_mut() {
            cb(event);
        }
    }

    fn rows_changed(&mut self, reason: ChangeReason) {
        self.refresh();
        tracing::debug!(?reason, rows = self.store.len(), "rows changed");
        let row_count = self.store.len();
        self.emit(GridEvent::RowsChanged(RowsChangedEvent { reason, row_count }));
    }

    /// Recompute header and display rows.
    fn refresh(&mut self) {
        self.header = self
            .columns
            .header_columns(self.options.show_row_number, self.options.show_checkbox);

        let params = ViewParams {
            header_filter: self.options.enable_header_filter,
            filters: &self.filters,
            sort: self.sort.as_ref(),
            pagination: &self.options.pagination,
            page: self.page,
            page_size: self.page_size,
            external_total: self.external_total.filter(|_| !self.options.pagination.is_client()),
        };
        self.view = view::compute_view(self.store.as_slice(), &params);
        if self.options.pagination.mode != PaginationMode::None {
            self.page = self.view.page_info.current_page;
        }
        self.display_keys = self
            .view
            .display
            .iter()
            .filter_map(|&i| self.store.at(i).and_then(|r| r.key().cloned()))
            .collect();

        let axes = DisplayAxes {
            keys: &self.display_keys,
            header: &self.header,
        };
        self.selection.refresh_positions(&axes);
    }

    fn clear_interaction(&mut self) {
        self.selection.clear();
        self.edit.cancel();
    }

    // =========================================================================
    // Rows
    // =========================================================================

    /// Replace the row collection. Rows that already carry a key keep it.
    pub fn replace_rows(&mut self, rows: Vec<Row>) {
        self.store.replace(rows);
        if let Some(session) = self.edit.session() {
            if self.store.get(&session.cell.row_key).is_none() {
                self.edit.cancel();
            }
        }
        self.rows_changed(ChangeReason::Replace);
    }

    /// Every row in the store, deleted ones included, synthetic fields on.
    pub fn rows(&self) -> &[Row] {
        self.store.as_slice()
    }

    /// Store rows in export shape.
    pub fn export_rows(&self) -> Vec<Record> {
        self.store.iter().map(Row::to_export).collect()
    }

    pub fn row(&self, key: &RowKey) -> Option<&Row> {
        self.store.get(key)
    }

    pub fn display_len(&self) -> usize {
        self.display_keys.len()
    }

    pub fn display_keys(&self) -> &[RowKey] {
        &self.display_keys
    }

    pub fn display_row(&self, index: usize) -> Option<&Row> {
        self.view.display.get(index).and_then(|&i| self.store.at(i))
    }

    pub fn display_rows(&self) -> Vec<&Row> {
        self.view.display.iter().filter_map(|&i| self.store.at(i)).collect()
    }

    pub fn display_index_of(&self, key: &RowKey) -> Option<usize> {
        self.display_keys.iter().position(|k| k == key)
    }

    /// Rows remove_row positions against: live rows passing the header
    /// filters, in store order.
    fn filtered_keys(&self) -> Vec<RowKey> {
        self.store
            .iter()
            .filter(|r| !r.is_deleted())
            .filter(|r| !self.options.enable_header_filter || self.filters.passes(r))
            .filter_map(|r| r.key().cloned())
            .collect()
    }

    pub fn add_row(&mut self, position: RowPosition, opts: AddRowOptions) -> RowKey {
        let len = self.store.len();
        let index = match position {
            RowPosition::First => 0,
            RowPosition::Last => len,
            RowPosition::Index => match opts.index {
                Some(i) => i.min(len),
                None => self
                    .selection
                    .active()
                    .and_then(|a| self.store.position_of(&a.row_key))
                    .unwrap_or(len),
            },
        };

        let mut row = match opts.row {
            Some(record) => Row::from_value(Value::Object(record)),
            None => Row::default(),
        };
        row.status = RowStatus::Inserted;

        self.history.snapshot_before_change(self.store.as_vec());
        let key = self.store.insert(index, row);
        self.clear_interaction();
        self.rows_changed(ChangeReason::Insert);
        key
    }

    /// Remove one row: inserted rows leave the store, others are marked
    /// deleted. Returns the affected key.
    pub fn remove_row(&mut self, position: RowPosition, opts: RemoveRowOptions) -> Option<RowKey> {
        let filtered = self.filtered_keys();
        let target = match position {
            RowPosition::First => filtered.first().cloned(),
            RowPosition::Last => filtered.last().cloned(),
            RowPosition::Index => match opts.index {
                Some(i) => filtered.get(i).cloned(),
                None => match self.selection.active() {
                    Some(active) => Some(active.row_key.clone()),
                    None => filtered.last().cloned(),
                },
            },
        }?;

        let Some(pos) = self.store.position_of(&target) else {
            tracing::warn!(key = %target, "remove_row: stale key");
            return None;
        };

        self.history.snapshot_before_change(self.store.as_vec());
        self.remove_at(pos);
        self.clear_interaction();
        self.rows_changed(ChangeReason::Remove);
        Some(target)
    }

    fn remove_at(&mut self, pos: usize) {
        let status = match self.store.at(pos) {
            Some(row) => row.status,
            None => return,
        };
        match lifecycle::on_remove(status) {
            RemoveDisposition::Physical => {
                if let Some(row) = self.store.remove(pos) {
                    if let Some(key) = row.key() {
                        self.checked.remove(key);
                    }
                }
            }
            RemoveDisposition::MarkDeleted => {
                if let Some(row) = self.store.rows_mut().get_mut(pos) {
                    row.status = RowStatus::Deleted;
                }
            }
        }
    }

    /// Remove every checked row. Returns how many were affected.
    pub fn remove_checked_rows(&mut self) -> usize {
        // undo can leave keys checked whose rows are gone
        if !self.checked.iter().any(|k| self.store.position_of(k).is_some()) {
            self.checked.clear();
            return 0;
        }
        self.history.snapshot_before_change(self.store.as_vec());

        let checked = std::mem::take(&mut self.checked);
        let mut affected = 0;
        let mut pos = 0;
        while pos < self.store.len() {
            let hit = self
                .store
                .at(pos)
                .and_then(Row::key)
                .is_some_and(|k| checked.contains(k));
            if !hit {
                pos += 1;
                continue;
            }
            affected += 1;
            let before = self.store.len();
            self.remove_at(pos);
            if self.store.len() == before {
                pos += 1;
            }
        }

        self.clear_interaction();
        self.rows_changed(ChangeReason::Remove);
        affected
    }

    /// Reset to `rows` (or empty): clears history, checks and selection.
    pub fn reset_grid(&mut self, rows: Option<Vec<Row>>) {
        self.store.replace(rows.unwrap_or_default());
        self.history.clear();
        self.checked.clear();
        self.clear_interaction();
        self.rows_changed(ChangeReason::Reset);
    }

    pub fn inserted_rows(&self) -> Vec<&Row> {
        lifecycle::inserted(self.store.as_slice())
    }

    pub fn updated_rows(&self) -> Vec<&Row> {
        lifecycle::updated(self.store.as_slice())
    }

    pub fn deleted_rows(&self) -> Vec<&Row> {
        lifecycle::deleted(self.store.as_slice())
    }

    pub fn changed_rows(&self) -> Vec<&Row> {
        lifecycle::changed(self.store.as_slice())
    }

    pub fn checked_rows(&self) -> Vec<&Row> {
        self.store
            .iter()
            .filter(|r| r.key().is_some_and(|k| self.checked.contains(k)))
            .collect()
    }

    /// Rows with at least one selected cell.
    pub fn selected_rows(&self) -> Vec<&Row> {
        let keys: FxHashSet<&RowKey> = self.selection.row_keys().into_iter().collect();
        self.store
            .iter()
            .filter(|r| r.key().is_some_and(|k| keys.contains(k)))
            .collect()
    }

    /// The active cell's row.
    pub fn focused_rows(&self) -> Vec<&Row> {
        match self.selection.active() {
            Some(active) => self.store.get(&active.row_key).into_iter().collect(),
            None => Vec::new(),
        }
    }

    // =========================================================================
    // Checkboxes
    // =========================================================================

    pub fn is_checked(&self, key: &RowKey) -> bool {
        self.checked.contains(key)
    }

    pub fn set_row_checked(&mut self, key: &RowKey, checked: bool) -> bool {
        if self.store.get(key).is_none() {
            return false;
        }
        if checked {
            self.checked.insert(key.clone())
        } else {
            self.checked.remove(key)
        }
    }

    pub fn toggle_row_checked(&mut self, key: &RowKey) -> bool {
        let now = !self.checked.contains(key);
        self.set_row_checked(key, now)
    }

    /// Header checkbox: check or uncheck every display row.
    pub fn set_all_visible_checked(&mut self, checked: bool) {
        for key in &self.display_keys {
            if checked {
                self.checked.insert(key.clone());
            } else {
                self.checked.remove(key);
            }
        }
    }

    pub fn all_visible_checked(&self) -> bool {
        !self.display_keys.is_empty() && self.display_keys.iter().all(|k| self.checked.contains(k))
    }

    // =========================================================================
    // Columns
    // =========================================================================

    pub fn columns(&self) -> &ColumnModel {
        &self.columns
    }

    /// `[rowNum?, rowCheck?, ...visible leaves]`
    pub fn header_columns(&self) -> &[Column] {
        &self.header
    }

    pub fn set_columns(&mut self, columns: Vec<Column>) {
        self.columns.set_columns(columns);
        let model = &self.columns;
        self.filters
            .retain(|field| model.leaf(field).is_some_and(Column::is_filterable));
        if let Some(sort) = &self.sort {
            if self.columns.leaf(&sort.field).is_none() {
                self.sort = None;
            }
        }
        self.edit.cancel();
        self.refresh();
    }

    pub fn move_column(&mut self, drag_field: &str, target_field: &str) -> bool {
        if !self.options.enable_column_reorder {
            return false;
        }
        let moved = self.columns.move_column(drag_field, target_field);
        if moved {
            tracing::debug!(drag_field, target_field, "column moved");
            self.refresh();
        }
        moved
    }

    pub fn resize_column(&mut self, field: &str, width: f32) -> Option<f32> {
        if !self.options.enable_column_resize {
            return None;
        }
        self.columns
            .resize_column(field, width, self.options.min_column_width)
    }

    /// Resolved width of every header column against the viewport width.
    pub fn column_widths(&self) -> Vec<f32> {
        self.columns.resolve_widths(
            &self.header,
            self.viewport.width,
            self.options.default_column_width,
            self.options.min_column_width,
        )
    }

    pub fn header_layout(&self) -> HeaderLayout {
        let fields: Vec<&str> = self.header.iter().map(|c| c.field.as_str()).collect();
        header_layout(self.columns.columns(), &fields, &self.column_widths())
    }

    // =========================================================================
    // Sort and filter
    // =========================================================================

    pub fn sort_state(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    /// Header click. Unknown or unsortable fields are ignored.
    pub fn toggle_sort(&mut self, field: &str) -> bool {
        if !self.columns.leaf(field).is_some_and(Column::is_sortable) {
            return false;
        }
        self.sort = view::next_sort_state(self.sort.as_ref(), field);
        tracing::debug!(field, sort = ?self.sort, "sort toggled");
        self.refresh();
        true
    }

    pub fn set_column_filter(&mut self, field: &str, values: &[Value]) -> Result<()> {
        if !self.columns.leaf(field).is_some_and(Column::is_filterable) {
            return Err(GridError::UnknownColumn(field.to_string()));
        }
        self.filters.set(field, values);
        tracing::debug!(field, values = values.len(), "column filter set");
        self.refresh();
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear_all();
        self.refresh();
    }

    pub fn filter_options(&self, field: &str) -> Result<Vec<ValueOption>> {
        let column = self
            .columns
            .leaf(field)
            .ok_or_else(|| GridError::UnknownColumn(field.to_string()))?;
        Ok(view::filter_options(
            self.store.as_slice(),
            field,
            column.filter_options.as_deref(),
        ))
    }

    // =========================================================================
    // Paging and viewport
    // =========================================================================

    pub fn page_info(&self) -> PageInfo {
        self.view.page_info
    }

    pub fn goto_page(&mut self, page: usize) -> bool {
        if self.options.pagination.mode == PaginationMode::None {
            return false;
        }
        let info = self.view.page_info;
        let target = page.clamp(1, info.page_count);
        if target == info.current_page {
            return false;
        }
        self.page = target;
        self.clear_interaction();
        self.refresh();
        tracing::debug!(page = target, "page changed");
        self.emit(GridEvent::PageChanged(PageChangedEvent {
            page: target,
            page_size: self.page_size,
        }));
        true
    }

    pub fn set_page_size(&mut self, size: usize) -> bool {
        let size = size.max(1);
        if size == self.page_size && self.page == 1 {
            return false;
        }
        self.page_size = size;
        self.page = 1;
        self.clear_interaction();
        self.refresh();
        tracing::debug!(page_size = size, "page size changed");
        self.emit(GridEvent::PageSizeChanged(PageSizeChangedEvent { page_size: size }));
        true
    }

    /// Total reported by the server. Ignored for client pagination; `None`
    /// falls back to the displayed row count.
    pub fn set_total_count(&mut self, total: Option<usize>) {
        self.external_total = total;
        self.refresh();
    }

    pub fn set_viewport(&mut self, height: f32, width: Option<f32>) {
        self.viewport.height = height;
        self.viewport.width = width;
    }

    /// Record a scroll position. In scroll pagination, reaching the bottom
    /// loads the next page; returns whether that happened.
    pub fn scroll_to(&mut self, offset: f32) -> bool {
        self.viewport.scroll_offset = offset.max(0.0);
        if self.options.pagination.mode != PaginationMode::Scroll {
            return false;
        }
        let window = self.virtual_window();
        let info = self.view.page_info;
        if !info.has_next() || !reached_bottom(offset, self.viewport.height, window.content_height) {
            return false;
        }
        self.page = info.current_page + 1;
        self.refresh();
        tracing::debug!(page = self.page, "scroll loaded next page");
        self.emit(GridEvent::PageChanged(PageChangedEvent {
            page: self.page,
            page_size: self.page_size,
        }));
        true
    }

    pub fn virtual_window(&self) -> VirtualWindow {
        VirtualWindow::compute(
            self.display_keys.len(),
            self.viewport.scroll_offset,
            self.viewport.height,
            self.options.row_height,
            self.options.overscan,
        )
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn active_cell(&self) -> Option<&CellCoord> {
        self.selection.active()
    }

    fn coord_at(&self, row: usize, col: usize) -> Option<CellCoord> {
        let key = self.display_keys.get(row)?;
        let column = self.header.get(col)?;
        Some(CellCoord::new(key.clone(), column.field.clone(), row, col))
    }

    fn locate(&self, key: &RowKey, field: &str) -> Option<(usize, usize)> {
        let row = self.display_index_of(key)?;
        let col = self.header.iter().position(|c| c.field == field)?;
        Some((row, col))
    }

    /// Click a display cell. While editing, the open edit is committed
    /// first and a rejected commit blocks the click. Clicking the checkbox
    /// column toggles that row's check instead of selecting.
    pub fn click_cell(&mut self, row: usize, col: usize, modifier: ClickModifier) -> bool {
        let Some(cell) = self.coord_at(row, col) else {
            return false;
        };
        if !self.leave_edit_for(&cell) {
            return false;
        }
        if cell.field == ROW_CHECK_FIELD {
            return self.toggle_row_checked(&cell.row_key);
        }
        let axes = DisplayAxes {
            keys: &self.display_keys,
            header: &self.header,
        };
        self.selection.click(cell, modifier, &axes);
        true
    }

    /// Commit an open edit unless it is on `cell`. False when the click
    /// must not proceed.
    fn leave_edit_for(&mut self, cell: &CellCoord) -> bool {
        let same = match self.edit.session() {
            Some(session) => session.cell.same_cell(cell),
            None => return true,
        };
        !same && !matches!(self.commit_edit(), CommitOutcome::Rejected { .. })
    }

    // =========================================================================
    // Editing
    // =========================================================================

    pub fn edit_session(&self) -> Option<&EditSession> {
        self.edit.session()
    }

    pub fn is_editing(&self) -> bool {
        self.edit.is_editing()
    }

    fn is_cell_editable(&self, col: usize) -> bool {
        self.header
            .get(col)
            .is_some_and(|c| can_edit(c, self.options.editable))
    }

    fn current_value(&self, key: &RowKey, field: &str) -> Value {
        self.store
            .get(key)
            .and_then(|r| r.get(field))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn begin_edit(&mut self, cell: CellCoord, draft: Value) {
        tracing::debug!(%cell, "edit started");
        self.edit.begin(cell, draft);
    }

    pub fn double_click_cell(&mut self, row: usize, col: usize) -> bool {
        let Some(cell) = self.coord_at(row, col) else {
            return false;
        };
        if self.edit.session().is_some_and(|s| s.cell.same_cell(&cell)) {
            return false;
        }
        if !self.leave_edit_for(&cell) {
            return false;
        }
        self.selection.select_cell(cell.clone());
        if !self.is_cell_editable(col) {
            return false;
        }
        let value = self.current_value(&cell.row_key, &cell.field);
        self.begin_edit(cell, value);
        true
    }

    /// Open the editor on `(key, field)` with its current value.
    pub fn start_edit_at(&mut self, key: &RowKey, field: &str) -> bool {
        let Some((row, col)) = self.locate(key, field) else {
            tracing::warn!(%key, field, "start_edit_at: cell not displayed");
            return false;
        };
        if !self.is_cell_editable(col) {
            return false;
        }
        if self.edit.is_editing() && matches!(self.commit_edit(), CommitOutcome::Rejected { .. }) {
            return false;
        }
        let cell = CellCoord::new(key.clone(), field, row, col);
        self.selection.select_cell(cell.clone());
        let value = self.current_value(key, field);
        self.begin_edit(cell, value);
        true
    }

    /// Start editing the active cell from the keyboard.
    pub(crate) fn edit_active_with(&mut self, draft: Option<Value>) -> bool {
        if self.edit.is_editing() {
            return false;
        }
        let Some(active) = self.selection.active().cloned() else {
            return false;
        };
        let Some((row, col)) = self.locate(&active.row_key, &active.field) else {
            return false;
        };
        if !self.is_cell_editable(col) {
            return false;
        }
        let draft = draft.unwrap_or_else(|| self.current_value(&active.row_key, &active.field));
        self.begin_edit(CellCoord::new(active.row_key, active.field, row, col), draft);
        true
    }

    pub fn set_draft(&mut self, draft: Value) -> bool {
        self.edit.set_draft(draft)
    }

    pub(crate) fn edit_mut(&mut self) -> &mut EditController {
        &mut self.edit
    }

    /// Validate and write the draft.
    pub fn commit_edit(&mut self) -> CommitOutcome {
        let Some(session) = self.edit.session().cloned() else {
            return CommitOutcome::NotEditing;
        };
        let cell = session.cell;

        let (validators, draft) = match (self.store.get(&cell.row_key), self.columns.leaf(&cell.field)) {
            (Some(_), Some(column)) => (
                column.validators.clone(),
                editor_value(column, session.draft.clone()),
            ),
            _ => {
                tracing::warn!(%cell, "commit on a row or column that no longer exists");
                self.edit.cancel();
                return CommitOutcome::Stale;
            }
        };

        if let Some(message) = run_validators(&validators, &session.draft) {
            tracing::debug!(%cell, %message, "edit rejected");
            self.edit.reject(message.clone());
            self.emit(GridEvent::EditRejected(EditRejectedEvent {
                cell,
                message: message.clone(),
            }));
            return CommitOutcome::Rejected { message };
        }

        self.history.snapshot_before_change(self.store.as_vec());
        if let Some(row) = self.store.get_mut(&cell.row_key) {
            row.set(cell.field.clone(), draft);
            row.status = lifecycle::on_edit(row.status);
        }
        self.edit.finish();
        self.rows_changed(ChangeReason::Edit);
        CommitOutcome::Committed { cell }
    }

    pub fn cancel_edit(&mut self) -> bool {
        self.edit.cancel()
    }

    /// Commit, then open the next (or previous) editable cell. At the grid
    /// boundary this is a plain commit.
    pub fn tab_navigate(&mut self, backward: bool) -> CommitOutcome {
        let outcome = self.commit_edit();
        let CommitOutcome::Committed { cell } = &outcome else {
            return outcome;
        };
        let Some((row, col)) = self.locate(&cell.row_key, &cell.field) else {
            return outcome;
        };

        let header = &self.header;
        let editable = self.options.editable;
        let target = tab_target(row, col, self.display_keys.len(), header.len(), backward, |c| {
            header.get(c).is_some_and(|column| can_edit(column, editable))
        });

        if let Some(next) = target.and_then(|(r, c)| self.coord_at(r, c)) {
            self.selection.select_cell(next.clone());
            let value = self.current_value(&next.row_key, &next.field);
            self.begin_edit(next, value);
        }
        outcome
    }

    // =========================================================================
    // History
    // =========================================================================

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.store.as_vec()) {
            Some(previous) => {
                self.store.restore(previous);
                self.edit.cancel();
                self.rows_changed(ChangeReason::Undo);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.store.as_vec()) {
            Some(next) => {
                self.store.restore(next);
                self.edit.cancel();
                self.rows_changed(ChangeReason::Redo);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Clipboard
    // =========================================================================

    /// Display text of a cell: 1-based index for the row-number column,
    /// empty for the checkbox column, formatted value otherwise.
    pub fn display_text(&self, row: usize, col: usize) -> Option<String> {
        let column = self.header.get(col)?;
        let data = self.display_row(row)?;
        Some(match column.field.as_str() {
            ROW_NUM_FIELD => (row + 1).to_string(),
            ROW_CHECK_FIELD => String::new(),
            field => match (&column.formatter, data.get(field)) {
                (Some(formatter), Some(value)) => formatter.format(value),
                (None, Some(value)) => value_text(value),
                (_, None) => String::new(),
            },
        })
    }

    /// Raw text of a cell for copying.
    fn copy_text(&self, row: usize, col: usize) -> String {
        let Some(column) = self.header.get(col) else {
            return String::new();
        };
        match column.field.as_str() {
            ROW_NUM_FIELD => (row + 1).to_string(),
            field => self
                .display_row(row)
                .and_then(|r| r.get(field))
                .map(value_text)
                .unwrap_or_default(),
        }
    }

    /// Selection rectangle as TSV, clipped to the display.
    pub fn copy_selection(&self) -> Option<String> {
        let mut rect = self.selection.rect()?;
        if self.display_keys.is_empty() || self.header.is_empty() {
            return None;
        }
        rect.row_end = rect.row_end.min(self.display_keys.len() - 1);
        rect.col_end = rect.col_end.min(self.header.len() - 1);
        if rect.row_start > rect.row_end || rect.col_start > rect.col_end {
            return None;
        }
        Some(build_tsv(&rect, |r, c| self.copy_text(r, c)))
    }

    /// Paste TSV at the active cell. Returns the number of cells written.
    pub fn paste(&mut self, text: &str) -> Result<usize> {
        let cells = match parse_tsv(text) {
            Ok(cells) => cells,
            Err(e) => {
                tracing::warn!(error = %e, "paste aborted");
                return Err(e);
            }
        };
        let Some(active) = self.selection.active() else {
            return Ok(0);
        };
        let Some((row, col)) = self.locate(&active.row_key, &active.field) else {
            return Ok(0);
        };

        let header = &self.header;
        let editable = self.options.editable;
        let plan = plan_paste(&cells, row, col, self.display_keys.len(), header.len(), |c| {
            header.get(c).is_some_and(|column| can_edit(column, editable))
        });
        if plan.is_empty() {
            return Ok(0);
        }

        let writes: Vec<(RowKey, String, Value)> = plan
            .into_iter()
            .filter_map(|cell| {
                let key = self.display_keys.get(cell.row)?.clone();
                let column = self.header.get(cell.col)?;
                let value = editor_value(column, Value::String(cell.text));
                Some((key, column.field.clone(), value))
            })
            .collect();

        self.history.snapshot_before_change(self.store.as_vec());
        for (key, field, value) in &writes {
            if let Some(row) = self.store.get_mut(key) {
                row.set(field.clone(), value.clone());
                row.status = lifecycle::on_edit(row.status);
            }
        }
        self.rows_changed(ChangeReason::Paste);
        Ok(writes.len())
    }

    // =========================================================================
    // Tree
    // =========================================================================

    pub fn toggle_tree_row(&mut self, key: &RowKey) -> bool {
        let has_children = self
            .store
            .get(key)
            .and_then(|r| r.tree.as_ref())
            .is_some_and(|t| t.has_children);
        if !has_children {
            return false;
        }
        self.history.snapshot_before_change(self.store.as_vec());
        tree::toggle_row(self.store.rows_mut(), key);
        self.rows_changed(ChangeReason::TreeToggle);
        true
    }

    /// Drag-and-drop a tree row. Invalid drops change nothing and push no
    /// history.
    pub fn drop_tree_row(&mut self, source: &RowKey, target: Option<&RowKey>, mode: DropMode) -> Result<()> {
        if let Err(e) = tree::validate_drop(self.store.as_slice(), source, target) {
            tracing::warn!(error = %e, "tree drop rejected");
            return Err(e);
        }
        self.history.snapshot_before_change(self.store.as_vec());
        tree::reparent(self.store.rows_mut(), source, target, mode)?;
        tracing::debug!(%source, ?mode, "tree row moved");
        self.rows_changed(ChangeReason::TreeDrop);
        Ok(())
    }

    /// Current rows as nested nodes.
    pub fn tree_nodes(&self) -> Vec<TreeNode> {
        let live: Vec<Row> = self.store.iter().filter(|r| !r.is_deleted()).cloned().collect();
        tree::unflatten(&live)
    }
}

/// Value stored for a cell. Text for a number editor becomes a number when
/// it parses; everything else is kept as given.
fn editor_value(column: &Column, value: Value) -> Value {
    let numeric = column
        .editor
        .as_ref()
        .is_some_and(|e| e.kind == EditorKind::Number);
    match value {
        Value::String(text) if numeric => parse_number(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{fixture_grid, people_columns, people_rows, EventLog};
    use crate::validation::Validator;
    use serde_json::json;

    #[test]
    fn test_initialize_assigns_keys() {
        let grid = fixture_grid(GridOptions::default());
        assert_eq!(grid.rows().len(), 5);
        assert!(grid.rows().iter().all(|r| r.key().is_some()));
        assert_eq!(grid.display_len(), 5);
    }

    #[test]
    fn test_replace_rows_keeps_keys() {
        let mut grid = fixture_grid(GridOptions::default());
        let keys: Vec<_> = grid.rows().iter().map(|r| r.key().cloned()).collect();
        let again = grid.rows().to_vec();
        grid.replace_rows(again);
        let after: Vec<_> = grid.rows().iter().map(|r| r.key().cloned()).collect();
        assert_eq!(keys, after);
    }

    #[test]
    fn test_commit_marks_updated() {
        let mut grid = fixture_grid(GridOptions::default());
        let key = grid.display_keys()[0].clone();
        assert!(grid.start_edit_at(&key, "name"));
        grid.set_draft(json!("Changed"));
        assert!(grid.commit_edit().is_committed());
        let row = grid.row(&key).unwrap();
        assert_eq!(row.get("name"), Some(&json!("Changed")));
        assert_eq!(row.status, RowStatus::Updated);
        assert!(!grid.is_editing());
    }

    #[test]
    fn test_rejected_commit_changes_nothing() {
        let columns = people_columns()
            .into_iter()
            .map(|c| if c.field == "name" { c.with_validator(Validator::required()) } else { c })
            .collect();
        let mut grid = Grid::new(columns, people_rows(), GridOptions::default());
        let log = EventLog::attach(&mut grid);
        let before = grid.rows().to_vec();
        let key = grid.display_keys()[1].clone();

        grid.start_edit_at(&key, "name");
        grid.set_draft(json!("  "));
        let outcome = grid.commit_edit();
        assert!(matches!(outcome, CommitOutcome::Rejected { .. }));
        assert!(grid.is_editing());
        assert_eq!(grid.rows(), before.as_slice());
        assert!(!grid.can_undo());
        assert_eq!(log.get().edit_rejected().len(), 1);
    }

    #[test]
    fn test_cancel_does_not_touch_history() {
        let mut grid = fixture_grid(GridOptions::default());
        let key = grid.display_keys()[0].clone();
        grid.start_edit_at(&key, "name");
        grid.set_draft(json!("x"));
        assert!(grid.cancel_edit());
        assert!(!grid.can_undo());
        assert_ne!(grid.row(&key).unwrap().get("name"), Some(&json!("x")));
    }

    #[test]
    fn test_non_editable_column_does_not_open() {
        let mut grid = fixture_grid(GridOptions::default());
        let key = grid.display_keys()[0].clone();
        assert!(!grid.start_edit_at(&key, "id"));

        let mut locked = fixture_grid(GridOptions {
            editable: false,
            ..GridOptions::default()
        });
        let key = locked.display_keys()[0].clone();
        assert!(!locked.start_edit_at(&key, "name"));
    }

    #[test]
    fn test_add_and_remove_inserted_row() {
        let mut grid = fixture_grid(GridOptions::default());
        let key = grid.add_row(RowPosition::First, AddRowOptions::default());
        assert_eq!(grid.rows().len(), 6);
        assert_eq!(grid.rows()[0].status, RowStatus::Inserted);
        assert_eq!(grid.inserted_rows().len(), 1);

        let removed = grid.remove_row(RowPosition::First, RemoveRowOptions::default());
        assert_eq!(removed, Some(key));
        assert_eq!(grid.rows().len(), 5);
        assert!(grid.inserted_rows().is_empty());
    }

    #[test]
    fn test_remove_persisted_row_hides_it() {
        let mut grid = fixture_grid(GridOptions::default());
        let removed = grid.remove_row(RowPosition::Index, RemoveRowOptions { index: Some(1) }).unwrap();
        assert_eq!(grid.rows().len(), 5);
        assert_eq!(grid.display_len(), 4);
        assert_eq!(grid.row(&removed).unwrap().status, RowStatus::Deleted);
        assert_eq!(grid.deleted_rows().len(), 1);
        assert_eq!(grid.changed_rows().len(), 1);
    }

    #[test]
    fn test_add_row_at_active_cell() {
        let mut grid = fixture_grid(GridOptions::default());
        grid.click_cell(2, 1, ClickModifier::None);
        let mut record = Record::new();
        record.insert("name".into(), json!("New"));
        let key = grid.add_row(
            RowPosition::Index,
            AddRowOptions {
                index: None,
                row: Some(record),
            },
        );
        assert_eq!(grid.rows()[2].key(), Some(&key));
        assert_eq!(grid.rows()[2].get("name"), Some(&json!("New")));
        assert!(grid.active_cell().is_none(), "selection cleared");
    }

    #[test]
    fn test_remove_checked_rows() {
        let mut grid = fixture_grid(GridOptions::default());
        let inserted = grid.add_row(RowPosition::Last, AddRowOptions::default());
        let first = grid.display_keys()[0].clone();
        grid.set_row_checked(&first, true);
        grid.set_row_checked(&inserted, true);
        assert_eq!(grid.checked_rows().len(), 2);

        assert_eq!(grid.remove_checked_rows(), 2);
        assert_eq!(grid.rows().len(), 5);
        assert_eq!(grid.row(&first).unwrap().status, RowStatus::Deleted);
        assert!(grid.checked_rows().is_empty());
    }

    #[test]
    fn test_remove_checked_rows_ignores_stale_keys() {
        let mut grid = fixture_grid(GridOptions::default());
        let inserted = grid.add_row(RowPosition::Last, AddRowOptions::default());
        grid.set_row_checked(&inserted, true);
        assert!(grid.undo());
        assert!(grid.row(&inserted).is_none());

        let log = EventLog::attach(&mut grid);
        let before = grid.rows().to_vec();
        assert_eq!(grid.remove_checked_rows(), 0);
        assert_eq!(grid.rows(), before.as_slice());
        assert!(!grid.can_undo());
        assert!(log.get().rows_changed().is_empty());
    }

    #[test]
    fn test_reset_grid_clears_everything() {
        let mut grid = fixture_grid(GridOptions::default());
        let key = grid.display_keys()[0].clone();
        grid.set_row_checked(&key, true);
        grid.remove_row(RowPosition::First, RemoveRowOptions::default());
        grid.reset_grid(None);
        assert!(grid.rows().is_empty());
        assert!(!grid.can_undo());
        assert!(grid.checked_rows().is_empty());
    }

    #[test]
    fn test_undo_redo_edit() {
        let mut grid = fixture_grid(GridOptions::default());
        let key = grid.display_keys()[0].clone();
        let original = grid.rows().to_vec();
        grid.start_edit_at(&key, "name");
        grid.set_draft(json!("A"));
        grid.commit_edit();
        let edited = grid.rows().to_vec();

        assert!(grid.undo());
        assert_eq!(grid.rows(), original.as_slice());
        assert!(grid.redo());
        assert_eq!(grid.rows(), edited.as_slice());
        assert!(!grid.redo());
    }

    #[test]
    fn test_sort_toggle_cycle() {
        let mut grid = fixture_grid(GridOptions::default());
        let unsorted = grid.display_keys().to_vec();
        assert!(grid.toggle_sort("age"));
        let ages: Vec<_> = grid.display_rows().iter().map(|r| r.get("age").cloned()).collect();
        assert_eq!(ages[0], None, "missing age sorts first");
        grid.toggle_sort("age");
        grid.toggle_sort("age");
        assert!(grid.sort_state().is_none());
        assert_eq!(grid.display_keys(), unsorted.as_slice());
        assert!(!grid.toggle_sort("id"), "id is not sortable");
    }

    #[test]
    fn test_header_filter() {
        let mut grid = fixture_grid(GridOptions {
            enable_header_filter: true,
            ..GridOptions::default()
        });
        grid.set_column_filter("team", &[json!("red")]).unwrap();
        assert_eq!(grid.display_len(), 2);
        assert!(grid.set_column_filter("name", &[json!("x")]).is_err());
        let options = grid.filter_options("team").unwrap();
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_click_range_and_copy() {
        let mut grid = fixture_grid(GridOptions {
            show_row_number: true,
            ..GridOptions::default()
        });
        grid.click_cell(0, 0, ClickModifier::None);
        grid.click_cell(1, 2, ClickModifier::Range);
        assert_eq!(grid.selection().len(), 6);
        let text = grid.copy_selection().unwrap();
        assert_eq!(text, "1\t1\tKim\n2\t2\tLee");
        assert_eq!(grid.selected_rows().len(), 2);
    }

    #[test]
    fn test_paste_writes_editable_cells() {
        let mut grid = fixture_grid(GridOptions::default());
        // active on (row 0, "name")
        grid.click_cell(0, 1, ClickModifier::None);
        let written = grid.paste("P1\t41\nP2\t42\n").unwrap();
        assert_eq!(written, 4);
        let rows = grid.display_rows();
        assert_eq!(rows[0].get("name"), Some(&json!("P1")));
        assert_eq!(rows[1].get("age"), Some(&json!(42)));
        assert!(rows[1].get("age").is_some_and(Value::is_i64));
        assert_eq!(rows[0].status, RowStatus::Updated);

        let before = grid.rows().to_vec();
        assert!(grid.paste("").is_err());
        assert_eq!(grid.rows(), before.as_slice());
    }

    #[test]
    fn test_page_navigation() {
        let mut grid = Grid::new(
            people_columns(),
            (0..40).map(|i| Row::from_value(json!({"id": i}))).collect(),
            GridOptions {
                pagination: onegrid_config::PaginationOptions {
                    mode: PaginationMode::Page,
                    ..Default::default()
                },
                ..GridOptions::default()
            },
        );
        let log = EventLog::attach(&mut grid);
        assert_eq!(grid.page_info().page_count, 3);
        grid.click_cell(0, 0, ClickModifier::None);
        assert!(grid.goto_page(3));
        assert_eq!(grid.display_len(), 10);
        assert!(grid.active_cell().is_none());
        assert!(!grid.goto_page(3));
        assert!(!grid.goto_page(99), "clamped to the current page");
        assert_eq!(log.get().page_changed().len(), 1);

        grid.set_page_size(30);
        assert_eq!(grid.page_info().current_page, 1);
        assert_eq!(grid.page_info().page_count, 2);
    }
}
