//! Change notifications.
//!
//! The grid reports mutations the embedding UI cares about (row data,
//! paging) through a single callback. Events are emitted after the state
//! change is complete.

use onegrid_core::CellCoord;
use serde::Serialize;

/// Events emitted by the grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum GridEvent {
    /// The row collection changed.
    RowsChanged(RowsChangedEvent),

    /// Current page moved. Selection and edit state were cleared.
    PageChanged(PageChangedEvent),

    /// Page size changed; the page was reset to 1.
    PageSizeChanged(PageSizeChangedEvent),

    /// An edit commit failed validation and the editor stayed open.
    EditRejected(EditRejectedEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeReason {
    Replace,
    Reset,
    Edit,
    Insert,
    Remove,
    Paste,
    Undo,
    Redo,
    TreeToggle,
    TreeDrop,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsChangedEvent {
    pub reason: ChangeReason,
    /// Store size after the change, deleted rows included.
    pub row_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageChangedEvent {
    pub page: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSizeChangedEvent {
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRejectedEvent {
    pub cell: CellCoord,
    pub message: String,
}

/// Callback type for receiving grid events.
pub type EventCallback = Box<dyn FnMut(GridEvent) + Send>;

/// Simple event collector for testing.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<GridEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: GridEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GridEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn rows_changed(&self) -> Vec<&RowsChangedEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GridEvent::RowsChanged(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn page_changed(&self) -> Vec<&PageChangedEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GridEvent::PageChanged(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn edit_rejected(&self) -> Vec<&EditRejectedEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GridEvent::EditRejected(r) => Some(r),
                _ => None,
            })
            .collect()
    }
}
