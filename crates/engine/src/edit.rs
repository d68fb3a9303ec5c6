//! Inline edit state machine.
//!
//! ```text
//! Viewing --(double-click | printable key | Enter)--> Editing
//! Editing --(commit ok)--> Viewing
//! Editing --(commit rejected)--> Editing (error set)
//! Editing --(Escape)--> Viewing
//! ```
//!
//! This module only tracks state. Validation, history and the row write
//! happen in the grid, which owns the rows.

use onegrid_core::CellCoord;
use serde::Serialize;
use serde_json::Value;

use crate::column::Column;
use crate::value::value_text;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSession {
    pub cell: CellCoord,
    pub draft: Value,
    /// Message from the last rejected commit
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum EditState {
    #[default]
    Viewing,
    Editing(EditSession),
}

/// Result of a commit attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum CommitOutcome {
    /// No edit in progress.
    NotEditing,
    /// Draft written to the row.
    Committed { cell: CellCoord },
    /// A validator failed; still editing.
    Rejected { message: String },
    /// The edited row no longer exists; the editor was closed.
    Stale,
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct EditController {
    state: EditState,
}

impl EditController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditState::Editing(_))
    }

    pub fn session(&self) -> Option<&EditSession> {
        match &self.state {
            EditState::Editing(s) => Some(s),
            EditState::Viewing => None,
        }
    }

    pub fn begin(&mut self, cell: CellCoord, draft: Value) {
        self.state = EditState::Editing(EditSession {
            cell,
            draft,
            error: None,
        });
    }

    /// Replace the draft. Clears any previous rejection.
    pub fn set_draft(&mut self, draft: Value) -> bool {
        match &mut self.state {
            EditState::Editing(s) => {
                s.draft = draft;
                s.error = None;
                true
            }
            EditState::Viewing => false,
        }
    }

    /// Append typed text to a string draft.
    pub fn type_char(&mut self, ch: char) -> bool {
        match &mut self.state {
            EditState::Editing(s) => {
                let mut text = match &s.draft {
                    Value::String(t) => t.clone(),
                    Value::Null => String::new(),
                    other => value_text(other),
                };
                text.push(ch);
                s.draft = Value::String(text);
                s.error = None;
                true
            }
            EditState::Viewing => false,
        }
    }

    pub fn backspace(&mut self) -> bool {
        match &mut self.state {
            EditState::Editing(s) => {
                let mut text = value_text(&s.draft);
                text.pop();
                s.draft = Value::String(text);
                true
            }
            EditState::Viewing => false,
        }
    }

    pub fn reject(&mut self, message: String) {
        if let EditState::Editing(s) = &mut self.state {
            s.error = Some(message);
        }
    }

    /// Leave `Editing`, handing back the session.
    pub fn finish(&mut self) -> Option<EditSession> {
        match std::mem::take(&mut self.state) {
            EditState::Editing(s) => Some(s),
            EditState::Viewing => None,
        }
    }

    /// Discard the draft. Returns whether an edit was open.
    pub fn cancel(&mut self) -> bool {
        self.finish().is_some()
    }
}

/// Whether `column` accepts inline edits under the grid-level switch.
pub fn can_edit(column: &Column, grid_editable: bool) -> bool {
    grid_editable && column.is_editable()
}

/// Tab target from `(row, col)`: the rest of this row, then the adjacent
/// row from its first (or, going back, last) column. `editable(col)`
/// reports whether a header column can be edited.
pub fn tab_target(
    row: usize,
    col: usize,
    row_count: usize,
    col_count: usize,
    backward: bool,
    editable: impl Fn(usize) -> bool,
) -> Option<(usize, usize)> {
    if backward {
        if let Some(c) = (0..col.min(col_count)).rev().find(|&c| editable(c)) {
            return Some((row, c));
        }
        let prev = row.checked_sub(1)?;
        (0..col_count).rev().find(|&c| editable(c)).map(|c| (prev, c))
    } else {
        if let Some(c) = (col + 1..col_count).find(|&c| editable(c)) {
            return Some((row, c));
        }
        let next = row + 1;
        if next >= row_count {
            return None;
        }
        (0..col_count).find(|&c| editable(c)).map(|c| (next, c))
    }
}
