//! Commands: every user gesture as a message the grid can apply.
//!
//! Hosts translate their own input events into `GridCommand`s; scripts
//! (see the `ogrid replay` tool) deserialize them from JSON.

use onegrid_core::{ClickModifier, RowKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::edit::CommitOutcome;
use crate::grid::{AddRowOptions, Grid, RemoveRowOptions, RowPosition};
use crate::tree::DropMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Tab,
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
    pub key: Key,
    /// Ctrl on Linux/Windows, Cmd on macOS
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
        }
    }

    pub fn ctrl(ch: char) -> Self {
        Self {
            key: Key::Char(ch),
            ctrl: true,
            shift: false,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GridCommand {
    Click {
        row: usize,
        col: usize,
        #[serde(default)]
        modifier: ClickModifier,
    },
    DoubleClick {
        row: usize,
        col: usize,
    },
    KeyDown(KeyInput),
    StartEdit {
        row_key: RowKey,
        field: String,
    },
    SetDraft {
        value: Value,
    },
    Commit,
    Cancel,
    Tab {
        #[serde(default)]
        backward: bool,
    },
    Undo,
    Redo,
    Copy,
    Paste {
        text: String,
    },
    AddRow {
        #[serde(default)]
        position: RowPosition,
        #[serde(flatten)]
        options: AddRowOptions,
    },
    RemoveRow {
        #[serde(default)]
        position: RowPosition,
        #[serde(default)]
        index: Option<usize>,
    },
    RemoveCheckedRows,
    CheckRow {
        row_key: RowKey,
        checked: bool,
    },
    CheckAll {
        checked: bool,
    },
    ToggleSort {
        field: String,
    },
    SetFilter {
        field: String,
        values: Vec<Value>,
    },
    GotoPage {
        page: usize,
    },
    SetPageSize {
        size: usize,
    },
    ToggleTree {
        row_key: RowKey,
    },
    DropTree {
        source: RowKey,
        #[serde(default)]
        target: Option<RowKey>,
        mode: DropMode,
    },
    MoveColumn {
        drag: String,
        target: String,
    },
    ResizeColumn {
        field: String,
        width: f32,
    },
    Scroll {
        offset: f32,
    },
}

/// What a command did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CommandOutcome {
    /// Nothing changed
    Ignored,
    Handled,
    Copied { text: String },
    /// Ctrl+V: the host reads its clipboard and sends `Paste`
    PasteRequested,
    Rejected { message: String },
}

impl CommandOutcome {
    fn from_flag(changed: bool) -> Self {
        if changed {
            CommandOutcome::Handled
        } else {
            CommandOutcome::Ignored
        }
    }

    fn from_commit(outcome: CommitOutcome) -> Self {
        match outcome {
            CommitOutcome::NotEditing => CommandOutcome::Ignored,
            CommitOutcome::Committed { .. } | CommitOutcome::Stale => CommandOutcome::Handled,
            CommitOutcome::Rejected { message } => CommandOutcome::Rejected { message },
        }
    }

    pub fn is_handled(&self) -> bool {
        !matches!(self, CommandOutcome::Ignored | CommandOutcome::Rejected { .. })
    }
}

impl Grid {
    /// Keyboard input against the active cell or open editor.
    pub fn key_down(&mut self, input: KeyInput) -> CommandOutcome {
        if self.is_editing() {
            return match input.key {
                Key::Enter => CommandOutcome::from_commit(self.commit_edit()),
                Key::Escape => CommandOutcome::from_flag(self.cancel_edit()),
                Key::Tab => CommandOutcome::from_commit(self.tab_navigate(input.shift)),
                Key::Backspace => CommandOutcome::from_flag(self.edit_mut().backspace()),
                Key::Char(_) if input.ctrl => CommandOutcome::Ignored,
                Key::Char(ch) => CommandOutcome::from_flag(self.edit_mut().type_char(ch)),
            };
        }

        match input.key {
            Key::Char(ch) if input.ctrl => match ch.to_ascii_lowercase() {
                'z' if input.shift => CommandOutcome::from_flag(self.redo()),
                'z' => CommandOutcome::from_flag(self.undo()),
                'y' => CommandOutcome::from_flag(self.redo()),
                'c' => match self.copy_selection() {
                    Some(text) => CommandOutcome::Copied { text },
                    None => CommandOutcome::Ignored,
                },
                'v' if self.active_cell().is_some() => CommandOutcome::PasteRequested,
                _ => CommandOutcome::Ignored,
            },
            Key::Char(ch) if !ch.is_control() => {
                CommandOutcome::from_flag(self.edit_active_with(Some(Value::String(ch.to_string()))))
            }
            Key::Enter => CommandOutcome::from_flag(self.edit_active_with(None)),
            _ => CommandOutcome::Ignored,
        }
    }

    pub fn dispatch(&mut self, command: GridCommand) -> CommandOutcome {
        tracing::trace!(?command, "dispatch");
        match command {
            GridCommand::Click { row, col, modifier } => {
                CommandOutcome::from_flag(self.click_cell(row, col, modifier))
            }
            GridCommand::DoubleClick { row, col } => CommandOutcome::from_flag(self.double_click_cell(row, col)),
            GridCommand::KeyDown(input) => self.key_down(input),
            GridCommand::StartEdit { row_key, field } => {
                CommandOutcome::from_flag(self.start_edit_at(&row_key, &field))
            }
            GridCommand::SetDraft { value } => CommandOutcome::from_flag(self.set_draft(value)),
            GridCommand::Commit => CommandOutcome::from_commit(self.commit_edit()),
            GridCommand::Cancel => CommandOutcome::from_flag(self.cancel_edit()),
            GridCommand::Tab { backward } => CommandOutcome::from_commit(self.tab_navigate(backward)),
            GridCommand::Undo => CommandOutcome::from_flag(self.undo()),
            GridCommand::Redo => CommandOutcome::from_flag(self.redo()),
            GridCommand::Copy => match self.copy_selection() {
                Some(text) => CommandOutcome::Copied { text },
                None => CommandOutcome::Ignored,
            },
            GridCommand::Paste { text } => match self.paste(&text) {
                Ok(0) => CommandOutcome::Ignored,
                Ok(_) => CommandOutcome::Handled,
                Err(e) => CommandOutcome::Rejected { message: e.to_string() },
            },
            GridCommand::AddRow { position, options } => {
                self.add_row(position, options);
                CommandOutcome::Handled
            }
            GridCommand::RemoveRow { position, index } => {
                CommandOutcome::from_flag(self.remove_row(position, RemoveRowOptions { index }).is_some())
            }
            GridCommand::RemoveCheckedRows => CommandOutcome::from_flag(self.remove_checked_rows() > 0),
            GridCommand::CheckRow { row_key, checked } => {
                CommandOutcome::from_flag(self.set_row_checked(&row_key, checked))
            }
            GridCommand::CheckAll { checked } => {
                self.set_all_visible_checked(checked);
                CommandOutcome::Handled
            }
            GridCommand::ToggleSort { field } => CommandOutcome::from_flag(self.toggle_sort(&field)),
            GridCommand::SetFilter { field, values } => match self.set_column_filter(&field, &values) {
                Ok(()) => CommandOutcome::Handled,
                Err(e) => CommandOutcome::Rejected { message: e.to_string() },
            },
            GridCommand::GotoPage { page } => CommandOutcome::from_flag(self.goto_page(page)),
            GridCommand::SetPageSize { size } => CommandOutcome::from_flag(self.set_page_size(size)),
            GridCommand::ToggleTree { row_key } => CommandOutcome::from_flag(self.toggle_tree_row(&row_key)),
            GridCommand::DropTree { source, target, mode } => {
                match self.drop_tree_row(&source, target.as_ref(), mode) {
                    Ok(()) => CommandOutcome::Handled,
                    Err(e) => CommandOutcome::Rejected { message: e.to_string() },
                }
            }
            GridCommand::MoveColumn { drag, target } => CommandOutcome::from_flag(self.move_column(&drag, &target)),
            GridCommand::ResizeColumn { field, width } => {
                CommandOutcome::from_flag(self.resize_column(&field, width).is_some())
            }
            GridCommand::Scroll { offset } => {
                self.scroll_to(offset);
                CommandOutcome::Handled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::fixture_grid;
    use onegrid_config::GridOptions;
    use serde_json::json;

    #[test]
    fn test_typing_opens_editor_with_char() {
        let mut grid = fixture_grid(GridOptions::default());
        grid.click_cell(0, 1, ClickModifier::None);
        assert!(grid.key_down(KeyInput::plain(Key::Char('Z'))).is_handled());
        assert_eq!(grid.edit_session().unwrap().draft, json!("Z"));
        grid.key_down(KeyInput::plain(Key::Char('o')));
        assert_eq!(grid.edit_session().unwrap().draft, json!("Zo"));
        grid.key_down(KeyInput::plain(Key::Enter));
        assert!(!grid.is_editing());
        assert_eq!(grid.display_rows()[0].get("name"), Some(&json!("Zo")));
    }

    #[test]
    fn test_enter_opens_with_current_value_and_escape_cancels() {
        let mut grid = fixture_grid(GridOptions::default());
        grid.click_cell(1, 1, ClickModifier::None);
        grid.key_down(KeyInput::plain(Key::Enter));
        assert_eq!(grid.edit_session().unwrap().draft, json!("Lee"));
        assert!(grid.key_down(KeyInput::plain(Key::Escape)).is_handled());
        assert!(!grid.is_editing());
        assert!(!grid.can_undo());
    }

    #[test]
    fn test_ctrl_shortcuts() {
        let mut grid = fixture_grid(GridOptions::default());
        assert_eq!(grid.key_down(KeyInput::ctrl('z')), CommandOutcome::Ignored);
        assert_eq!(grid.key_down(KeyInput::ctrl('v')), CommandOutcome::Ignored);

        grid.click_cell(0, 1, ClickModifier::None);
        assert_eq!(
            grid.key_down(KeyInput::ctrl('c')),
            CommandOutcome::Copied { text: "Kim".into() }
        );
        assert_eq!(grid.key_down(KeyInput::ctrl('v')), CommandOutcome::PasteRequested);

        grid.dispatch(GridCommand::Paste { text: "Jo".into() });
        assert!(grid.key_down(KeyInput::ctrl('z')).is_handled());
        assert_eq!(grid.display_rows()[0].get("name"), Some(&json!("Kim")));
        assert!(grid.key_down(KeyInput::ctrl('z').with_shift()).is_handled());
        assert_eq!(grid.display_rows()[0].get("name"), Some(&json!("Jo")));
    }

    #[test]
    fn test_commands_deserialize() {
        let script = json!([
            {"op": "click", "row": 0, "col": 1},
            {"op": "click", "row": 2, "col": 2, "modifier": "range"},
            {"op": "keyDown", "key": {"char": "x"}},
            {"op": "keyDown", "key": "enter"},
            {"op": "tab", "backward": true},
            {"op": "addRow", "position": "index", "index": 2, "row": {"name": "New"}},
            {"op": "removeRow", "position": "first"},
            {"op": "dropTree", "source": "a", "target": "b", "mode": "child"},
            {"op": "setFilter", "field": "team", "values": ["red"]},
            {"op": "startEdit", "rowKey": "k1", "field": "name"}
        ]);
        let commands: Vec<GridCommand> = serde_json::from_value(script).unwrap();
        assert_eq!(commands.len(), 10);
        assert_eq!(
            commands[1],
            GridCommand::Click {
                row: 2,
                col: 2,
                modifier: ClickModifier::Range
            }
        );
        assert!(matches!(
            &commands[5],
            GridCommand::AddRow { position: RowPosition::Index, options } if options.index == Some(2)
        ));
        assert!(matches!(
            &commands[9],
            GridCommand::StartEdit { row_key, .. } if row_key.as_str() == "k1"
        ));
    }

    #[test]
    fn test_rejected_commit_reported() {
        use crate::validation::Validator;
        let columns = crate::harness::people_columns()
            .into_iter()
            .map(|c| if c.field == "age" { c.with_validator(Validator::number()) } else { c })
            .collect();
        let mut grid = Grid::new(columns, crate::harness::people_rows(), GridOptions::default());
        grid.dispatch(GridCommand::DoubleClick { row: 0, col: 2 });
        grid.dispatch(GridCommand::SetDraft { value: json!("abc") });
        let outcome = grid.dispatch(GridCommand::Commit);
        assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
        assert!(grid.is_editing());
    }
}
