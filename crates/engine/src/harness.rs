//! Test harness for grid interactions with event tracking.
//!
//! Provides fixture columns and rows, `EventLog` (a shared collector wired
//! into the grid's event callback) and `GridHarness`, which replays a
//! script of commands and records each outcome.

use std::sync::{Arc, Mutex, MutexGuard};

use onegrid_config::GridOptions;
use serde_json::json;

use crate::column::{Column, EditorConfig, EditorKind};
use crate::command::{CommandOutcome, GridCommand};
use crate::events::EventCollector;
use crate::grid::Grid;
use crate::row::Row;

/// `id` (read-only), `name` (text), `age` (number, sortable), `team`
/// (filterable).
pub fn people_columns() -> Vec<Column> {
    vec![
        Column::new("id", "ID").with_width(60.0),
        Column::new("name", "Name").editable().sortable(),
        Column::new("age", "Age")
            .with_editor(EditorConfig::new(EditorKind::Number))
            .sortable(),
        Column::new("team", "Team").editable().filterable(),
    ]
}

/// Five rows; Moe has no age.
pub fn people_rows() -> Vec<Row> {
    [
        json!({"id": 1, "name": "Kim", "age": 34, "team": "red"}),
        json!({"id": 2, "name": "Lee", "age": 28, "team": "blue"}),
        json!({"id": 3, "name": "Ann", "age": 41, "team": "red"}),
        json!({"id": 4, "name": "Moe", "team": "blue"}),
        json!({"id": 5, "name": "Sue", "age": 19, "team": "blue"}),
    ]
    .into_iter()
    .map(Row::from_value)
    .collect()
}

pub fn fixture_grid(options: GridOptions) -> Grid {
    Grid::new(people_columns(), people_rows(), options)
}

/// Events emitted by a grid, shared with the test body.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<EventCollector>>);

impl EventLog {
    pub fn attach(grid: &mut Grid) -> Self {
        let log = Self::default();
        let sink = Arc::clone(&log.0);
        grid.set_event_callback(Box::new(move |event| {
            if let Ok(mut events) = sink.lock() {
                events.push(event);
            }
        }));
        log
    }

    pub fn get(&self) -> MutexGuard<'_, EventCollector> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn clear(&self) {
        self.get().clear();
    }
}

/// Grid plus event log plus per-command outcomes.
pub struct GridHarness {
    grid: Grid,
    events: EventLog,
    outcomes: Vec<CommandOutcome>,
}

impl GridHarness {
    pub fn new(mut grid: Grid) -> Self {
        let events = EventLog::attach(&mut grid);
        Self {
            grid,
            events,
            outcomes: Vec::new(),
        }
    }

    pub fn people(options: GridOptions) -> Self {
        Self::new(fixture_grid(options))
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn events(&self) -> MutexGuard<'_, EventCollector> {
        self.events.get()
    }

    pub fn outcomes(&self) -> &[CommandOutcome] {
        &self.outcomes
    }

    /// Apply commands in order. Returns how many were handled.
    pub fn run(&mut self, commands: impl IntoIterator<Item = GridCommand>) -> usize {
        let mut handled = 0;
        for command in commands {
            let outcome = self.grid.dispatch(command);
            if outcome.is_handled() {
                handled += 1;
            }
            self.outcomes.push(outcome);
        }
        handled
    }

    /// Field values of the display rows, in order.
    pub fn column_values(&self, field: &str) -> Vec<serde_json::Value> {
        self.grid
            .display_rows()
            .iter()
            .map(|r| r.get(field).cloned().unwrap_or_default())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeReason;
    use onegrid_core::ClickModifier;

    #[test]
    fn test_harness_records_outcomes_and_events() {
        let mut h = GridHarness::people(GridOptions::default());
        let handled = h.run([
            GridCommand::Click {
                row: 0,
                col: 1,
                modifier: ClickModifier::None,
            },
            GridCommand::Paste { text: "Kai".into() },
            GridCommand::Undo,
            GridCommand::Undo,
        ]);
        assert_eq!(handled, 3);
        assert_eq!(h.outcomes().last(), Some(&CommandOutcome::Ignored));

        let events = h.events();
        let reasons: Vec<_> = events.rows_changed().iter().map(|e| e.reason).collect();
        assert_eq!(reasons, vec![ChangeReason::Paste, ChangeReason::Undo]);
    }

    #[test]
    fn test_column_values() {
        let h = GridHarness::people(GridOptions::default());
        assert_eq!(h.column_values("name")[0], json!("Kim"));
        assert_eq!(h.column_values("age")[3], serde_json::Value::Null);
    }
}
