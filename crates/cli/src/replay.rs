//! Command replay: apply a JSON script of grid commands headlessly.
//!
//! Usage: ogrid replay --columns c.json --rows r.json --script s.json
//!
//! The script is a JSON array of commands, each tagged by `op`:
//!
//! ```json
//! [
//!   {"op": "click", "row": 0, "col": 1},
//!   {"op": "keyDown", "key": "enter"},
//!   {"op": "setDraft", "value": "Kai"},
//!   {"op": "commit"}
//! ]
//! ```
//!
//! The report lists one outcome per command plus every event the grid
//! emitted, the final display rows, the changed rows and the page state.

use std::path::Path;
use std::sync::{Arc, Mutex};

use onegrid_engine::{CommandOutcome, Grid, GridCommand, GridEvent, PageInfo, Record, Row};
use serde::Serialize;
use serde_json::Value;

use crate::input::read_json;
use crate::CliError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub outcomes: Vec<CommandOutcome>,
    pub events: Vec<GridEvent>,
    pub rows: Vec<Record>,
    pub changed: Vec<ChangedRow>,
    pub page_info: PageInfo,
}

/// A changed row with its lifecycle code.
#[derive(Debug, Serialize)]
pub struct ChangedRow {
    pub status: &'static str,
    #[serde(flatten)]
    pub fields: Record,
}

impl ChangedRow {
    fn from_row(row: &Row) -> Self {
        Self {
            status: row.status.code(),
            fields: row.to_export(),
        }
    }
}

pub fn load_script(path: &Path) -> Result<Vec<GridCommand>, CliError> {
    let value = read_json(path)?;
    if !matches!(value, Value::Array(_)) {
        return Err(CliError::parse(format!("{}: script must be a JSON array", path.display())));
    }
    serde_json::from_value(value).map_err(|e| {
        CliError::parse(format!("{}: invalid command: {}", path.display(), e))
            .with_hint("each command is an object tagged by \"op\", e.g. {\"op\": \"undo\"}")
    })
}

/// Apply `commands` in order and report the result.
pub fn replay(mut grid: Grid, commands: Vec<GridCommand>) -> ReplayReport {
    let events: Arc<Mutex<Vec<GridEvent>>> = Arc::default();
    let sink = Arc::clone(&events);
    grid.set_event_callback(Box::new(move |event| {
        if let Ok(mut events) = sink.lock() {
            events.push(event);
        }
    }));

    let total = commands.len();
    let outcomes: Vec<CommandOutcome> = commands
        .into_iter()
        .enumerate()
        .map(|(i, command)| {
            let outcome = grid.dispatch(command);
            tracing::debug!(step = i + 1, total, ?outcome, "replayed command");
            outcome
        })
        .collect();

    let events = events
        .lock()
        .map(|mut events| std::mem::take(&mut *events))
        .unwrap_or_default();

    ReplayReport {
        outcomes,
        events,
        rows: grid.display_rows().iter().map(|r| r.to_export()).collect(),
        changed: grid.changed_rows().into_iter().map(ChangedRow::from_row).collect(),
        page_info: grid.page_info(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onegrid_engine::{Column, GridOptions};
    use serde_json::json;

    fn grid() -> Grid {
        let columns = vec![
            Column::new("id", "ID"),
            Column::new("name", "Name").editable(),
        ];
        let rows = vec![
            Row::from_value(json!({"id": 1, "name": "Kim"})),
            Row::from_value(json!({"id": 2, "name": "Lee"})),
        ];
        Grid::new(columns, rows, GridOptions::default())
    }

    #[test]
    fn test_replay_edit_and_remove() {
        let commands: Vec<GridCommand> = serde_json::from_value(json!([
            {"op": "doubleClick", "row": 1, "col": 1},
            {"op": "setDraft", "value": "Lea"},
            {"op": "commit"},
            {"op": "removeRow", "position": "first"},
            {"op": "undo"},
            {"op": "redo"}
        ]))
        .unwrap();

        let report = replay(grid(), commands);
        assert_eq!(report.outcomes.len(), 6);
        assert!(report.outcomes.iter().all(CommandOutcome::is_handled));
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0]["name"], json!("Lea"));

        let statuses: Vec<_> = report.changed.iter().map(|c| c.status).collect();
        assert_eq!(statuses, vec!["D", "U"]);
        assert_eq!(report.events.len(), 4);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = replay(grid(), Vec::new());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["pageInfo"]["pageCount"], json!(1));
        assert_eq!(value["rows"][0]["name"], json!("Kim"));
        assert!(value["rows"][0].get("_rowKey").is_none());
    }
}
