//! Insert/Update/Delete status rules.

use crate::row::{Row, RowStatus};

/// What `remove_row` does to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveDisposition {
    /// Never persisted: drop it from the store.
    Physical,
    /// Keep it in the store, hidden, until reset.
    MarkDeleted,
}

/// Status after an edit commit or paste. Inserted and deleted rows keep
/// their status.
pub fn on_edit(status: RowStatus) -> RowStatus {
    match status {
        RowStatus::None | RowStatus::Updated => RowStatus::Updated,
        other => other,
    }
}

pub fn on_remove(status: RowStatus) -> RemoveDisposition {
    match status {
        RowStatus::Inserted => RemoveDisposition::Physical,
        _ => RemoveDisposition::MarkDeleted,
    }
}

pub fn inserted(rows: &[Row]) -> Vec<&Row> {
    with_status(rows, |s| s == RowStatus::Inserted)
}

pub fn updated(rows: &[Row]) -> Vec<&Row> {
    with_status(rows, |s| s == RowStatus::Updated)
}

pub fn deleted(rows: &[Row]) -> Vec<&Row> {
    with_status(rows, |s| s == RowStatus::Deleted)
}

/// Union of inserted, updated and deleted, in store order.
pub fn changed(rows: &[Row]) -> Vec<&Row> {
    with_status(rows, |s| s != RowStatus::None)
}

fn with_status(rows: &[Row], pred: impl Fn(RowStatus) -> bool) -> Vec<&Row> {
    rows.iter().filter(|r| pred(r.status)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: RowStatus) -> Row {
        Row {
            status,
            ..Row::default()
        }
    }

    #[test]
    fn test_edit_transitions() {
        assert_eq!(on_edit(RowStatus::None), RowStatus::Updated);
        assert_eq!(on_edit(RowStatus::Updated), RowStatus::Updated);
        assert_eq!(on_edit(RowStatus::Inserted), RowStatus::Inserted);
        assert_eq!(on_edit(RowStatus::Deleted), RowStatus::Deleted);
    }

    #[test]
    fn test_remove_disposition() {
        assert_eq!(on_remove(RowStatus::Inserted), RemoveDisposition::Physical);
        assert_eq!(on_remove(RowStatus::None), RemoveDisposition::MarkDeleted);
        assert_eq!(on_remove(RowStatus::Updated), RemoveDisposition::MarkDeleted);
    }

    #[test]
    fn test_filtered_views() {
        let rows = vec![
            row(RowStatus::None),
            row(RowStatus::Inserted),
            row(RowStatus::Updated),
            row(RowStatus::Deleted),
            row(RowStatus::Updated),
        ];
        assert_eq!(inserted(&rows).len(), 1);
        assert_eq!(updated(&rows).len(), 2);
        assert_eq!(deleted(&rows).len(), 1);
        assert_eq!(changed(&rows).len(), 4);
    }
}
