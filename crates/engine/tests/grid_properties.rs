// Property tests for key stability, history depth and paging.

use onegrid_config::{PaginationMode, PaginationOptions};
use onegrid_engine::{
    AddRowOptions, ClickModifier, Column, Grid, GridOptions, RemoveRowOptions, Row, RowKey, RowPosition,
};
use proptest::prelude::*;
use serde_json::json;

fn columns() -> Vec<Column> {
    vec![
        Column::new("id", "ID"),
        Column::new("name", "Name").editable().sortable(),
    ]
}

fn rows(n: usize) -> Vec<Row> {
    (0..n).map(|i| Row::from_value(json!({"id": i, "name": format!("n{i}")}))).collect()
}

#[derive(Debug, Clone)]
enum Mutation {
    Edit { row: usize, text: String },
    Insert { first: bool },
    Remove { index: usize },
    Paste { row: usize, text: String },
}

fn mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        (0usize..8, "[a-z]{1,6}").prop_map(|(row, text)| Mutation::Edit { row, text }),
        any::<bool>().prop_map(|first| Mutation::Insert { first }),
        (0usize..8).prop_map(|index| Mutation::Remove { index }),
        (0usize..8, "[a-z]{1,4}").prop_map(|(row, text)| Mutation::Paste { row, text }),
    ]
}

/// Apply one mutation as step `step`. Written text carries the step number
/// so no two writes are equal. Returns whether it changed the rows.
fn apply(grid: &mut Grid, step: usize, m: &Mutation) -> bool {
    match m {
        Mutation::Edit { row, text } => {
            let Some(key) = grid.display_keys().get(*row).cloned() else {
                return false;
            };
            grid.start_edit_at(&key, "name");
            grid.set_draft(json!(format!("{text}{step}")));
            grid.commit_edit().is_committed()
        }
        Mutation::Insert { first } => {
            let position = if *first { RowPosition::First } else { RowPosition::Last };
            grid.add_row(position, AddRowOptions::default());
            true
        }
        Mutation::Remove { index } => grid
            .remove_row(RowPosition::Index, RemoveRowOptions { index: Some(*index) })
            .is_some(),
        Mutation::Paste { row, text } => {
            if *row >= grid.display_len() {
                return false;
            }
            grid.click_cell(*row, 1, ClickModifier::None);
            matches!(grid.paste(&format!("{text}{step}")), Ok(n) if n > 0)
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn keys_are_unique_and_stable(n in 0usize..30, mutations in prop::collection::vec(mutation(), 0..12)) {
        let mut grid = Grid::new(columns(), rows(n), GridOptions::default());
        for (step, m) in mutations.iter().enumerate() {
            apply(&mut grid, step, m);
        }

        let keys: Vec<RowKey> = grid.rows().iter().filter_map(|r| r.key().cloned()).collect();
        prop_assert_eq!(keys.len(), grid.rows().len());
        let mut unique = keys.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), keys.len());

        // replacing with the same rows keeps every key
        let same = grid.rows().to_vec();
        grid.replace_rows(same);
        let after: Vec<RowKey> = grid.rows().iter().filter_map(|r| r.key().cloned()).collect();
        prop_assert_eq!(after, keys);
    }

    #[test]
    fn undo_redo_round_trip(mutations in prop::collection::vec(mutation(), 1..25)) {
        let mut grid = Grid::new(columns(), rows(6), GridOptions::default());
        let mut applied = 0usize;
        for (step, m) in mutations.iter().enumerate() {
            if apply(&mut grid, step, m) {
                applied += 1;
            }
        }
        let depth = applied.min(20);
        let latest = grid.rows().to_vec();

        let mut undone = 0;
        while grid.undo() {
            undone += 1;
        }
        prop_assert_eq!(undone, depth);
        prop_assert!(!grid.can_undo());

        for _ in 0..undone {
            prop_assert!(grid.redo());
        }
        prop_assert!(!grid.redo());
        prop_assert_eq!(grid.rows(), latest.as_slice());
    }

    #[test]
    fn pages_partition_the_rows(total in 0usize..200, size in 1usize..40) {
        let options = GridOptions {
            pagination: PaginationOptions {
                mode: PaginationMode::Page,
                default_page_size: size,
                ..PaginationOptions::default()
            },
            ..GridOptions::default()
        };
        let mut grid = Grid::new(columns(), rows(total), options);
        let info = grid.page_info();
        prop_assert_eq!(info.page_count, total.div_ceil(size).max(1));

        let mut seen = Vec::new();
        for page in 1..=info.page_count {
            grid.goto_page(page);
            prop_assert_eq!(grid.page_info().current_page, page);
            prop_assert!(grid.display_len() <= size);
            seen.extend(grid.display_keys().iter().cloned());
        }
        let all: Vec<RowKey> = grid.rows().iter().filter_map(|r| r.key().cloned()).collect();
        prop_assert_eq!(seen, all);
    }

    #[test]
    fn out_of_range_page_clamps(total in 1usize..100, request in 0usize..50) {
        let options = GridOptions {
            pagination: PaginationOptions {
                mode: PaginationMode::Page,
                default_page_size: 10,
                ..PaginationOptions::default()
            },
            ..GridOptions::default()
        };
        let mut grid = Grid::new(columns(), rows(total), options);
        grid.goto_page(request);
        let info = grid.page_info();
        prop_assert!(info.current_page >= 1 && info.current_page <= info.page_count);
    }
}
