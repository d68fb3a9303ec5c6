pub mod clipboard;
pub mod column;
pub mod command;
pub mod edit;
pub mod error;
pub mod events;
pub mod format;
pub mod grid;
pub mod history;
pub mod layout;
pub mod lifecycle;
pub mod row;
pub mod tree;
pub mod validation;
pub mod value;
pub mod view;
pub mod window;

#[cfg(test)]
pub mod harness;

pub use column::{Column, ColumnModel, EditorConfig, EditorKind, ValueOption};
pub use command::{CommandOutcome, GridCommand, Key, KeyInput};
pub use edit::CommitOutcome;
pub use error::{GridError, Result};
pub use events::{ChangeReason, GridEvent};
pub use grid::{AddRowOptions, Grid, RemoveRowOptions, RowPosition};
pub use row::{Record, Row, RowStatus};
pub use tree::{DropMode, TreeConfig, TreeNode};
pub use view::{PageInfo, SortDirection, SortState};

pub use onegrid_config::GridOptions;
pub use onegrid_core::{CellCoord, ClickModifier, RowKey};
