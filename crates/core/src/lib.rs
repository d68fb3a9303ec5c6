//! Core types shared by the grid engine and its callers: row identity,
//! cell coordinates and the selection model.

pub mod coord;
pub mod selection;

pub use coord::{CellCoord, RowKey};
pub use selection::{ClickModifier, GridAxes, SelectionController, SelectionRect};
