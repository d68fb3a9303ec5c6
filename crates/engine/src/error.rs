use onegrid_core::RowKey;
use thiserror::Error;

/// Errors from the fallible parts of the engine.
///
/// Clicks, keys and edits report through outcome enums instead. Paste and
/// tree drops return these and leave state untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("unknown row key: {0}")]
    UnknownRow(RowKey),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("malformed clipboard payload: {0}")]
    MalformedClipboard(String),

    #[error("invalid tree node: {0}")]
    InvalidTreeNode(String),

    #[error("invalid drop: {0}")]
    InvalidDrop(String),
}

pub type Result<T> = std::result::Result<T, GridError>;
