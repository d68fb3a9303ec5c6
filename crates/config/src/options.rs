// Grid options
// Passed explicitly at grid construction; loadable from TOML or JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// How rows are split into pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    /// All rows in one page (default)
    #[default]
    None,
    /// Discrete pages with a pager
    Page,
    /// Infinite scroll: pages accumulate as the viewport reaches the bottom
    Scroll,
}

/// Where slicing happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationKind {
    /// The engine slices the full row set
    #[default]
    Client,
    /// The caller supplies one page at a time plus a total count
    Server,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaginationOptions {
    pub mode: PaginationMode,

    #[serde(rename = "type")]
    pub kind: PaginationKind,

    pub default_page_size: usize,

    /// Sizes offered by a page-size picker
    pub page_size_options: Vec<usize>,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            mode: PaginationMode::None,
            kind: PaginationKind::Client,
            default_page_size: 15,
            page_size_options: vec![15, 30, 50, 100],
        }
    }
}

impl PaginationOptions {
    pub fn is_client(&self) -> bool {
        self.kind == PaginationKind::Client
    }
}

/// Grid-level options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridOptions {
    /// Fixed row height in pixels
    pub row_height: f32,

    /// Master switch for inline editing
    pub editable: bool,

    pub show_row_number: bool,

    #[serde(rename = "showCheckBox")]
    pub show_checkbox: bool,

    pub enable_column_reorder: bool,
    pub enable_column_resize: bool,
    pub enable_header_filter: bool,

    /// Undo/redo stack capacity
    pub history_limit: usize,

    /// Extra rows rendered above and below the viewport
    pub overscan: usize,

    pub default_column_width: f32,
    pub min_column_width: f32,

    pub pagination: PaginationOptions,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            // Layout
            row_height: 32.0,
            default_column_width: 100.0,
            min_column_width: 40.0,
            overscan: 5,

            // Features
            editable: true,
            show_row_number: false,
            show_checkbox: false,
            enable_column_reorder: false,
            enable_column_resize: false,
            enable_header_filter: false,

            history_limit: 20,
            pagination: PaginationOptions::default(),
        }
    }
}

impl GridOptions {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let options: GridOptions = toml::from_str(input)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let options: GridOptions = serde_json::from_str(input)?;
        options.validate()?;
        Ok(options)
    }

    /// Load from a `.toml` or `.json` file, chosen by extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_height.is_nan() || self.row_height <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "rowHeight must be positive, got {}",
                self.row_height
            )));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::Validation("historyLimit must be at least 1".into()));
        }
        if self.pagination.default_page_size == 0 {
            return Err(ConfigError::Validation(
                "pagination.defaultPageSize must be at least 1".into(),
            ));
        }
        if self.min_column_width < 0.0 {
            return Err(ConfigError::Validation("minColumnWidth must not be negative".into()));
        }
        Ok(())
    }
}
