// Loading columns, rows and options from disk

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use onegrid_config::GridOptions;
use onegrid_engine::{Column, Grid, Row, TreeConfig, TreeNode};
use serde_json::Value;

use crate::CliError;

/// Inputs shared by every subcommand that builds a grid.
#[derive(Args, Debug, Clone)]
pub struct GridArgs {
    /// Column definitions (JSON array)
    #[arg(long, short = 'c')]
    pub columns: PathBuf,

    /// Row data (JSON array of objects, or tree nodes with --tree)
    #[arg(long, short = 'r')]
    pub rows: PathBuf,

    /// Grid options (.toml or .json)
    #[arg(long, short = 'o', env = "OGRID_OPTIONS")]
    pub options: Option<PathBuf>,

    /// Treat rows as nested `{ id, children }` nodes
    #[arg(long)]
    pub tree: bool,
}

pub fn read_json(path: &Path) -> Result<Value, CliError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text).map_err(|e| CliError::parse(format!("{}: {}", path.display(), e)))
}

pub fn load_columns(path: &Path) -> Result<Vec<Column>, CliError> {
    let value = read_json(path)?;
    serde_json::from_value(value)
        .map_err(|e| CliError::parse(format!("{}: invalid columns: {}", path.display(), e)))
}

pub fn load_rows(path: &Path) -> Result<Vec<Row>, CliError> {
    match read_json(path)? {
        Value::Array(items) => Ok(items.into_iter().map(Row::from_value).collect()),
        _ => Err(CliError::parse(format!("{}: rows must be a JSON array", path.display()))),
    }
}

pub fn load_tree(path: &Path) -> Result<Vec<TreeNode>, CliError> {
    let value = read_json(path)?;
    TreeNode::list_from_json(&value, &TreeConfig::default())
        .map_err(|e| CliError::parse(format!("{}: {}", path.display(), e)))
}

pub fn load_options(path: Option<&Path>) -> Result<GridOptions, CliError> {
    match path {
        Some(path) => GridOptions::load(path).map_err(|e| CliError::config(e.to_string())),
        None => Ok(GridOptions::default()),
    }
}

pub fn build_grid(args: &GridArgs) -> Result<Grid, CliError> {
    let options = load_options(args.options.as_deref())?;
    let columns = load_columns(&args.columns)?;
    let grid = if args.tree {
        let nodes = load_tree(&args.rows)?;
        Grid::with_tree(columns, &nodes, options)
    } else {
        Grid::new(columns, load_rows(&args.rows)?, options)
    };
    tracing::debug!(?grid, "grid loaded");
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_rows_requires_array() {
        let file = write_temp(".json", r#"{"id": 1}"#);
        let err = load_rows(file.path()).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_ERROR);
        assert!(err.message.contains("JSON array"));
    }

    #[test]
    fn test_load_columns() {
        let file = write_temp(".json", r#"[{"field": "name", "headerName": "Name", "sortable": true}]"#);
        let columns = load_columns(file.path()).unwrap();
        assert_eq!(columns[0].header, "Name");
        assert!(columns[0].sortable);
    }

    #[test]
    fn test_load_options_rejects_bad_value() {
        let file = write_temp(".toml", "rowHeight = 0.0\n");
        assert!(load_options(Some(file.path())).is_err());
        assert_eq!(load_options(None).unwrap(), GridOptions::default());
    }
}
