// OneGrid CLI - headless grid inspection and command replay

mod exit_codes;
mod input;
mod replay;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use input::GridArgs;

#[derive(Parser)]
#[command(name = "ogrid")]
#[command(about = "Headless editable data grid: view and replay command scripts")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log engine activity to stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print display rows and page info as JSON
    #[command(after_help = "\
Examples:
  ogrid view -c columns.json -r rows.json
  ogrid view -c columns.json -r tree.json --tree
  ogrid view -c columns.json -r rows.json -o grid.toml --page 2 --sort age")]
    View {
        #[command(flatten)]
        grid: GridArgs,

        /// Page to show (page or scroll pagination)
        #[arg(long)]
        page: Option<usize>,

        /// Sort by this field; repeat the flag's value to cycle asc/desc
        #[arg(long, value_name = "FIELD")]
        sort: Vec<String>,
    },

    /// Apply a JSON array of grid commands and print the outcome
    #[command(after_help = "\
Examples:
  ogrid replay -c columns.json -r rows.json -s script.json
  ogrid replay -c columns.json -r rows.json -s script.json --compact")]
    Replay {
        #[command(flatten)]
        grid: GridArgs,

        /// Command script (JSON array)
        #[arg(long, short = 's')]
        script: PathBuf,

        /// Single-line JSON output
        #[arg(long)]
        compact: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_COMMIT_HASH"),
        ")",
        "\nengine:  onegrid-engine ",
        env!("CARGO_PKG_VERSION"),
        "\ntarget:  ",
        env!("TARGET"),
    )
}

/// Logs go to stderr so stdout stays a single JSON document.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "onegrid_engine=debug,ogrid=debug",
        _ => "onegrid_engine=trace,ogrid=trace",
    };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::View { grid, page, sort } => cmd_view(grid, page, sort),
        Commands::Replay { grid, script, compact } => cmd_replay(grid, script, compact),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_ERROR,
            message: msg.into(),
            hint: Some("see `GridOptions` keys: rowHeight, historyLimit, pagination.defaultPageSize".into()),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn print_json(value: &impl Serialize, compact: bool) -> Result<(), CliError> {
    let text = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .map_err(|e| CliError::io(format!("failed to encode output: {}", e)))?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", text).map_err(|e| CliError::io(format!("failed to write output: {}", e)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewReport {
    rows: Vec<onegrid_engine::Record>,
    page_info: onegrid_engine::PageInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<onegrid_engine::SortState>,
}

fn cmd_view(args: GridArgs, page: Option<usize>, sort: Vec<String>) -> Result<(), CliError> {
    let mut grid = input::build_grid(&args)?;

    for field in &sort {
        if !grid.toggle_sort(field) {
            return Err(CliError::usage(format!("cannot sort by '{}'", field))
                .with_hint("the column must exist and be marked \"sortable\": true"));
        }
    }
    if let Some(page) = page {
        let count = grid.page_info().page_count;
        if page == 0 || page > count {
            return Err(CliError::usage(format!("page {} out of range 1..={}", page, count)));
        }
        grid.goto_page(page);
    }

    let report = ViewReport {
        rows: grid.display_rows().iter().map(|r| r.to_export()).collect(),
        page_info: grid.page_info(),
        sort: grid.sort_state().cloned(),
    };
    print_json(&report, false)
}

fn cmd_replay(args: GridArgs, script: PathBuf, compact: bool) -> Result<(), CliError> {
    let grid = input::build_grid(&args)?;
    let commands = replay::load_script(&script)?;
    tracing::info!(commands = commands.len(), "replaying script");
    let report = replay::replay(grid, commands);
    print_json(&report, compact)
}
