//! # taskboard - local task tracking
//!
//! A command-line task tracker with two ways of looking at the same list:
//! a filterable, sortable, paginated table and a board that groups tasks into
//! columns by status or by priority. Both are available as plain CLI output
//! and inside an interactive terminal user interface (TUI).
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task
//! taskboard add "Write release notes" --priority high --assignee js
//!
//! # Table view, filtered and sorted
//! taskboard list --status in_progress --sort priority --dir desc
//!
//! # Board grouped by priority
//! taskboard board --group-by priority
//!
//! # Move a card to another column
//! taskboard move 3 completed
//!
//! # Interactive interface
//! taskboard ui
//! ```
//!
//! Data is stored in `~/.taskboard/task-store.json` unless `--db` or
//! `TASKBOARD_HOME` point somewhere else. Set `RUST_LOG` (or pass `-v`) for
//! diagnostics on stderr.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod cli;
pub mod cmd;
pub mod config;
pub mod editor;
pub mod engine;
pub mod error;
pub mod fields;
pub mod ids;
pub mod store;
pub mod task;
pub mod users;
pub mod views;
pub mod tui {
    pub mod app;
    pub mod board;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod run;
    pub mod table;
    pub mod task_form;
    pub mod utils;
}

use cli::Cli;
use cmd::Commands;
use config::Config;
use error::Error;
use store::TaskStore;

fn init_tracing(default_filter: &str) {
    // Ignore invalid or oversized RUST_LOG values rather than failing startup.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn report(err: &Error) {
    match err {
        Error::Validation(errors) => {
            eprintln!("Error: task is invalid");
            for e in errors.iter() {
                eprintln!("  {}: {}", e.field, e.message);
            }
        }
        other => eprintln!("Error: {}", other),
    }
}

fn main() {
    let cli = Cli::parse();
    let config = Config::resolve(cli.db.clone(), cli.verbose);

    // Log lines would tear the alternate screen, so the TUI stays quiet unless asked.
    let default_filter = match cli.command {
        Commands::Ui { .. } if !cli.verbose => "off",
        _ => config.log_filter.as_str(),
    };
    init_tracing(default_filter);

    if let Commands::Completions { shell } = cli.command {
        cmd::cmd_completions(shell);
        return;
    }

    if let Err(e) = config.ensure_data_dir() {
        eprintln!(
            "Failed to create data directory {}: {}",
            config.data_dir.display(),
            e
        );
        std::process::exit(1);
    }
    tracing::debug!(path = %config.store_path.display(), "opening task store");
    let store = TaskStore::open(config.slot());

    if let Err(e) = cmd::run(cli.command, store) {
        report(&e);
        std::process::exit(1);
    }
}
