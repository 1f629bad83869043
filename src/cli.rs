use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Local task tracker with a table view and a status/priority board.
/// Storage defaults to ~/.taskboard/task-store.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "taskboard", version, about = "Task tracking with table and board views")]
pub struct Cli {
    /// Path to the JSON store file.
    #[arg(long, global = true, env = "TASKBOARD_DB")]
    pub db: Option<PathBuf>,

    /// Log diagnostics to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
