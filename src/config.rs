//! Runtime configuration: where the store lives and how much to log.
//!
//! The store file is taken from `--db` (or `TASKBOARD_DB`) when given.
//! Otherwise it is `task-store.json` inside the data directory, which is
//! `TASKBOARD_HOME` when set and `~/.taskboard` otherwise.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::store::{FileSlot, DEFAULT_SLOT_NAME};

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "TASKBOARD_HOME";

/// Data directory name under the user's home.
pub const DIR_NAME: &str = ".taskboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub store_path: PathBuf,
    /// Default `tracing` filter when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Config {
    /// Resolve configuration from CLI arguments and the environment.
    pub fn resolve(db: Option<PathBuf>, verbose: bool) -> Self {
        Self::from_parts(
            db,
            std::env::var_os(HOME_ENV).map(PathBuf::from),
            std::env::var_os("HOME").map(PathBuf::from),
            verbose,
        )
    }

    fn from_parts(
        db: Option<PathBuf>,
        home_override: Option<PathBuf>,
        home: Option<PathBuf>,
        verbose: bool,
    ) -> Self {
        let log_filter = if verbose { "taskboard=debug" } else { "warn" }.to_string();
        match db {
            Some(store_path) => {
                let data_dir = store_path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."))
                    .to_path_buf();
                Config {
                    data_dir,
                    store_path,
                    log_filter,
                }
            }
            None => {
                let data_dir = home_override
                    .unwrap_or_else(|| home.unwrap_or_else(|| PathBuf::from(".")).join(DIR_NAME));
                let store_path = FileSlot::named(&data_dir, DEFAULT_SLOT_NAME).path().to_path_buf();
                Config {
                    data_dir,
                    store_path,
                    log_filter,
                }
            }
        }
    }

    /// Create the data directory if it does not exist yet.
    pub fn ensure_data_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    pub fn slot(&self) -> FileSlot {
        FileSlot::new(self.store_path.clone())
    }
}
