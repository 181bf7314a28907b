//! Command line options and log sink setup. The TUI owns stdout, so logs go
//! to a file under the platform's local data directory.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use tracing_subscriber::{fmt, EnvFilter};

const APP_NAME: &str = "sqlite-db-manager";
const LOG_FILE_NAME: &str = "sqlite-db-manager.log";

/// Terminal browser and editor for SQLite database files.
#[derive(Parser, Debug, Clone)]
#[command(name = "sqlite-db-manager", version, about, long_about = None)]
pub struct Cli {
    /// Database file to open on startup.
    pub database: Option<PathBuf>,

    /// Create the startup database if it does not exist yet.
    #[arg(long, requires = "database")]
    pub create: bool,

    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Write logs here instead of the default data directory.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            file: self.log_file.clone().or_else(default_log_path),
        }
    }
}

/// Where and how verbosely to log.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// `None` disables logging entirely.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Install the global tracing subscriber writing to [`Self::file`].
    pub fn init(&self) -> Result<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("failed to create log directory")?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));
        fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
            .map_err(|err| anyhow!("failed to install log subscriber: {err}"))
    }
}

/// `<local data dir>/sqlite-db-manager.log`, if a home directory exists.
fn default_log_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_local_dir().join(LOG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_database_and_flags() {
        let cli = Cli::parse_from(["sqlite-db-manager", "data.db", "--create", "--log-level", "debug"]);
        assert_eq!(cli.database, Some(PathBuf::from("data.db")));
        assert!(cli.create);
        assert_eq!(cli.logging().level, "debug");
    }

    #[test]
    fn create_requires_a_database() {
        assert!(Cli::try_parse_from(["sqlite-db-manager", "--create"]).is_err());
    }

    #[test]
    fn explicit_log_file_wins() {
        let cli = Cli::parse_from(["sqlite-db-manager", "--log-file", "/tmp/x.log"]);
        assert_eq!(cli.logging().file, Some(PathBuf::from("/tmp/x.log")));
        assert_eq!(cli.logging().level, "info");
    }
}
