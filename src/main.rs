//! Binary entry point: parse the command line, set up file logging, open the
//! startup database if one was given, and drive the Ratatui event loop until
//! the user exits.
use anyhow::Context;
use clap::Parser;
use sqlite_db_manager::config::Cli;
use sqlite_db_manager::{run_app, App, DbManager};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.logging().init()?;

    let mut db = DbManager::new();
    if let Some(path) = &cli.database {
        let opened = if cli.create {
            db.create(path)
        } else {
            db.open(path)
        };
        opened.with_context(|| format!("failed to open {}", path.display()))?;
    }

    let mut app = App::new(db)?;
    let result = run_app(&mut app);
    tracing::info!("session ended");
    result
}
