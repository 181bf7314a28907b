//! Persistence module split across logical submodules.

mod connection;
mod dump;
mod rows;
mod script;
mod tables;

use std::path::PathBuf;

use thiserror::Error;

pub use connection::DbManager;
pub use dump::{dump, write_dump};
pub use rows::{delete_row, insert_row, table_rows, update_row};
pub use script::execute_script;
pub use tables::{
    create_table, drop_table, list_tables, quote_identifier, table_columns, validate_identifier,
};

/// Failures surfaced by the access layer and the row editor.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("No database is open.")]
    NotConnected,

    #[error("{}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("{0}")]
    Sql(String),

    #[error("{0}")]
    Validation(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        DbError::Sql(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
