//! Core library surface for the SQLite DB Manager TUI.
//!
//! The persistence layer (`db`), the form coercion rules and the data types
//! are usable without the terminal front-end; the binary only wires them to
//! the Ratatui event loop.
pub mod coercion;
pub mod config;
pub mod db;
pub mod models;
pub mod ui;

/// Persistence entry points.
pub use db::{DbError, DbManager, DbResult};

/// Types passed between the database layer and the screens.
pub use models::{Column, ColumnSpec, ColumnType, Row, TableSpec, Value};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
