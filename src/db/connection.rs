use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use tracing::{info, warn};

use super::{dump, rows, script, tables, DbError, DbResult};
use crate::models::{Column, Row, TableSpec, Value};

/// Owner of the single live connection. Every operation borrows the
/// connection for one statement (or one script) and returns; opening another
/// file closes the current one first so at most one handle is ever alive.
#[derive(Default)]
pub struct DbManager {
    conn: Option<Connection>,
    path: Option<PathBuf>,
}

impl DbManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or reuse) the database file at `path` and make it current.
    pub fn create(&mut self, path: &Path) -> DbResult<()> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        self.replace(path, flags)?;
        info!(path = %path.display(), "database created");
        Ok(())
    }

    /// Open an existing database file. A missing file is an error instead of
    /// silently creating an empty database.
    pub fn open(&mut self, path: &Path) -> DbResult<()> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        self.replace(path, flags)?;
        info!(path = %path.display(), "database opened");
        Ok(())
    }

    /// Release the current connection, if any.
    pub fn close(&mut self) -> DbResult<()> {
        self.path = None;
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, err)| DbError::from(err))?;
            info!("database closed");
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Path of the file behind the current connection.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Borrow the live connection or fail with [`DbError::NotConnected`].
    pub fn connection(&self) -> DbResult<&Connection> {
        self.conn.as_ref().ok_or(DbError::NotConnected)
    }

    /// Table names, or an empty list when nothing is open.
    pub fn list_tables(&self) -> DbResult<Vec<String>> {
        match &self.conn {
            Some(conn) => tables::list_tables(conn),
            None => Ok(Vec::new()),
        }
    }

    pub fn table_columns(&self, table: &str) -> DbResult<Vec<Column>> {
        tables::table_columns(self.connection()?, table)
    }

    pub fn table_rows(&self, table: &str) -> DbResult<Vec<Row>> {
        rows::table_rows(self.connection()?, table)
    }

    pub fn create_table(&self, spec: &TableSpec) -> DbResult<()> {
        tables::create_table(self.connection()?, spec)
    }

    pub fn drop_table(&self, table: &str) -> DbResult<()> {
        tables::drop_table(self.connection()?, table)
    }

    pub fn insert_row(&self, table: &str, columns: &[String], values: &[Value]) -> DbResult<i64> {
        rows::insert_row(self.connection()?, table, columns, values)
    }

    pub fn update_row(
        &self,
        table: &str,
        columns: &[String],
        values: &[Value],
        rowid: i64,
    ) -> DbResult<usize> {
        rows::update_row(self.connection()?, table, columns, values, rowid)
    }

    pub fn delete_row(&self, table: &str, rowid: i64) -> DbResult<usize> {
        rows::delete_row(self.connection()?, table, rowid)
    }

    pub fn execute_script(&self, text: &str) -> DbResult<()> {
        script::execute_script(self.connection()?, text)
    }

    pub fn dump(&self) -> DbResult<String> {
        dump::dump(self.connection()?)
    }

    pub fn export_dump(&self, path: &Path) -> DbResult<()> {
        dump::write_dump(self.connection()?, path)
    }

    /// Close the previous handle, then open `path` with `flags` and probe the
    /// catalog so unreadable or non-database files fail here rather than on
    /// the first query.
    fn replace(&mut self, path: &Path, flags: OpenFlags) -> DbResult<()> {
        if let Err(err) = self.close() {
            warn!(error = %err, "previous connection did not close cleanly");
        }

        let io_error = |err: rusqlite::Error| DbError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        };

        let conn = Connection::open_with_flags(path, flags).map_err(io_error)?;
        if let Err(err) = conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        }) {
            warn!(path = %path.display(), error = %err, "rejected database file");
            return Err(io_error(err));
        }

        self.conn = Some(conn);
        self.path = Some(path.to_path_buf());
        Ok(())
    }
}
