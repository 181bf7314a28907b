//! Textual SQL dump of a whole database. SQLite's shell has `.dump` but the
//! library does not, so the statements are rebuilt from `sqlite_master` and
//! the row data is rendered by SQLite's own `quote()` function to keep every
//! storage class (including blobs and reals) faithful on replay.

use std::fs;
use std::path::Path;

use rusqlite::Connection;
use tracing::info;

use super::{DbError, DbResult};

const SEQUENCE_TABLE: &str = "sqlite_sequence";
const STAT_TABLE: &str = "sqlite_stat1";

/// Produce a script that recreates the schema and data of `conn`.
///
/// Tables come out in catalog order so replaying the dump reproduces the
/// table list as SQLite reports it. `sqlite_sequence` is written after every
/// user table exists because SQLite only creates it alongside the first
/// `AUTOINCREMENT` table. Indexes, triggers and views follow the data.
pub fn dump(conn: &Connection) -> DbResult<String> {
    let mut lines = vec!["BEGIN TRANSACTION;".to_string()];
    let mut has_sequence = false;
    let mut has_stats = false;

    let tables = catalog_entries(conn, "type = 'table'")?;
    for (name, sql) in &tables {
        if name == SEQUENCE_TABLE {
            has_sequence = true;
            continue;
        }
        if name == STAT_TABLE {
            has_stats = true;
            continue;
        }
        if name.starts_with("sqlite_") {
            continue;
        }
        lines.push(format!("{sql};"));
        lines.extend(insert_statements(conn, name)?);
    }

    if has_sequence {
        lines.push(format!("DELETE FROM \"{SEQUENCE_TABLE}\";"));
        lines.extend(insert_statements(conn, SEQUENCE_TABLE)?);
    }
    if has_stats {
        lines.push("ANALYZE \"sqlite_master\";".to_string());
    }

    for (_, sql) in catalog_entries(conn, "type IN ('index', 'trigger', 'view')")? {
        lines.push(format!("{sql};"));
    }

    lines.push("COMMIT;".to_string());
    Ok(lines.join("\n"))
}

/// Write [`dump`] to `path` as UTF-8 text.
pub fn write_dump(conn: &Connection, path: &Path) -> DbResult<()> {
    let text = dump(conn)?;
    fs::write(path, text.as_bytes()).map_err(|err| DbError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    info!(path = %path.display(), bytes = text.len(), "dump exported");
    Ok(())
}

/// `(name, sql)` pairs from the catalog matching `filter`, skipping the
/// entries SQLite creates implicitly (they have no SQL text).
fn catalog_entries(conn: &Connection, filter: &str) -> DbResult<Vec<(String, String)>> {
    let sql = format!("SELECT name, sql FROM sqlite_master WHERE sql NOT NULL AND {filter}");
    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// One `INSERT` statement per row of `table`, values rendered with `quote()`.
fn insert_statements(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let table = escape_identifier(table);

    let mut info = conn.prepare(&format!("PRAGMA table_info(\"{table}\")"))?;
    let columns = info
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    if columns.is_empty() {
        return Ok(Vec::new());
    }

    let rendered = columns
        .iter()
        .map(|column| format!("quote(\"{}\")", escape_identifier(column)))
        .collect::<Vec<_>>()
        .join(" || ',' || ");
    // The prefix is bound so quotes in the table name never meet a string literal.
    let prefix = format!("INSERT INTO \"{table}\" VALUES(");
    let query = format!("SELECT ?1 || {rendered} || ');' FROM \"{table}\"");

    let mut stmt = conn.prepare(&query)?;
    let statements = stmt
        .query_map([prefix], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(statements)
}

/// Double embedded quotes. The dump walks the catalog, which may contain
/// names created by free-form scripts that the identifier allow-list would
/// reject, so it quotes rather than validates.
fn escape_identifier(name: &str) -> String {
    name.replace('"', "\"\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{list_tables, table_rows};
    use tempfile::TempDir;

    fn replay(script: &str) -> Connection {
        let fresh = Connection::open_in_memory().unwrap();
        fresh.execute_batch(script).unwrap();
        fresh
    }

    #[test]
    fn empty_database_dumps_an_empty_transaction() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(dump(&conn).unwrap(), "BEGIN TRANSACTION;\nCOMMIT;");
    }

    #[test]
    fn dump_renders_schema_then_rows() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, score REAL, data BLOB);
             INSERT INTO t VALUES (1, 'it''s', 1.5, x'00FF');
             INSERT INTO t VALUES (2, NULL, NULL, NULL);
             CREATE INDEX t_name ON t (name);",
        )
        .unwrap();

        let text = dump(&conn).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "BEGIN TRANSACTION;",
                "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, score REAL, data BLOB);",
                "INSERT INTO \"t\" VALUES(1,'it''s',1.5,X'00FF');",
                "INSERT INTO \"t\" VALUES(2,NULL,NULL,NULL);",
                "CREATE INDEX t_name ON t (name);",
                "COMMIT;",
            ]
        );
    }

    #[test]
    fn replay_restores_autoincrement_state() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE z (id INTEGER PRIMARY KEY AUTOINCREMENT, v TEXT);
             CREATE TABLE a (v TEXT);
             INSERT INTO z (v) VALUES ('one'), ('two');
             DELETE FROM z WHERE v = 'two';",
        )
        .unwrap();

        let restored = replay(&dump(&conn).unwrap());
        assert_eq!(list_tables(&restored).unwrap(), list_tables(&conn).unwrap());

        restored.execute("INSERT INTO z (v) VALUES ('three')", []).unwrap();
        let ids: Vec<i64> = table_rows(&restored, "z")
            .unwrap()
            .iter()
            .map(|row| row.rowid)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn odd_table_names_are_escaped() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE \"we\"\"ird name\" (\"col\"\"1\" TEXT);
             INSERT INTO \"we\"\"ird name\" VALUES ('v');",
        )
        .unwrap();

        let restored = replay(&dump(&conn).unwrap());
        let value: String = restored
            .query_row("SELECT \"col\"\"1\" FROM \"we\"\"ird name\"", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(value, "v");
    }

    #[test]
    fn apostrophes_in_table_names_survive_the_dump() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE \"it's\" (a TEXT);
             INSERT INTO \"it's\" VALUES ('o''clock');",
        )
        .unwrap();

        let text = dump(&conn).unwrap();
        assert!(text.contains("INSERT INTO \"it's\" VALUES('o''clock');"));

        let restored = replay(&text);
        assert_eq!(list_tables(&restored).unwrap(), ["it's"]);
        let value: String = restored
            .query_row("SELECT a FROM \"it's\"", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, "o'clock");
    }

    #[test]
    fn write_dump_reports_unwritable_paths() {
        let conn = Connection::open_in_memory().unwrap();
        let dir = TempDir::new().unwrap();

        let target = dir.path().join("out.sql");
        write_dump(&conn, &target).unwrap();
        assert!(fs::read_to_string(&target).unwrap().starts_with("BEGIN TRANSACTION;"));

        let missing = dir.path().join("no/such/dir/out.sql");
        assert!(matches!(
            write_dump(&conn, &missing),
            Err(DbError::Io { .. })
        ));
    }
}
