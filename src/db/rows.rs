use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use super::tables::quote_identifier;
use super::{DbError, DbResult};
use crate::models::{Row, Value};

/// Load every row of `table` along with its rowid. There is no paging; the
/// grid always shows the full table.
pub fn table_rows(conn: &Connection, table: &str) -> DbResult<Vec<Row>> {
    let sql = format!("SELECT rowid, * FROM {}", quote_identifier(table)?);
    let mut stmt = conn.prepare(&sql)?;
    let width = stmt.column_count();

    let rows = stmt
        .query_map([], |row| {
            let mut values = Vec::with_capacity(width.saturating_sub(1));
            for idx in 1..width {
                values.push(row.get::<_, Value>(idx)?);
            }
            Ok(Row {
                rowid: row.get(0)?,
                values,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Insert one row, returning the rowid SQLite assigned to it.
pub fn insert_row(
    conn: &Connection,
    table: &str,
    columns: &[String],
    values: &[Value],
) -> DbResult<i64> {
    ensure_same_arity(columns, values)?;
    let table = quote_identifier(table)?;

    let sql = if columns.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES")
    } else {
        let names = columns
            .iter()
            .map(|column| quote_identifier(column))
            .collect::<DbResult<Vec<_>>>()?;
        let placeholders = (1..=values.len())
            .map(|idx| format!("?{idx}"))
            .collect::<Vec<_>>();
        format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            names.join(", "),
            placeholders.join(", ")
        )
    };

    debug!(%sql, "inserting row");
    conn.execute(&sql, params_from_iter(values.iter()))?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite the given columns of the row identified by `rowid`. Returns the
/// number of rows touched, which is zero when the row vanished in between.
pub fn update_row(
    conn: &Connection,
    table: &str,
    columns: &[String],
    values: &[Value],
    rowid: i64,
) -> DbResult<usize> {
    ensure_same_arity(columns, values)?;
    if columns.is_empty() {
        return Err(DbError::Validation("Nothing to update.".to_string()));
    }
    let table = quote_identifier(table)?;

    let assignments = columns
        .iter()
        .enumerate()
        .map(|(idx, column)| Ok(format!("{} = ?{}", quote_identifier(column)?, idx + 1)))
        .collect::<DbResult<Vec<_>>>()?;
    let sql = format!(
        "UPDATE {table} SET {} WHERE rowid = ?{}",
        assignments.join(", "),
        values.len() + 1
    );

    let mut bound: Vec<Value> = values.to_vec();
    bound.push(Value::Integer(rowid));

    debug!(%sql, rowid, "updating row");
    let updated = conn.execute(&sql, params_from_iter(bound.iter()))?;
    Ok(updated)
}

/// Delete the row identified by `rowid`, returning how many rows went away.
pub fn delete_row(conn: &Connection, table: &str, rowid: i64) -> DbResult<usize> {
    let sql = format!("DELETE FROM {} WHERE rowid = ?1", quote_identifier(table)?);
    debug!(%sql, rowid, "deleting row");
    let deleted = conn.execute(&sql, [rowid])?;
    Ok(deleted)
}

fn ensure_same_arity(columns: &[String], values: &[Value]) -> DbResult<()> {
    if columns.len() == values.len() {
        Ok(())
    } else {
        Err(DbError::Validation(format!(
            "{} columns but {} values supplied.",
            columns.len(),
            values.len()
        )))
    }
}
