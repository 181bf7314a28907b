use rusqlite::Connection;
use tracing::{debug, info};

use super::{DbError, DbResult};
use crate::models::{Column, TableSpec};

/// Table names straight from the catalog, in the order SQLite stores them.
pub fn list_tables(conn: &Connection) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

/// Column descriptors for `table`, ordered as declared.
pub fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<Column>> {
    let sql = format!("PRAGMA table_info({})", quote_identifier(table)?);
    let mut stmt = conn.prepare(&sql)?;
    let columns = stmt
        .query_map([], |row| {
            Ok(Column {
                position: row.get(0)?,
                name: row.get(1)?,
                declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                not_null: row.get::<_, i64>(3)? != 0,
                default_value: row.get(4)?,
                primary_key: row.get::<_, i64>(5)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    // PRAGMA table_info silently returns nothing for unknown tables.
    if columns.is_empty() {
        return Err(DbError::Sql(format!("no such table: {table}")));
    }
    Ok(columns)
}

/// Issue a `CREATE TABLE` built from the structured form. Columns whose name
/// is blank are ignored, matching the builder popup where trailing rows are
/// often left empty.
pub fn create_table(conn: &Connection, spec: &TableSpec) -> DbResult<()> {
    let name = spec.name.trim();
    if name.is_empty() {
        return Err(DbError::Validation("Table name is required.".to_string()));
    }
    let table = quote_identifier(name)?;

    let mut definitions = Vec::with_capacity(spec.columns.len());
    for column in &spec.columns {
        let column_name = column.name.trim();
        if column_name.is_empty() {
            continue;
        }
        let mut definition = format!("{} {}", quote_identifier(column_name)?, column.kind);
        if column.primary_key {
            definition.push_str(" PRIMARY KEY");
        }
        if column.not_null {
            definition.push_str(" NOT NULL");
        }
        definitions.push(definition);
    }

    if definitions.is_empty() {
        return Err(DbError::Validation(
            "Add at least one column.".to_string(),
        ));
    }

    let sql = format!("CREATE TABLE {table} ({})", definitions.join(", "));
    debug!(%sql, "creating table");
    conn.execute(&sql, [])?;
    info!(table = name, "table created");
    Ok(())
}

/// Drop `table`. Confirmation happens in the UI before this is called.
pub fn drop_table(conn: &Connection, table: &str) -> DbResult<()> {
    let sql = format!("DROP TABLE {}", quote_identifier(table)?);
    debug!(%sql, "dropping table");
    conn.execute(&sql, [])?;
    info!(table, "table dropped");
    Ok(())
}

/// Accept only identifiers made of letters, digits and underscores that do
/// not start with a digit. Table and column names cannot be bound as
/// parameters, so anything interpolated into SQL must pass this first.
pub fn validate_identifier(name: &str) -> DbResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_alphanumeric() || ch == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(DbError::Sql(format!("invalid identifier: \"{name}\"")))
    }
}

/// Validate `name` and wrap it in double quotes so keywords such as `order`
/// still work as table or column names.
pub fn quote_identifier(name: &str) -> DbResult<String> {
    validate_identifier(name)?;
    Ok(format!("\"{name}\""))
}
