//! Turn raw form text into the value that gets bound for a column.

use crate::db::{DbError, DbResult};
use crate::models::{Column, Value};

/// Coerce the text typed for `column` according to its declared type.
///
/// The input is trimmed first. Blank input is NULL unless the column is
/// `NOT NULL`. Columns declared exactly `INTEGER` or `REAL` (any case) must
/// parse as such; every other declared type keeps the text untouched.
pub fn coerce_input(column: &Column, raw: &str) -> DbResult<Value> {
    let text = raw.trim();
    if text.is_empty() {
        if column.not_null {
            return Err(DbError::Validation(format!(
                "Field '{}' is required.",
                column.name
            )));
        }
        return Ok(Value::Null);
    }

    match column.type_label().as_str() {
        "INTEGER" => text.parse::<i64>().map(Value::Integer).map_err(|_| {
            DbError::Validation(format!("Field '{}' must be an integer.", column.name))
        }),
        "REAL" => text.parse::<f64>().map(Value::Real).map_err(|_| {
            DbError::Validation(format!(
                "Field '{}' must be a floating-point number.",
                column.name
            ))
        }),
        _ => Ok(Value::Text(text.to_string())),
    }
}

/// Coerce a whole form, stopping at the first field that fails.
pub fn coerce_row(columns: &[Column], inputs: &[String]) -> DbResult<Vec<Value>> {
    columns
        .iter()
        .zip(inputs)
        .map(|(column, raw)| coerce_input(column, raw))
        .collect()
}
