//! Plain data types shared by the persistence layer and the TUI. Nothing in
//! here talks to SQLite directly; the structs only mirror what the catalog
//! and the row queries hand back so the screens can render them.

use std::fmt;

pub use rusqlite::types::Value;

/// One entry of `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Zero-based position inside the table definition.
    pub position: i64,
    pub name: String,
    /// Declared type exactly as written in the schema. Empty when the column
    /// was declared without a type.
    pub declared_type: String,
    pub not_null: bool,
    /// Default expression as SQL text, if any.
    pub default_value: Option<String>,
    pub primary_key: bool,
}

impl Column {
    /// Upper-cased declared type with the TEXT fallback the row editor uses
    /// for untyped columns.
    pub fn type_label(&self) -> String {
        let trimmed = self.declared_type.trim();
        if trimmed.is_empty() {
            "TEXT".to_string()
        } else {
            trimmed.to_uppercase()
        }
    }
}

/// A table row keyed by the engine-assigned rowid. `values` follows the
/// column order of the table definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub rowid: i64,
    pub values: Vec<Value>,
}

/// Column types offered by the table builder.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ColumnType {
    #[default]
    Integer,
    Text,
    Real,
    Blob,
}

impl ColumnType {
    pub const ALL: [ColumnType; 4] = [
        ColumnType::Integer,
        ColumnType::Text,
        ColumnType::Real,
        ColumnType::Blob,
    ];

    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
            ColumnType::Real => "REAL",
            ColumnType::Blob => "BLOB",
        }
    }

    /// Cycle forward through [`ColumnType::ALL`].
    pub fn next(self) -> Self {
        match self {
            ColumnType::Integer => ColumnType::Text,
            ColumnType::Text => ColumnType::Real,
            ColumnType::Real => ColumnType::Blob,
            ColumnType::Blob => ColumnType::Integer,
        }
    }

    /// Cycle backward through [`ColumnType::ALL`].
    pub fn previous(self) -> Self {
        match self {
            ColumnType::Integer => ColumnType::Blob,
            ColumnType::Text => ColumnType::Integer,
            ColumnType::Real => ColumnType::Text,
            ColumnType::Blob => ColumnType::Real,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Column definition collected by the table builder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnType,
    pub primary_key: bool,
    pub not_null: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
            primary_key: false,
            not_null: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }
}

/// Everything needed to issue a `CREATE TABLE` without writing SQL.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

/// Render a dynamic value for a grid cell or a pre-filled form field. NULL
/// renders as an empty string, which is also what the row editor reads back
/// as NULL for nullable columns.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(v) => v.to_string(),
        Value::Real(v) => v.to_string(),
        Value::Text(v) => v.clone(),
        Value::Blob(bytes) => {
            let mut out = String::with_capacity(bytes.len() * 2 + 3);
            out.push_str("x'");
            for byte in bytes {
                out.push_str(&format!("{byte:02X}"));
            }
            out.push('\'');
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_label_defaults_to_text() {
        let column = Column {
            position: 0,
            name: "note".into(),
            declared_type: String::new(),
            not_null: false,
            default_value: None,
            primary_key: false,
        };
        assert_eq!(column.type_label(), "TEXT");

        let typed = Column {
            declared_type: "integer".into(),
            ..column
        };
        assert_eq!(typed.type_label(), "INTEGER");
    }

    #[test]
    fn column_type_cycles_in_both_directions() {
        let mut kind = ColumnType::Integer;
        for _ in 0..ColumnType::ALL.len() {
            kind = kind.next();
        }
        assert_eq!(kind, ColumnType::Integer);
        assert_eq!(ColumnType::Integer.previous(), ColumnType::Blob);
        assert_eq!(ColumnType::Blob.next().previous(), ColumnType::Blob);
    }

    #[test]
    fn display_value_formats_each_storage_class() {
        assert_eq!(display_value(&Value::Null), "");
        assert_eq!(display_value(&Value::Integer(42)), "42");
        assert_eq!(display_value(&Value::Real(1.5)), "1.5");
        assert_eq!(display_value(&Value::Text("abc".into())), "abc");
        assert_eq!(display_value(&Value::Blob(vec![0x0a, 0xff])), "x'0AFF'");
    }
}
