use std::collections::BTreeSet;

use sqlite_db_manager::coercion::coerce_input;
use sqlite_db_manager::{Column, ColumnSpec, ColumnType, DbError, DbManager, TableSpec, Value};
use tempfile::TempDir;

fn fresh(dir: &TempDir, name: &str) -> DbManager {
    let mut db = DbManager::new();
    db.create(&dir.path().join(name)).unwrap();
    db
}

fn people_spec() -> TableSpec {
    TableSpec {
        name: "people".into(),
        columns: vec![
            ColumnSpec::new("id", ColumnType::Integer).primary_key(),
            ColumnSpec::new("name", ColumnType::Text),
        ],
    }
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn created_table_is_listed_once() {
    let dir = TempDir::new().unwrap();
    let db = fresh(&dir, "a.db");
    db.create_table(&people_spec()).unwrap();

    let tables = db.list_tables().unwrap();
    assert_eq!(tables.iter().filter(|name| *name == "people").count(), 1);
}

#[test]
fn insert_update_delete_by_rowid() {
    let dir = TempDir::new().unwrap();
    let db = fresh(&dir, "a.db");
    db.create_table(&people_spec()).unwrap();
    let cols = columns(&["id", "name"]);

    db.insert_row("people", &cols, &[Value::Integer(1), Value::Text("a".into())])
        .unwrap();
    let rows = db.table_rows("people").unwrap();
    assert_eq!(rows[0].values, vec![Value::Integer(1), Value::Text("a".into())]);
    let rowid = rows[0].rowid;

    db.update_row("people", &cols, &[Value::Integer(1), Value::Text("b".into())], rowid)
        .unwrap();
    let rows = db.table_rows("people").unwrap();
    assert_eq!(rows[0].rowid, rowid);
    assert_eq!(rows[0].values, vec![Value::Integer(1), Value::Text("b".into())]);

    for (id, name) in [(2, "c"), (3, "d")] {
        db.insert_row("people", &cols, &[Value::Integer(id), Value::Text(name.into())])
            .unwrap();
    }
    let before = db.table_rows("people").unwrap();
    assert_eq!(db.delete_row("people", before[1].rowid).unwrap(), 1);
    let after = db.table_rows("people").unwrap();
    assert_eq!(after.len(), before.len() - 1);
    assert_eq!(
        after.iter().map(|row| row.rowid).collect::<Vec<_>>(),
        vec![before[0].rowid, before[2].rowid]
    );
}

#[test]
fn not_null_integer_coercion() {
    let column = Column {
        position: 0,
        name: "qty".into(),
        declared_type: "INTEGER".into(),
        not_null: true,
        default_value: None,
        primary_key: false,
    };
    assert!(matches!(coerce_input(&column, ""), Err(DbError::Validation(_))));
    assert_eq!(coerce_input(&column, "12").unwrap(), Value::Integer(12));
    assert!(matches!(coerce_input(&column, "x"), Err(DbError::Validation(_))));
}

#[test]
fn dump_replays_into_an_identical_database() {
    let dir = TempDir::new().unwrap();
    let source = fresh(&dir, "source.db");
    source
        .execute_script(
            "CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL);
             CREATE TABLE logs (id INTEGER PRIMARY KEY AUTOINCREMENT, body BLOB);
             CREATE TABLE tags (label TEXT UNIQUE);
             INSERT INTO people VALUES (1, 'ada', 9.5), (2, 'it''s', NULL);
             INSERT INTO logs (body) VALUES (x'DEADBEEF'), (NULL);
             INSERT INTO tags VALUES ('x'), ('y');
             CREATE VIEW named AS SELECT name FROM people;",
        )
        .unwrap();

    let dump_path = dir.path().join("source.sql");
    source.export_dump(&dump_path).unwrap();
    let script = std::fs::read_to_string(&dump_path).unwrap();

    let replica = fresh(&dir, "replica.db");
    replica.execute_script(&script).unwrap();

    let tables = source.list_tables().unwrap();
    assert_eq!(replica.list_tables().unwrap(), tables);

    for table in &tables {
        let source_columns = source.table_columns(table).unwrap();
        let replica_columns = replica.table_columns(table).unwrap();
        assert_eq!(replica_columns, source_columns, "columns of {table}");

        let render = |db: &DbManager| {
            db.table_rows(table)
                .unwrap()
                .into_iter()
                .map(|row| format!("{:?}", row.values))
                .collect::<BTreeSet<_>>()
        };
        assert_eq!(render(&replica), render(&source), "rows of {table}");
    }
}

#[test]
fn reopening_replaces_the_connection() {
    let dir = TempDir::new().unwrap();
    let mut db = fresh(&dir, "one.db");
    db.create_table(&people_spec()).unwrap();

    db.create(&dir.path().join("two.db")).unwrap();
    assert!(db.list_tables().unwrap().is_empty());

    db.open(&dir.path().join("one.db")).unwrap();
    assert_eq!(db.list_tables().unwrap(), ["people"]);
}
