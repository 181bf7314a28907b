use std::cmp::min;

use anyhow::Result;

use crate::db::DbManager;
use crate::models::{Column, Row};

/// Table list shown on the main screen, plus the output pane of the script
/// box next to it.
#[derive(Default)]
pub(crate) struct TablesScreen {
    pub(crate) tables: Vec<String>,
    pub(crate) selected: usize,
    pub(crate) output: String,
}

impl TablesScreen {
    /// Replace the list, keeping the selection on `focus` when it is still
    /// present and clamping it otherwise.
    pub(crate) fn set_tables(&mut self, tables: Vec<String>, focus: Option<&str>) {
        self.tables = tables;
        if let Some(name) = focus {
            if let Some(idx) = self.tables.iter().position(|table| table == name) {
                self.selected = idx;
                return;
            }
        }
        if self.selected >= self.tables.len() {
            self.selected = self.tables.len().saturating_sub(1);
        }
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = step(self.selected, offset, self.tables.len());
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.tables.len().saturating_sub(1);
    }

    pub(crate) fn current_table(&self) -> Option<&str> {
        self.tables.get(self.selected).map(String::as_str)
    }
}

/// Rows of one table. Reloaded from the database after every change.
pub(crate) struct TableViewScreen {
    pub(crate) table: String,
    pub(crate) columns: Vec<Column>,
    pub(crate) rows: Vec<Row>,
    pub(crate) selected: usize,
}

impl TableViewScreen {
    pub(crate) fn load(db: &DbManager, table: &str) -> Result<Self> {
        let columns = db.table_columns(table)?;
        let rows = db.table_rows(table)?;
        Ok(Self {
            table: table.to_string(),
            columns,
            rows,
            selected: 0,
        })
    }

    /// Re-query the rows, keeping the cursor on `focus_rowid` when given.
    pub(crate) fn reload(&mut self, db: &DbManager, focus_rowid: Option<i64>) -> Result<()> {
        self.columns = db.table_columns(&self.table)?;
        self.rows = db.table_rows(&self.table)?;

        if let Some(rowid) = focus_rowid {
            if let Some(idx) = self.rows.iter().position(|row| row.rowid == rowid) {
                self.selected = idx;
                return Ok(());
            }
        }
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
        Ok(())
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = step(self.selected, offset, self.rows.len());
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
    }

    pub(crate) fn current_row(&self) -> Option<&Row> {
        self.rows.get(self.selected)
    }

    /// `RowID` followed by the column names.
    pub(crate) fn headers(&self) -> Vec<String> {
        let mut headers = Vec::with_capacity(self.columns.len() + 1);
        headers.push("RowID".to_string());
        headers.extend(self.columns.iter().map(|column| column.name.clone()));
        headers
    }
}

/// Read-only view of a generated dump before it is saved.
pub(crate) struct DumpPreview {
    pub(crate) text: String,
    pub(crate) scroll: u16,
}

impl DumpPreview {
    pub(crate) fn new(text: String) -> Self {
        Self { text, scroll: 0 }
    }

    pub(crate) fn scroll_by(&mut self, offset: isize) {
        let max = self.text.lines().count().saturating_sub(1);
        let next = (self.scroll as isize + offset).clamp(0, max as isize);
        self.scroll = min(next as usize, u16::MAX as usize) as u16;
    }
}

/// Move `current` by `offset` within `0..len`, clamping at both ends.
fn step(current: usize, offset: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let target = current as isize + offset;
    target.clamp(0, len as isize - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_selection_follows_focus_and_clamps() {
        let mut screen = TablesScreen::default();
        screen.set_tables(vec!["a".into(), "b".into(), "c".into()], Some("c"));
        assert_eq!(screen.current_table(), Some("c"));

        screen.move_selection(5);
        assert_eq!(screen.selected, 2);
        screen.move_selection(-10);
        assert_eq!(screen.selected, 0);

        screen.select_last();
        screen.set_tables(vec!["a".into()], Some("gone"));
        assert_eq!(screen.current_table(), Some("a"));

        screen.set_tables(Vec::new(), None);
        assert_eq!(screen.current_table(), None);
        screen.move_selection(1);
        assert_eq!(screen.selected, 0);
    }

    #[test]
    fn dump_preview_scroll_is_bounded() {
        let mut preview = DumpPreview::new("a\nb\nc".into());
        preview.scroll_by(10);
        assert_eq!(preview.scroll, 2);
        preview.scroll_by(-1);
        assert_eq!(preview.scroll, 1);
        preview.scroll_by(-5);
        assert_eq!(preview.scroll, 0);
    }
}
