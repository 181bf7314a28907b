use std::path::PathBuf;

use anyhow::{anyhow, Result};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::coercion::coerce_row;
use crate::models::{display_value, Column, ColumnSpec, ColumnType, Row, TableSpec, Value};

/// Which file action a path prompt feeds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum PathAction {
    NewDatabase,
    OpenDatabase,
    ExportDump,
}

impl PathAction {
    pub(crate) fn title(&self) -> &'static str {
        match self {
            PathAction::NewDatabase => "New Database",
            PathAction::OpenDatabase => "Open Database",
            PathAction::ExportDump => "Save SQL Dump",
        }
    }
}

/// Single-line popup asking for a file path.
#[derive(Clone, Debug)]
pub(crate) struct PathPrompt {
    pub(crate) action: PathAction,
    pub(crate) input: String,
    pub(crate) error: Option<String>,
}

impl PathPrompt {
    pub(crate) fn new(action: PathAction, initial: Option<String>) -> Self {
        Self {
            action,
            input: initial.unwrap_or_default(),
            error: None,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.input.push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.input.pop();
    }

    pub(crate) fn parse_path(&self) -> Result<PathBuf> {
        let trimmed = self.input.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("A file path is required."));
        }
        Ok(PathBuf::from(trimmed))
    }
}

/// Part of a column row inside the table builder.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ColumnPart {
    Name,
    Type,
    PrimaryKey,
    NotNull,
}

impl ColumnPart {
    fn next(self) -> Option<Self> {
        match self {
            ColumnPart::Name => Some(ColumnPart::Type),
            ColumnPart::Type => Some(ColumnPart::PrimaryKey),
            ColumnPart::PrimaryKey => Some(ColumnPart::NotNull),
            ColumnPart::NotNull => None,
        }
    }

    fn previous(self) -> Option<Self> {
        match self {
            ColumnPart::Name => None,
            ColumnPart::Type => Some(ColumnPart::Name),
            ColumnPart::PrimaryKey => Some(ColumnPart::Type),
            ColumnPart::NotNull => Some(ColumnPart::PrimaryKey),
        }
    }
}

/// Focus position inside the table builder.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum BuilderFocus {
    TableName,
    Column { index: usize, part: ColumnPart },
}

/// State of the "create table" popup: a name plus an editable list of column
/// rows. It starts with one blank column; blank rows are dropped on submit.
#[derive(Clone, Debug)]
pub(crate) struct TableBuilderForm {
    pub(crate) name: String,
    pub(crate) columns: Vec<ColumnSpec>,
    pub(crate) focus: BuilderFocus,
    pub(crate) error: Option<String>,
}

impl Default for TableBuilderForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            columns: vec![ColumnSpec::default()],
            focus: BuilderFocus::TableName,
            error: None,
        }
    }
}

impl TableBuilderForm {
    /// Tab order: table name, then each column's name/type/PK/NOT NULL.
    pub(crate) fn next_field(&mut self) {
        self.focus = match self.focus {
            BuilderFocus::TableName => BuilderFocus::Column {
                index: 0,
                part: ColumnPart::Name,
            },
            BuilderFocus::Column { index, part } => match part.next() {
                Some(part) => BuilderFocus::Column { index, part },
                None if index + 1 < self.columns.len() => BuilderFocus::Column {
                    index: index + 1,
                    part: ColumnPart::Name,
                },
                None => BuilderFocus::TableName,
            },
        };
    }

    pub(crate) fn previous_field(&mut self) {
        self.focus = match self.focus {
            BuilderFocus::TableName => BuilderFocus::Column {
                index: self.columns.len() - 1,
                part: ColumnPart::NotNull,
            },
            BuilderFocus::Column { index, part } => match part.previous() {
                Some(part) => BuilderFocus::Column { index, part },
                None if index > 0 => BuilderFocus::Column {
                    index: index - 1,
                    part: ColumnPart::NotNull,
                },
                None => BuilderFocus::TableName,
            },
        };
    }

    /// Move between rows keeping the same part focused.
    pub(crate) fn move_row(&mut self, offset: isize) {
        self.focus = match self.focus {
            BuilderFocus::TableName if offset > 0 => BuilderFocus::Column {
                index: 0,
                part: ColumnPart::Name,
            },
            BuilderFocus::TableName => BuilderFocus::TableName,
            BuilderFocus::Column { index, part } => {
                let target = index as isize + offset;
                if target < 0 {
                    BuilderFocus::TableName
                } else {
                    let last = self.columns.len() - 1;
                    BuilderFocus::Column {
                        index: (target as usize).min(last),
                        part,
                    }
                }
            }
        };
    }

    /// Append a blank column and focus its name.
    pub(crate) fn add_column(&mut self) {
        self.columns.push(ColumnSpec::default());
        self.focus = BuilderFocus::Column {
            index: self.columns.len() - 1,
            part: ColumnPart::Name,
        };
    }

    /// Remove the focused column. The last remaining column is cleared
    /// instead so the form always has a row to type into.
    pub(crate) fn remove_column(&mut self) {
        let BuilderFocus::Column { index, .. } = self.focus else {
            return;
        };
        if self.columns.len() == 1 {
            self.columns[0] = ColumnSpec::default();
        } else {
            self.columns.remove(index);
        }
        self.focus = BuilderFocus::Column {
            index: index.min(self.columns.len() - 1),
            part: ColumnPart::Name,
        };
    }

    /// Typing goes into text fields; space toggles flags and cycles types.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.focus {
            BuilderFocus::TableName => self.name.push(ch),
            BuilderFocus::Column { index, part } => {
                let column = &mut self.columns[index];
                match part {
                    ColumnPart::Name => column.name.push(ch),
                    ColumnPart::Type if ch == ' ' => column.kind = column.kind.next(),
                    ColumnPart::PrimaryKey if ch == ' ' => column.primary_key = !column.primary_key,
                    ColumnPart::NotNull if ch == ' ' => column.not_null = !column.not_null,
                    _ => return false,
                }
            }
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.focus {
            BuilderFocus::TableName => {
                self.name.pop();
            }
            BuilderFocus::Column {
                index,
                part: ColumnPart::Name,
            } => {
                self.columns[index].name.pop();
            }
            BuilderFocus::Column { .. } => {}
        }
    }

    /// Cycle the focused column's type. Returns `false` when the type cell is
    /// not focused.
    pub(crate) fn cycle_type(&mut self, forward: bool) -> bool {
        if let BuilderFocus::Column {
            index,
            part: ColumnPart::Type,
        } = self.focus
        {
            let column = &mut self.columns[index];
            column.kind = if forward {
                column.kind.next()
            } else {
                column.kind.previous()
            };
            true
        } else {
            false
        }
    }

    pub(crate) fn to_spec(&self) -> TableSpec {
        TableSpec {
            name: self.name.trim().to_string(),
            columns: self
                .columns
                .iter()
                .map(|column| ColumnSpec {
                    name: column.name.trim().to_string(),
                    ..column.clone()
                })
                .collect(),
        }
    }

    pub(crate) fn name_line(&self) -> Line<'static> {
        let active = self.focus == BuilderFocus::TableName;
        Line::from(vec![
            Span::raw("Table name: "),
            text_span(&self.name, "<required>", active),
        ])
    }

    /// One rendered line per column row.
    pub(crate) fn column_line(&self, index: usize) -> Line<'static> {
        let column = &self.columns[index];
        let focused_part = match self.focus {
            BuilderFocus::Column { index: i, part } if i == index => Some(part),
            _ => None,
        };

        let flag = |label: &str, on: bool, part: ColumnPart| {
            let mark = if on { "x" } else { " " };
            Span::styled(format!("[{mark}] {label}"), cell_style(focused_part == Some(part)))
        };

        Line::from(vec![
            Span::raw(format!("{:>2}. ", index + 1)),
            text_span(
                &column.name,
                "<column>",
                focused_part == Some(ColumnPart::Name),
            ),
            Span::raw("  "),
            Span::styled(
                format!("< {:<7} >", column.kind.as_sql()),
                cell_style(focused_part == Some(ColumnPart::Type)),
            ),
            Span::raw("  "),
            flag("PK", column.primary_key, ColumnPart::PrimaryKey),
            Span::raw("  "),
            flag("NOT NULL", column.not_null, ColumnPart::NotNull),
        ])
    }

    /// Cursor offset `(x, line)` relative to the popup's inner area, only when
    /// a text field has focus. Column rows start at line 2.
    pub(crate) fn cursor(&self) -> Option<(u16, u16)> {
        match self.focus {
            BuilderFocus::TableName => {
                Some((("Table name: ".len() + self.name.chars().count()) as u16, 0))
            }
            BuilderFocus::Column {
                index,
                part: ColumnPart::Name,
            } => Some((
                ("NN. ".len() + self.columns[index].name.chars().count()) as u16,
                index as u16 + 2,
            )),
            BuilderFocus::Column { .. } => None,
        }
    }
}

/// Whether the row editor inserts or updates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RowFormMode {
    Add,
    Edit { rowid: i64 },
}

/// One text input per table column.
#[derive(Clone, Debug)]
pub(crate) struct RowForm {
    pub(crate) mode: RowFormMode,
    pub(crate) columns: Vec<Column>,
    pub(crate) inputs: Vec<String>,
    pub(crate) active: usize,
    pub(crate) error: Option<String>,
    /// Columns whose stored value is a BLOB when the form was opened.
    pub(crate) blob_columns: Vec<String>,
}

impl RowForm {
    pub(crate) fn for_insert(columns: Vec<Column>) -> Self {
        let inputs = vec![String::new(); columns.len()];
        Self {
            mode: RowFormMode::Add,
            columns,
            inputs,
            active: 0,
            error: None,
            blob_columns: Vec::new(),
        }
    }

    /// Pre-fill from an existing row; NULL becomes an empty field.
    ///
    /// BLOBs are shown as `x'..'` literals, and saving writes that text back
    /// as TEXT. The affected columns are listed so the popup can warn.
    pub(crate) fn for_update(columns: Vec<Column>, row: &Row) -> Self {
        let mut inputs: Vec<String> = row.values.iter().map(display_value).collect();
        inputs.resize(columns.len(), String::new());
        let blob_columns = columns
            .iter()
            .zip(&row.values)
            .filter(|(_, value)| matches!(value, Value::Blob(_)))
            .map(|(column, _)| column.name.clone())
            .collect();
        Self {
            mode: RowFormMode::Edit { rowid: row.rowid },
            columns,
            inputs,
            active: 0,
            error: None,
            blob_columns,
        }
    }

    /// Hint shown while the form holds BLOB values that would be rewritten.
    pub(crate) fn blob_warning(&self) -> Option<String> {
        if self.blob_columns.is_empty() {
            return None;
        }
        Some(format!(
            "BLOB values in {} are saved back as text.",
            self.blob_columns.join(", ")
        ))
    }

    pub(crate) fn title(&self) -> String {
        match self.mode {
            RowFormMode::Add => "Add Row".to_string(),
            RowFormMode::Edit { rowid } => format!("Edit Row {rowid}"),
        }
    }

    pub(crate) fn next_field(&mut self) {
        if !self.inputs.is_empty() {
            self.active = (self.active + 1) % self.inputs.len();
        }
    }

    pub(crate) fn previous_field(&mut self) {
        if !self.inputs.is_empty() {
            self.active = (self.active + self.inputs.len() - 1) % self.inputs.len();
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.inputs.get_mut(self.active) {
            Some(input) => {
                input.push(ch);
                true
            }
            None => false,
        }
    }

    pub(crate) fn backspace(&mut self) {
        if let Some(input) = self.inputs.get_mut(self.active) {
            input.pop();
        }
    }

    /// Column names paired with coerced values, ready for insert/update.
    pub(crate) fn parse_inputs(&self) -> Result<(Vec<String>, Vec<Value>)> {
        let values = coerce_row(&self.columns, &self.inputs)?;
        let names = self.columns.iter().map(|column| column.name.clone()).collect();
        Ok((names, values))
    }

    /// `name (TYPE)` with a trailing `*` for NOT NULL columns.
    pub(crate) fn label(&self, index: usize) -> String {
        let column = &self.columns[index];
        let marker = if column.not_null { " *" } else { "" };
        format!("{} ({}){marker}", column.name, column.type_label())
    }

    pub(crate) fn build_line(&self, index: usize, label_width: usize) -> Line<'static> {
        let label = self.label(index);
        let placeholder = if self.columns[index].not_null {
            "<required>"
        } else {
            "<null>"
        };
        Line::from(vec![
            Span::raw(format!("{label:<label_width$} : ")),
            text_span(&self.inputs[index], placeholder, index == self.active),
        ])
    }

    pub(crate) fn label_width(&self) -> usize {
        (0..self.columns.len())
            .map(|idx| self.label(idx).chars().count())
            .max()
            .unwrap_or(0)
    }
}

/// Multi-line buffer behind the SQL script box. Editing happens at the end
/// of the buffer only.
#[derive(Clone, Debug, Default)]
pub(crate) struct ScriptEditor {
    pub(crate) text: String,
}

impl ScriptEditor {
    pub(crate) fn push_char(&mut self, ch: char) {
        if ch == '\n' || ch == '\t' || !ch.is_control() {
            self.text.push(ch);
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.text.pop();
    }

    pub(crate) fn clear(&mut self) {
        self.text.clear();
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Cursor `(column, line)` at the end of the buffer.
    pub(crate) fn cursor(&self) -> (u16, u16) {
        let line = self.text.matches('\n').count();
        let column = self
            .text
            .rsplit('\n')
            .next()
            .map(|last| last.chars().count())
            .unwrap_or(0);
        (column as u16, line as u16)
    }
}

/// Pending table drop awaiting a yes/no answer.
#[derive(Clone, Debug)]
pub(crate) struct ConfirmTableDrop {
    pub(crate) table: String,
}

/// Pending row deletion awaiting a yes/no answer.
#[derive(Clone, Debug)]
pub(crate) struct ConfirmRowDelete {
    pub(crate) rowid: i64,
}

/// Blocking message box shown when an action fails.
#[derive(Clone, Debug)]
pub(crate) struct Notice {
    pub(crate) title: String,
    pub(crate) message: String,
}

fn cell_style(active: bool) -> Style {
    if active {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn text_span(value: &str, placeholder: &str, active: bool) -> Span<'static> {
    let style = if active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    if value.is_empty() && !active {
        Span::styled(placeholder.to_string(), style)
    } else {
        Span::styled(value.to_string(), style)
    }
}
