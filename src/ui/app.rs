use std::mem;
use std::path::Path;

use anyhow::{anyhow, Result};
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row as GridRow, Table,
    TableState, Wrap,
};
use ratatui::Frame;
use tracing::warn;

use crate::db::DbManager;
use crate::models::display_value;

use super::forms::{
    BuilderFocus, ConfirmRowDelete, ConfirmTableDrop, Notice, PathAction, PathPrompt, RowForm,
    RowFormMode, ScriptEditor, TableBuilderForm,
};
use super::helpers::{centered_rect, surface_error, truncate_cell};
use super::screens::{DumpPreview, TableViewScreen, TablesScreen};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Widest a grid cell gets before its text is cut.
const MAX_CELL_WIDTH: usize = 32;
/// Rows moved by PageUp / PageDown.
const PAGE_STEP: isize = 10;

/// High-level navigation states.
enum Screen {
    Tables,
    TableView(TableViewScreen),
}

/// Fine-grained modes scoped to the current screen. Popups own their state
/// so cancelling one simply drops it.
enum Mode {
    Normal,
    EditingScript,
    PromptingPath(PathPrompt),
    CreatingTable(TableBuilderForm),
    ConfirmTableDrop(ConfirmTableDrop),
    EditingRow(RowForm),
    ConfirmRowDelete(ConfirmRowDelete),
    ViewingDump(DumpPreview),
    Notice { notice: Notice, resume: Box<Mode> },
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    db: DbManager,
    tables: TablesScreen,
    script: ScriptEditor,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(db: DbManager) -> Result<Self> {
        let mut app = Self {
            db,
            tables: TablesScreen::default(),
            script: ScriptEditor::default(),
            screen: Screen::Tables,
            mode: Mode::Normal,
            status: None,
        };
        app.refresh_tables(None)?;
        if let Some(path) = app.db.path() {
            let message = format!("Opened {}.", path.display());
            app.set_status(message, StatusKind::Info);
        }
        Ok(app)
    }

    /// Dispatch a key press to the active mode. Returns `true` when the user
    /// asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::EditingScript => self.handle_script_key(code)?,
            Mode::PromptingPath(prompt) => self.handle_path_prompt(code, prompt)?,
            Mode::CreatingTable(form) => self.handle_create_table(code, form)?,
            Mode::ConfirmTableDrop(confirm) => self.handle_confirm_table_drop(code, confirm)?,
            Mode::EditingRow(form) => self.handle_edit_row(code, form)?,
            Mode::ConfirmRowDelete(confirm) => self.handle_confirm_row_delete(code, confirm)?,
            Mode::ViewingDump(preview) => self.handle_dump_preview(code, preview),
            Mode::Notice { notice, resume } => match code {
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => *resume,
                _ => Mode::Notice { notice, resume },
            },
        };

        Ok(exit)
    }

    /// Handle `Ctrl+<ch>`. Returns `true` when the chord was consumed.
    pub(crate) fn handle_ctrl(&mut self, ch: char) -> Result<bool> {
        if matches!(self.mode, Mode::EditingScript) {
            match ch {
                'r' => {
                    self.mode = self.run_script(Mode::EditingScript)?;
                    return Ok(true);
                }
                'l' => {
                    self.script.clear();
                    self.tables.output.clear();
                    return Ok(true);
                }
                _ => {}
            }
        }

        if let Mode::CreatingTable(form) = &mut self.mode {
            match ch {
                'n' => {
                    form.add_column();
                    return Ok(true);
                }
                'd' => {
                    form.remove_column();
                    return Ok(true);
                }
                _ => {}
            }
        }

        Ok(false)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match self.screen {
            Screen::Tables => match code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    *exit = true;
                    Ok(Mode::Normal)
                }
                KeyCode::Up => {
                    self.tables.move_selection(-1);
                    Ok(Mode::Normal)
                }
                KeyCode::Down => {
                    self.tables.move_selection(1);
                    Ok(Mode::Normal)
                }
                KeyCode::PageUp => {
                    self.tables.move_selection(-PAGE_STEP);
                    Ok(Mode::Normal)
                }
                KeyCode::PageDown => {
                    self.tables.move_selection(PAGE_STEP);
                    Ok(Mode::Normal)
                }
                KeyCode::Home => {
                    self.tables.select_first();
                    Ok(Mode::Normal)
                }
                KeyCode::End => {
                    self.tables.select_last();
                    Ok(Mode::Normal)
                }
                KeyCode::Char('n') | KeyCode::Char('N') => {
                    self.clear_status();
                    Ok(Mode::PromptingPath(PathPrompt::new(
                        PathAction::NewDatabase,
                        None,
                    )))
                }
                KeyCode::Char('o') | KeyCode::Char('O') => {
                    self.clear_status();
                    Ok(Mode::PromptingPath(PathPrompt::new(
                        PathAction::OpenDatabase,
                        None,
                    )))
                }
                KeyCode::Char('x') | KeyCode::Char('X') => {
                    self.clear_status();
                    match self.db.dump() {
                        Ok(text) => Ok(Mode::ViewingDump(DumpPreview::new(text))),
                        Err(err) => Ok(self.fail("Export Failed", err.into(), Mode::Normal)),
                    }
                }
                KeyCode::Char('e') | KeyCode::Char('E') | KeyCode::Tab => {
                    self.clear_status();
                    Ok(Mode::EditingScript)
                }
                KeyCode::F(5) => self.run_script(Mode::Normal),
                KeyCode::Char('r') | KeyCode::Char('R') => {
                    let focus = self.tables.current_table().map(str::to_string);
                    match self.refresh_tables(focus.as_deref()) {
                        Ok(()) => {
                            self.set_status("Table list refreshed.", StatusKind::Info);
                            Ok(Mode::Normal)
                        }
                        Err(err) => Ok(self.fail("Refresh Failed", err, Mode::Normal)),
                    }
                }
                KeyCode::Char('+') => {
                    if !self.db.is_connected() {
                        self.set_status("No database is open.", StatusKind::Error);
                        return Ok(Mode::Normal);
                    }
                    self.clear_status();
                    Ok(Mode::CreatingTable(TableBuilderForm::default()))
                }
                KeyCode::Enter => {
                    let Some(table) = self.tables.current_table().map(str::to_string) else {
                        self.set_status("No table selected.", StatusKind::Error);
                        return Ok(Mode::Normal);
                    };
                    match TableViewScreen::load(&self.db, &table) {
                        Ok(view) => {
                            self.clear_status();
                            self.screen = Screen::TableView(view);
                            Ok(Mode::Normal)
                        }
                        Err(err) => Ok(self.fail("Cannot Open Table", err, Mode::Normal)),
                    }
                }
                KeyCode::Char('-') => match self.tables.current_table() {
                    Some(table) => {
                        let table = table.to_string();
                        self.clear_status();
                        Ok(Mode::ConfirmTableDrop(ConfirmTableDrop { table }))
                    }
                    None => {
                        self.set_status("No table selected to delete.", StatusKind::Error);
                        Ok(Mode::Normal)
                    }
                },
                _ => Ok(Mode::Normal),
            },
            Screen::TableView(ref mut view) => {
                let mut status_to_set: Option<(String, StatusKind)> = None;
                let mut leave = false;

                let next = match code {
                    KeyCode::Char('q') => {
                        *exit = true;
                        Mode::Normal
                    }
                    KeyCode::Esc => {
                        leave = true;
                        Mode::Normal
                    }
                    KeyCode::Up => {
                        view.move_selection(-1);
                        Mode::Normal
                    }
                    KeyCode::Down => {
                        view.move_selection(1);
                        Mode::Normal
                    }
                    KeyCode::PageUp => {
                        view.move_selection(-PAGE_STEP);
                        Mode::Normal
                    }
                    KeyCode::PageDown => {
                        view.move_selection(PAGE_STEP);
                        Mode::Normal
                    }
                    KeyCode::Home => {
                        view.select_first();
                        Mode::Normal
                    }
                    KeyCode::End => {
                        view.select_last();
                        Mode::Normal
                    }
                    KeyCode::Char('+') => Mode::EditingRow(RowForm::for_insert(view.columns.clone())),
                    KeyCode::Char('e') | KeyCode::Char('E') | KeyCode::Enter => {
                        match view.current_row() {
                            Some(row) => {
                                Mode::EditingRow(RowForm::for_update(view.columns.clone(), row))
                            }
                            None => {
                                status_to_set =
                                    Some(("No row selected.".to_string(), StatusKind::Error));
                                Mode::Normal
                            }
                        }
                    }
                    KeyCode::Char('-') => match view.current_row() {
                        Some(row) => Mode::ConfirmRowDelete(ConfirmRowDelete { rowid: row.rowid }),
                        None => {
                            status_to_set = Some((
                                "No row selected to delete.".to_string(),
                                StatusKind::Error,
                            ));
                            Mode::Normal
                        }
                    },
                    KeyCode::Char('r') | KeyCode::Char('R') => {
                        let focus = view.current_row().map(|row| row.rowid);
                        match view.reload(&self.db, focus) {
                            Ok(()) => {
                                status_to_set =
                                    Some(("Rows refreshed.".to_string(), StatusKind::Info));
                                Mode::Normal
                            }
                            Err(err) => return Ok(self.fail("Refresh Failed", err, Mode::Normal)),
                        }
                    }
                    _ => Mode::Normal,
                };

                if leave {
                    self.clear_status();
                    self.screen = Screen::Tables;
                    let focus = self.tables.current_table().map(str::to_string);
                    if let Err(err) = self.refresh_tables(focus.as_deref()) {
                        return Ok(self.fail("Refresh Failed", err, Mode::Normal));
                    }
                }
                if let Some((text, kind)) = status_to_set {
                    self.set_status(text, kind);
                }
                Ok(next)
            }
        }
    }

    fn handle_script_key(&mut self, code: KeyCode) -> Result<Mode> {
        match code {
            KeyCode::Esc => return Ok(Mode::Normal),
            KeyCode::F(5) => return self.run_script(Mode::EditingScript),
            KeyCode::Enter => self.script.push_char('\n'),
            KeyCode::Tab => self.script.push_char('\t'),
            KeyCode::Backspace => self.script.backspace(),
            KeyCode::Char(ch) => self.script.push_char(ch),
            _ => {}
        }
        Ok(Mode::EditingScript)
    }

    fn handle_path_prompt(&mut self, code: KeyCode, mut prompt: PathPrompt) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status(
                    format!("{} cancelled.", prompt.action.title()),
                    StatusKind::Info,
                );
                Ok(Mode::Normal)
            }
            KeyCode::Backspace => {
                prompt.backspace();
                Ok(Mode::PromptingPath(prompt))
            }
            KeyCode::Enter => match self.perform_path_action(&prompt) {
                Ok(()) => Ok(Mode::Normal),
                Err(err) => {
                    prompt.error = Some(surface_error(&err));
                    let title = format!("{} Failed", prompt.action.title());
                    Ok(self.fail(&title, err, Mode::PromptingPath(prompt)))
                }
            },
            KeyCode::Char(ch) => {
                if prompt.push_char(ch) {
                    prompt.error = None;
                }
                Ok(Mode::PromptingPath(prompt))
            }
            _ => Ok(Mode::PromptingPath(prompt)),
        }
    }

    fn handle_create_table(&mut self, code: KeyCode, mut form: TableBuilderForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Create table cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.previous_field(),
            KeyCode::Up => form.move_row(-1),
            KeyCode::Down => form.move_row(1),
            KeyCode::Left => {
                form.cycle_type(false);
            }
            KeyCode::Right => {
                form.cycle_type(true);
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_new_table(&form) {
                Ok(()) => return Ok(Mode::Normal),
                Err(err) => {
                    form.error = Some(surface_error(&err));
                    return Ok(self.fail("Create Table Failed", err, Mode::CreatingTable(form)));
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Ok(Mode::CreatingTable(form))
    }

    fn handle_confirm_table_drop(
        &mut self,
        code: KeyCode,
        confirm: ConfirmTableDrop,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_table_drop(&confirm) {
                    Ok(()) => Ok(Mode::Normal),
                    Err(err) => Ok(self.fail("Delete Table Failed", err, Mode::Normal)),
                }
            }
            _ => Ok(Mode::ConfirmTableDrop(confirm)),
        }
    }

    fn handle_edit_row(&mut self, code: KeyCode, mut form: RowForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                let message = match form.mode {
                    RowFormMode::Add => "Add row cancelled.",
                    RowFormMode::Edit { .. } => "Edit cancelled.",
                };
                self.set_status(message, StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_row(&form) {
                Ok(()) => return Ok(Mode::Normal),
                Err(err) => {
                    form.error = Some(surface_error(&err));
                    let title = form.title();
                    return Ok(self.fail(&format!("{title} Failed"), err, Mode::EditingRow(form)));
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Ok(Mode::EditingRow(form))
    }

    fn handle_confirm_row_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmRowDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_row_delete(&confirm) {
                    Ok(()) => Ok(Mode::Normal),
                    Err(err) => Ok(self.fail("Delete Row Failed", err, Mode::Normal)),
                }
            }
            _ => Ok(Mode::ConfirmRowDelete(confirm)),
        }
    }

    fn handle_dump_preview(&mut self, code: KeyCode, mut preview: DumpPreview) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => return Mode::Normal,
            KeyCode::Up => preview.scroll_by(-1),
            KeyCode::Down => preview.scroll_by(1),
            KeyCode::PageUp => preview.scroll_by(-PAGE_STEP),
            KeyCode::PageDown => preview.scroll_by(PAGE_STEP),
            KeyCode::Home => preview.scroll = 0,
            KeyCode::Char('s') | KeyCode::Char('S') => {
                return Mode::PromptingPath(PathPrompt::new(
                    PathAction::ExportDump,
                    self.default_dump_path(),
                ));
            }
            _ => {}
        }
        Mode::ViewingDump(preview)
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::Tables => self.draw_tables(frame, content_area),
            Screen::TableView(view) => self.draw_table_view(frame, content_area, view),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        self.draw_mode(frame, area, &self.mode);
    }

    fn draw_mode(&self, frame: &mut Frame, area: Rect, mode: &Mode) {
        match mode {
            Mode::Normal | Mode::EditingScript => {}
            Mode::PromptingPath(prompt) => self.draw_path_prompt(frame, area, prompt),
            Mode::CreatingTable(form) => self.draw_table_builder(frame, area, form),
            Mode::ConfirmTableDrop(confirm) => self.draw_confirm(
                frame,
                area,
                "Delete Table",
                vec![
                    Line::from(format!("Delete table {}?", confirm.table)),
                    Line::from("All of its data will be lost."),
                ],
            ),
            Mode::EditingRow(form) => self.draw_row_form(frame, area, form),
            Mode::ConfirmRowDelete(confirm) => self.draw_confirm(
                frame,
                area,
                "Delete Row",
                vec![Line::from(format!("Delete row {}?", confirm.rowid))],
            ),
            Mode::ViewingDump(preview) => self.draw_dump_preview(frame, area, preview),
            Mode::Notice { notice, resume } => {
                self.draw_mode(frame, area, resume);
                self.draw_notice(frame, area, notice);
            }
        }
    }

    fn draw_tables(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
            .split(area);

        let title = match self.db.path() {
            Some(path) => format!(
                "Tables - {}",
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            ),
            None => "Tables (no database)".to_string(),
        };
        let list_block = Block::default().title(title).borders(Borders::ALL);

        if self.tables.tables.is_empty() {
            let hint = if self.db.is_connected() {
                "No tables yet. Press '+' to add one."
            } else {
                "Press 'n' to create or 'o' to open a database."
            };
            let paragraph = Paragraph::new(hint)
                .block(list_block)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, columns[0]);
        } else {
            let items: Vec<ListItem> = self
                .tables
                .tables
                .iter()
                .map(|table| ListItem::new(table.clone()))
                .collect();
            let list = List::new(items)
                .block(list_block)
                .highlight_style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol("> ");
            let mut state = ListState::default();
            state.select(Some(self.tables.selected));
            frame.render_stateful_widget(list, columns[0], &mut state);
        }

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(columns[1]);

        let editing = matches!(self.mode, Mode::EditingScript);
        let mut editor_block = Block::default().title("SQL").borders(Borders::ALL);
        if editing {
            editor_block = editor_block.border_style(Style::default().fg(Color::Yellow));
        }
        let inner = editor_block.inner(right[0]);
        let (cursor_x, cursor_y) = self.script.cursor();
        let scroll = cursor_y.saturating_sub(inner.height.saturating_sub(1));

        let editor = if self.script.text.is_empty() && !editing {
            Paragraph::new(Span::styled(
                "Press 'e' to type SQL statements here...",
                Style::default().fg(Color::DarkGray),
            ))
        } else {
            Paragraph::new(self.script.text.replace('\t', " "))
        };
        frame.render_widget(editor.block(editor_block).scroll((scroll, 0)), right[0]);

        if editing && inner.width > 0 && inner.height > 0 {
            let x = inner.x + cursor_x.min(inner.width - 1);
            let y = inner.y + (cursor_y - scroll).min(inner.height - 1);
            frame.set_cursor_position((x, y));
        }

        let output = Paragraph::new(self.tables.output.clone())
            .block(Block::default().title("Output").borders(Borders::ALL))
            .wrap(Wrap { trim: false });
        frame.render_widget(output, right[1]);
    }

    fn draw_table_view(&self, frame: &mut Frame, area: Rect, view: &TableViewScreen) {
        let title = format!("Table: {} ({} rows)", view.table, view.rows.len());
        let block = Block::default().title(title).borders(Borders::ALL);

        let header_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let header = GridRow::new(
            view.headers()
                .into_iter()
                .map(|name| Cell::from(truncate_cell(&name, MAX_CELL_WIDTH))),
        )
        .style(header_style);

        let rows: Vec<GridRow> = view
            .rows
            .iter()
            .map(|row| {
                let mut cells = Vec::with_capacity(row.values.len() + 1);
                cells.push(Cell::from(row.rowid.to_string()));
                cells.extend(
                    row.values
                        .iter()
                        .map(|value| Cell::from(truncate_cell(&display_value(value), MAX_CELL_WIDTH))),
                );
                GridRow::new(cells)
            })
            .collect();

        let mut widths = Vec::with_capacity(view.columns.len() + 1);
        widths.push(Constraint::Length(8));
        widths.extend(view.columns.iter().map(|_| Constraint::Fill(1)));

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        let mut state = TableState::default();
        if !view.rows.is_empty() {
            state.select(Some(view.selected));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let hints: &[(&str, &str)] = match (&self.screen, &self.mode) {
            (_, Mode::Notice { .. }) => &[("[Enter]", "Dismiss")],
            (_, Mode::EditingScript) => &[
                ("[Ctrl+R]", "Run"),
                ("[Ctrl+L]", "Clear"),
                ("[Enter]", "New line"),
                ("[Esc]", "Leave editor"),
            ],
            (_, Mode::PromptingPath(_)) => &[("[Enter]", "Confirm"), ("[Esc]", "Cancel")],
            (_, Mode::CreatingTable(_)) => &[
                ("[Tab]", "Next field"),
                ("[Space/←→]", "Toggle / type"),
                ("[Ctrl+N]", "Add column"),
                ("[Ctrl+D]", "Remove column"),
                ("[Enter]", "Create"),
                ("[Esc]", "Cancel"),
            ],
            (_, Mode::ConfirmTableDrop(_)) | (_, Mode::ConfirmRowDelete(_)) => {
                &[("[Y]", "Confirm"), ("[N/Esc]", "Cancel")]
            }
            (_, Mode::EditingRow(_)) => &[
                ("[Tab/↑↓]", "Field"),
                ("[Enter]", "Save"),
                ("[Esc]", "Cancel"),
            ],
            (_, Mode::ViewingDump(_)) => &[
                ("[↑↓]", "Scroll"),
                ("[s]", "Save to file"),
                ("[Esc]", "Close"),
            ],
            (Screen::Tables, Mode::Normal) => &[
                ("[n]", "New DB"),
                ("[o]", "Open DB"),
                ("[x]", "Export SQL"),
                ("[+]", "Add table"),
                ("[Enter]", "View/Edit"),
                ("[-]", "Delete table"),
                ("[e]", "SQL editor"),
                ("[q]", "Quit"),
            ],
            (Screen::TableView(_), Mode::Normal) => &[
                ("[+]", "Add row"),
                ("[e]", "Edit row"),
                ("[-]", "Delete row"),
                ("[r]", "Refresh"),
                ("[Esc]", "Back"),
                ("[q]", "Quit"),
            ],
        };

        let mut spans = Vec::with_capacity(hints.len() * 2);
        for (idx, (key, label)) in hints.iter().enumerate() {
            spans.push(Span::styled(*key, key_style));
            let separator = if idx + 1 < hints.len() { "   " } else { "" };
            spans.push(Span::raw(format!(" {label}{separator}")));
        }
        Line::from(spans)
    }

    fn draw_path_prompt(&self, frame: &mut Frame, area: Rect, prompt: &PathPrompt) {
        let popup_area = centered_rect(70, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(prompt.action.title())
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            Line::from(format!("Path: {}", prompt.input)),
            Line::from(""),
        ];
        if let Some(error) = &prompt.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to confirm • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }
        frame.render_widget(Paragraph::new(lines), inner);

        let cursor_x = inner.x + ("Path: ".len() + prompt.input.chars().count()) as u16;
        frame.set_cursor_position((cursor_x.min(inner.right().saturating_sub(1)), inner.y));
    }

    fn draw_table_builder(&self, frame: &mut Frame, area: Rect, form: &TableBuilderForm) {
        let popup_area = centered_rect(80, 70, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Create Table").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![form.name_line(), Line::from("")];
        lines.extend((0..form.columns.len()).map(|idx| form.column_line(idx)));
        lines.push(Line::from(""));
        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Blank column names are ignored.",
                Style::default().fg(Color::Gray),
            )));
        }

        // Keep the focused column row on screen when the list grows.
        let focus_line = match form.focus {
            BuilderFocus::TableName => 0,
            BuilderFocus::Column { index, .. } => index as u16 + 2,
        };
        let scroll = focus_line.saturating_sub(inner.height.saturating_sub(1));
        frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), inner);

        if let Some((x, y)) = form.cursor() {
            if y >= scroll && y - scroll < inner.height {
                frame.set_cursor_position((inner.x + x, inner.y + y - scroll));
            }
        }
    }

    fn draw_row_form(&self, frame: &mut Frame, area: Rect, form: &RowForm) {
        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(form.title()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let label_width = form.label_width();
        let mut lines: Vec<Line> = (0..form.columns.len())
            .map(|idx| form.build_line(idx, label_width))
            .collect();
        lines.push(Line::from(""));
        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "* required • empty fields are stored as NULL",
                Style::default().fg(Color::Gray),
            )));
            if let Some(warning) = form.blob_warning() {
                lines.push(Line::from(Span::styled(
                    warning,
                    Style::default().fg(Color::Yellow),
                )));
            }
        }

        let active = form.active as u16;
        let scroll = active.saturating_sub(inner.height.saturating_sub(1));
        frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), inner);

        if let Some(input) = form.inputs.get(form.active) {
            let prefix = label_width + " : ".len();
            let cursor_x = inner.x + (prefix + input.chars().count()) as u16;
            frame.set_cursor_position((
                cursor_x.min(inner.right().saturating_sub(1)),
                inner.y + active - scroll,
            ));
        }
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, title: &str, mut lines: Vec<Line>) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press Y to confirm or N / Esc to cancel.",
            Style::default().fg(Color::Gray),
        )));

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_dump_preview(&self, frame: &mut Frame, area: Rect, preview: &DumpPreview) {
        let popup_area = centered_rect(90, 80, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("SQL Dump").borders(Borders::ALL);
        let paragraph = Paragraph::new(preview.text.clone())
            .block(block)
            .scroll((preview.scroll, 0));
        frame.render_widget(paragraph, popup_area);
    }

    fn draw_notice(&self, frame: &mut Frame, area: Rect, notice: &Notice) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(notice.title.clone())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(notice.message.clone()),
            Line::from(""),
            Line::from(Span::styled(
                "Press Enter to continue.",
                Style::default().fg(Color::Gray),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    /// Surface a failed action: log it, mirror it in the footer and open a
    /// blocking notice that returns to `resume` once dismissed.
    fn fail(&mut self, title: &str, err: anyhow::Error, resume: Mode) -> Mode {
        let message = surface_error(&err);
        warn!(action = title, error = %message, "action failed");
        self.set_status(message.clone(), StatusKind::Error);
        Mode::Notice {
            notice: Notice {
                title: title.to_string(),
                message,
            },
            resume: Box::new(resume),
        }
    }

    fn refresh_tables(&mut self, focus: Option<&str>) -> Result<()> {
        let tables = self.db.list_tables()?;
        self.tables.set_tables(tables, focus);
        Ok(())
    }

    fn perform_path_action(&mut self, prompt: &PathPrompt) -> Result<()> {
        let path = prompt.parse_path()?;
        match prompt.action {
            PathAction::NewDatabase | PathAction::OpenDatabase => {
                let outcome = if prompt.action == PathAction::NewDatabase {
                    self.db.create(&path)
                } else {
                    self.db.open(&path)
                };
                // The old connection is gone either way, so the list must be
                // rebuilt even when the new file was rejected.
                self.screen = Screen::Tables;
                self.tables.selected = 0;
                self.refresh_tables(None)?;
                outcome?;

                let verb = if prompt.action == PathAction::NewDatabase {
                    "Created"
                } else {
                    "Opened"
                };
                self.set_status(
                    format!("{verb} database {}.", path.display()),
                    StatusKind::Info,
                );
            }
            PathAction::ExportDump => {
                self.db.export_dump(&path)?;
                self.set_status(
                    format!("Dump saved to {}.", path.display()),
                    StatusKind::Info,
                );
            }
        }
        Ok(())
    }

    /// Execute the script box and report the outcome. Returns `resume`, or a
    /// notice that leads back to it when the script failed.
    fn run_script(&mut self, resume: Mode) -> Result<Mode> {
        if self.script.is_blank() {
            return Ok(resume);
        }
        match self.db.execute_script(&self.script.text) {
            Ok(()) => {
                self.tables.output = "SQL executed successfully.".to_string();
                let focus = self.tables.current_table().map(str::to_string);
                if let Err(err) = self.refresh_tables(focus.as_deref()) {
                    return Ok(self.fail("Refresh Failed", err, resume));
                }
                self.set_status("SQL executed successfully.", StatusKind::Info);
                Ok(resume)
            }
            Err(err) => {
                self.tables.output = format!("Error: {err}");
                Ok(self.fail("SQL Error", err.into(), resume))
            }
        }
    }

    fn save_new_table(&mut self, form: &TableBuilderForm) -> Result<()> {
        let spec = form.to_spec();
        self.db.create_table(&spec)?;
        self.refresh_tables(Some(&spec.name))?;
        self.set_status(format!("Table {} created.", spec.name), StatusKind::Info);
        Ok(())
    }

    fn perform_table_drop(&mut self, confirm: &ConfirmTableDrop) -> Result<()> {
        self.db.drop_table(&confirm.table)?;
        self.refresh_tables(None)?;
        self.set_status(format!("Table {} deleted.", confirm.table), StatusKind::Info);
        Ok(())
    }

    fn save_row(&mut self, form: &RowForm) -> Result<()> {
        let (columns, values) = form.parse_inputs()?;
        let Screen::TableView(view) = &mut self.screen else {
            return Err(anyhow!("No table is open."));
        };

        let (focus, message) = match form.mode {
            RowFormMode::Add => {
                let rowid = self.db.insert_row(&view.table, &columns, &values)?;
                (rowid, "Row added.".to_string())
            }
            RowFormMode::Edit { rowid } => {
                if self.db.update_row(&view.table, &columns, &values, rowid)? == 0 {
                    return Err(anyhow!("Row {rowid} no longer exists."));
                }
                (rowid, format!("Row {rowid} updated."))
            }
        };

        view.reload(&self.db, Some(focus))?;
        self.set_status(message, StatusKind::Info);
        Ok(())
    }

    fn perform_row_delete(&mut self, confirm: &ConfirmRowDelete) -> Result<()> {
        let Screen::TableView(view) = &mut self.screen else {
            return Err(anyhow!("No table is open."));
        };
        let deleted = self.db.delete_row(&view.table, confirm.rowid)?;
        view.reload(&self.db, None)?;
        if deleted == 0 {
            return Err(anyhow!("Row {} no longer exists.", confirm.rowid));
        }
        self.set_status(format!("Row {} deleted.", confirm.rowid), StatusKind::Info);
        Ok(())
    }

    /// The open database's path with an `.sql` extension.
    fn default_dump_path(&self) -> Option<String> {
        self.db
            .path()
            .map(|path: &Path| path.with_extension("sql").display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;
    use ratatui::backend::TestBackend;
    use std::time::Duration;
    use ratatui::Terminal;
    use tempfile::TempDir;

    fn app_with_db() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        let mut db = DbManager::new();
        db.create(&dir.path().join("app.db")).unwrap();
        let app = App::new(db).unwrap();
        (dir, app)
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| app.draw(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn builder_creates_table_via_keys() {
        let (_dir, mut app) = app_with_db();

        app.handle_key(KeyCode::Char('+')).unwrap();
        type_text(&mut app, "people");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "id");
        app.handle_key(KeyCode::Tab).unwrap();
        app.handle_key(KeyCode::Tab).unwrap();
        app.handle_key(KeyCode::Char(' ')).unwrap();
        assert!(app.handle_ctrl('n').unwrap());
        type_text(&mut app, "name");
        app.handle_key(KeyCode::Tab).unwrap();
        app.handle_key(KeyCode::Right).unwrap();
        app.handle_key(KeyCode::Enter).unwrap();

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.tables.tables, ["people"]);
        let columns = app.db.table_columns("people").unwrap();
        assert!(columns[0].primary_key);
        assert_eq!(columns[1].declared_type, "TEXT");
    }

    #[test]
    fn row_lifecycle_through_the_grid() {
        let (_dir, mut app) = app_with_db();
        app.db
            .execute_script("CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT NOT NULL);")
            .unwrap();
        app.refresh_tables(None).unwrap();

        app.handle_key(KeyCode::Enter).unwrap();
        assert!(matches!(app.screen, Screen::TableView(_)));

        // Add: name left blank is rejected and the form survives the notice.
        app.handle_key(KeyCode::Char('+')).unwrap();
        type_text(&mut app, "1");
        app.handle_key(KeyCode::Enter).unwrap();
        assert!(matches!(app.mode, Mode::Notice { .. }));
        app.handle_key(KeyCode::Enter).unwrap();
        assert!(matches!(app.mode, Mode::EditingRow(_)));

        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "a");
        app.handle_key(KeyCode::Enter).unwrap();
        assert!(matches!(app.mode, Mode::Normal));

        // Edit the name to "b".
        app.handle_key(KeyCode::Char('e')).unwrap();
        app.handle_key(KeyCode::Tab).unwrap();
        app.handle_key(KeyCode::Backspace).unwrap();
        type_text(&mut app, "b");
        app.handle_key(KeyCode::Enter).unwrap();

        let Screen::TableView(view) = &app.screen else {
            panic!("expected table view");
        };
        assert_eq!(view.rows.len(), 1);
        assert_eq!(
            view.rows[0].values,
            vec![Value::Integer(1), Value::Text("b".into())]
        );

        // Delete it.
        app.handle_key(KeyCode::Char('-')).unwrap();
        app.handle_key(KeyCode::Char('y')).unwrap();
        let Screen::TableView(view) = &app.screen else {
            panic!("expected table view");
        };
        assert!(view.rows.is_empty());

        app.handle_key(KeyCode::Esc).unwrap();
        assert!(matches!(app.screen, Screen::Tables));
    }

    #[test]
    fn script_errors_open_a_notice_and_return_to_editor() {
        let (_dir, mut app) = app_with_db();

        app.handle_key(KeyCode::Char('e')).unwrap();
        type_text(&mut app, "CREATE TABLE t (a);");
        assert!(app.handle_ctrl('r').unwrap());
        assert_eq!(app.tables.tables, ["t"]);
        assert_eq!(app.tables.output, "SQL executed successfully.");

        assert!(app.handle_ctrl('l').unwrap());
        type_text(&mut app, "INSERT INTO missing VALUES (1);");
        app.handle_key(KeyCode::F(5)).unwrap();
        assert!(matches!(app.mode, Mode::Notice { .. }));
        assert!(app.tables.output.contains("no such table: missing"));

        app.handle_key(KeyCode::Esc).unwrap();
        assert!(matches!(app.mode, Mode::EditingScript));
    }

    #[test]
    fn locked_database_keeps_the_app_running() {
        let (dir, mut app) = app_with_db();
        app.db
            .execute_script("CREATE TABLE t (a TEXT);")
            .unwrap();
        app.refresh_tables(None).unwrap();
        app.db
            .connection()
            .unwrap()
            .busy_timeout(Duration::ZERO)
            .unwrap();

        app.handle_key(KeyCode::Enter).unwrap();
        assert!(matches!(app.screen, Screen::TableView(_)));

        let holder = rusqlite::Connection::open(dir.path().join("app.db")).unwrap();
        holder.execute_batch("BEGIN EXCLUSIVE;").unwrap();

        app.handle_key(KeyCode::Esc).unwrap();
        assert!(matches!(app.screen, Screen::Tables));
        assert!(matches!(app.mode, Mode::Notice { .. }));
        app.handle_key(KeyCode::Enter).unwrap();

        app.handle_key(KeyCode::Char('r')).unwrap();
        let Mode::Notice { notice, .. } = &app.mode else {
            panic!("expected a notice");
        };
        assert_eq!(notice.title, "Refresh Failed");
        assert!(notice.message.contains("locked"));
        app.handle_key(KeyCode::Enter).unwrap();
        assert!(matches!(app.mode, Mode::Normal));

        holder.execute_batch("COMMIT;").unwrap();
        app.handle_key(KeyCode::Char('r')).unwrap();
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.tables.tables, ["t"]);
    }

    #[test]
    fn add_table_without_database_is_refused() {
        let mut app = App::new(DbManager::new()).unwrap();
        app.handle_key(KeyCode::Char('+')).unwrap();
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(
            app.status.as_ref().map(|status| status.text.as_str()),
            Some("No database is open.")
        );

        app.handle_key(KeyCode::Char('x')).unwrap();
        assert!(matches!(app.mode, Mode::Notice { .. }));
    }

    #[test]
    fn drop_table_after_confirmation() {
        let (_dir, mut app) = app_with_db();
        app.db
            .execute_script("CREATE TABLE a (x); CREATE TABLE b (y);")
            .unwrap();
        app.refresh_tables(None).unwrap();

        app.handle_key(KeyCode::Char('-')).unwrap();
        app.handle_key(KeyCode::Char('n')).unwrap();
        assert_eq!(app.tables.tables, ["a", "b"]);

        app.handle_key(KeyCode::Down).unwrap();
        app.handle_key(KeyCode::Char('-')).unwrap();
        app.handle_key(KeyCode::Char('y')).unwrap();
        assert_eq!(app.tables.tables, ["a"]);
    }

    #[test]
    fn export_and_open_via_path_prompts() {
        let (dir, mut app) = app_with_db();
        app.db
            .execute_script("CREATE TABLE t (a TEXT); INSERT INTO t VALUES ('v');")
            .unwrap();

        app.handle_key(KeyCode::Char('x')).unwrap();
        assert!(matches!(app.mode, Mode::ViewingDump(_)));
        app.handle_key(KeyCode::Char('s')).unwrap();
        let Mode::PromptingPath(prompt) = &app.mode else {
            panic!("expected path prompt");
        };
        let expected = dir.path().join("app.sql");
        assert_eq!(prompt.input, expected.display().to_string());
        app.handle_key(KeyCode::Enter).unwrap();
        assert!(std::fs::read_to_string(&expected)
            .unwrap()
            .contains("INSERT INTO \"t\" VALUES('v');"));

        app.handle_key(KeyCode::Char('o')).unwrap();
        type_text(&mut app, &dir.path().join("missing.db").display().to_string());
        app.handle_key(KeyCode::Enter).unwrap();
        assert!(matches!(app.mode, Mode::Notice { .. }));
        assert!(!app.db.is_connected());
        assert!(app.tables.tables.is_empty());

        app.handle_key(KeyCode::Enter).unwrap();
        let Mode::PromptingPath(prompt) = &mut app.mode else {
            panic!("expected the prompt to resume");
        };
        prompt.input = dir.path().join("app.db").display().to_string();
        app.handle_key(KeyCode::Enter).unwrap();
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.tables.tables, ["t"]);
    }

    #[test]
    fn renders_tables_and_grid() {
        let (_dir, mut app) = app_with_db();
        app.db
            .execute_script("CREATE TABLE people (id INTEGER, name TEXT); INSERT INTO people VALUES (1, 'ada');")
            .unwrap();
        app.refresh_tables(None).unwrap();

        let screen = render(&app);
        assert!(screen.contains("people"));
        assert!(screen.contains("New DB"));

        app.handle_key(KeyCode::Enter).unwrap();
        let screen = render(&app);
        assert!(screen.contains("RowID"));
        assert!(screen.contains("ada"));

        app.handle_key(KeyCode::Char('e')).unwrap();
        let screen = render(&app);
        assert!(screen.contains("Edit Row 1"));
        assert!(screen.contains("id (INTEGER)"));
    }
}
