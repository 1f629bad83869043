//! Main application logic for the terminal user interface.
//!
//! `App` owns the task store and both view controllers. Keys are routed by
//! `Mode` first and then by `Screen`; the table and board screens live in
//! their own modules as further `impl App` blocks. The store notifies a
//! dirty flag on every change, and the app re-derives cursors and pruned
//! selections from it after each key.

use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, TableState, Wrap},
    Frame, Terminal,
};
use tracing::debug;

use crate::error::Error;
use crate::fields::GroupBy;
use crate::store::TaskStore;
use crate::tui::{
    colors::{avatar_colors, priority_color, status_color, AMBER, EMERALD, ROSE, SKY},
    enums::{Mode, Screen},
    input::InputField,
    task_form::{
        TaskForm, ASSIGNEES_GLOBAL_ORDER, CUSTOM_FIELDS_GLOBAL_ORDER, DESCRIPTION_GLOBAL_ORDER,
        PRIORITY_GLOBAL_ORDER, STATUS_GLOBAL_ORDER, TITLE_GLOBAL_ORDER,
    },
    utils::centered_rect,
};
use crate::views::board::{BoardView, DropTarget};
use crate::views::table::TableView;
use crate::views::{save_draft, Notice, NoticeKind};

/// A delete waiting for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingDelete {
    One(u64),
    Selected,
}

/// Main application state for the terminal user interface.
pub struct App {
    pub(crate) store: TaskStore,
    dirty: Rc<Cell<bool>>,
    pub(crate) screen: Screen,
    pub(crate) mode: Mode,
    pub(crate) table: TableView,
    pub(crate) table_state: TableState,
    pub(crate) board: BoardView,
    pub(crate) board_column: usize,
    pub(crate) board_row: usize,
    pub(crate) drop_target: Option<DropTarget>,
    pub(crate) form: TaskForm,
    pub(crate) search: InputField,
    pub(crate) title_input: InputField,
    pub(crate) notice: Option<Notice>,
    pub(crate) confirm: Option<PendingDelete>,
    pub(crate) user_filter: Option<usize>,
}

impl App {
    pub fn new(mut store: TaskStore, screen: Screen, group_by: GroupBy) -> Self {
        let dirty = Rc::new(Cell::new(true));
        let flag = Rc::clone(&dirty);
        store.subscribe(move |_| flag.set(true));

        let mut app = App {
            store,
            dirty,
            screen,
            mode: Mode::Normal,
            table: TableView::new(),
            table_state: TableState::default(),
            board: BoardView::new(group_by),
            board_column: 0,
            board_row: 0,
            drop_target: None,
            form: TaskForm::new(),
            search: InputField::new(),
            title_input: InputField::new(),
            notice: None,
            confirm: None,
            user_filter: None,
        };
        app.sync();
        app
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Re-derive view state after the store changed.
    pub(crate) fn sync(&mut self) {
        if self.dirty.replace(false) {
            debug!(tasks = self.store.len(), "store changed, refreshing views");
            self.table.refresh(self.store.tasks());
            self.board.refresh(self.store.tasks());
        }
        self.clamp_table_cursor();
        self.clamp_board_cursor();
    }

    pub(crate) fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub(crate) fn open_add_form(&mut self, form: TaskForm) {
        self.form = form;
        self.mode = Mode::Form;
    }

    pub(crate) fn open_edit_form(&mut self, task_id: u64) {
        if let Some(task) = self.store.get(task_id) {
            self.form = TaskForm::from_task(task);
            self.mode = Mode::Form;
        }
    }

    fn begin_search(&mut self) {
        let current = match self.screen {
            Screen::Table => self.table.filter().search.clone(),
            Screen::Board => self.board.filter().search.clone(),
        };
        self.search = InputField::with_value(&current);
        self.search.active = true;
        self.mode = Mode::Search;
    }

    fn apply_search(&mut self) {
        match self.screen {
            Screen::Table => self.table.set_search(&self.search.value, self.store.tasks()),
            Screen::Board => {
                self.board.set_search(&self.search.value);
                self.board.refresh(self.store.tasks());
            }
        }
    }

    /// Route one key press. Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let quit = match self.mode {
            Mode::Help => {
                self.mode = Mode::Normal;
                false
            }
            Mode::Search => {
                self.handle_search_key(key.code);
                false
            }
            Mode::TitleEdit => {
                self.handle_title_edit_key(key.code);
                false
            }
            Mode::Form => {
                self.handle_form_key(key.code);
                false
            }
            Mode::Confirm => {
                self.handle_confirm_key(key.code);
                false
            }
            Mode::Normal => self.handle_normal_key(key.code),
        };
        self.sync();
        quit
    }

    fn handle_normal_key(&mut self, key: KeyCode) -> bool {
        let consumed = match self.screen {
            Screen::Table => self.handle_table_key(key),
            Screen::Board => self.handle_board_key(key),
        };
        if consumed {
            return false;
        }
        match key {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('?') | KeyCode::Char('h') => self.mode = Mode::Help,
            KeyCode::Tab => {
                self.screen = self.screen.toggled();
                self.notice = None;
            }
            KeyCode::Char('/') => self.begin_search(),
            KeyCode::Char('a') => self.open_add_form(TaskForm::new()),
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.search.clear();
                self.apply_search();
                self.mode = Mode::Normal;
            }
            KeyCode::Enter => self.mode = Mode::Normal,
            KeyCode::Backspace => {
                self.search.handle_backspace();
                self.apply_search();
            }
            KeyCode::Delete => {
                self.search.handle_delete();
                self.apply_search();
            }
            KeyCode::Left => self.search.move_cursor_left(),
            KeyCode::Right => self.search.move_cursor_right(),
            KeyCode::Char(c) => {
                self.search.handle_char(c);
                self.apply_search();
            }
            _ => {}
        }
    }

    fn handle_title_edit_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.table.cancel_title_edit();
                self.mode = Mode::Normal;
            }
            KeyCode::Enter => {
                if let Some(id) = self.table.editing_title() {
                    let text = self.title_input.value.clone();
                    if let Some(notice) = self.table.commit_title(&mut self.store, id, &text) {
                        self.set_notice(notice);
                    }
                }
                self.mode = Mode::Normal;
            }
            KeyCode::Backspace => self.title_input.handle_backspace(),
            KeyCode::Delete => self.title_input.handle_delete(),
            KeyCode::Left => self.title_input.move_cursor_left(),
            KeyCode::Right => self.title_input.move_cursor_right(),
            KeyCode::Home => self.title_input.move_home(),
            KeyCode::End => self.title_input.move_end(),
            KeyCode::Char(c) => self.title_input.handle_char(c),
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Tab | KeyCode::Down => self.form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.form.prev_field(),
            KeyCode::Left => self.form.handle_left_right(false),
            KeyCode::Right => self.form.handle_left_right(true),
            KeyCode::Backspace => self.form.handle_backspace(),
            KeyCode::Delete => self.form.handle_delete(),
            KeyCode::Enter => self.submit_form(),
            KeyCode::Char(c) => self.form.handle_char(c),
            _ => {}
        }
    }

    fn submit_form(&mut self) {
        let draft = match self.form.to_draft() {
            Ok(draft) => draft,
            Err(errors) => {
                self.form.errors = errors;
                self.set_notice(Notice::error("Please fix the highlighted fields"));
                return;
            }
        };
        match save_draft(&mut self.store, self.form.editing, draft) {
            Ok((_, notice)) => {
                self.mode = Mode::Normal;
                self.set_notice(notice);
            }
            Err(Error::Validation(errors)) => {
                self.form.errors = errors;
                self.set_notice(Notice::error("Please fix the highlighted fields"));
            }
            Err(e) => {
                self.mode = Mode::Normal;
                self.set_notice(Notice::error(e.to_string()));
            }
        }
    }

    pub(crate) fn request_delete(&mut self, pending: PendingDelete) {
        self.confirm = Some(pending);
        self.mode = Mode::Confirm;
    }

    fn handle_confirm_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let Some(pending) = self.confirm.take() {
                    self.perform_delete(pending);
                }
                self.mode = Mode::Normal;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm = None;
                self.mode = Mode::Normal;
            }
            _ => {}
        }
    }

    fn perform_delete(&mut self, pending: PendingDelete) {
        let notice = match (pending, self.screen) {
            (PendingDelete::One(id), Screen::Table) => self.table.delete_one(&mut self.store, id),
            (PendingDelete::One(id), Screen::Board) => self
                .store
                .delete(id)
                .then(|| Notice::success("Task deleted")),
            (PendingDelete::Selected, Screen::Table) => self.table.delete_selected(&mut self.store),
            (PendingDelete::Selected, Screen::Board) => self.board.delete_selected(&mut self.store),
        };
        if let Some(notice) = notice {
            self.set_notice(notice);
        }
    }

    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    return Ok(false);
                }
                if self.mode == Mode::Normal {
                    self.notice = None;
                }
                return Ok(self.handle_key(key));
            }
        }
        Ok(false)
    }

    // Rendering

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let context = match self.screen {
            Screen::Table => format!(
                "Table  sorted by {}  page {}",
                self.table.sort(),
                self.table.pager().page()
            ),
            Screen::Board => {
                let by = match self.board.group_by() {
                    GroupBy::Status => "status",
                    GroupBy::Priority => "priority",
                };
                format!("Board  grouped by {}  sorted by {}", by, self.board.sort())
            }
        };
        let header_text = vec![Line::from(vec![
            Span::styled("TASKBOARD", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                context,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ])];
        let header_block = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header_block, area);
    }

    fn render_form(&self, f: &mut Frame, area: Rect) {
        let area = centered_rect(70, 80, area);
        f.render_widget(Clear, area);
        let title = if self.form.is_edit() { "Edit Task" } else { "New Task" };
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(4), // Description
                Constraint::Length(3), // Status
                Constraint::Length(3), // Priority
                Constraint::Length(3), // Assignees
                Constraint::Length(3), // Custom fields
                Constraint::Min(1),    // Errors and help
            ])
            .split(inner);

        let field_block = |label: &str, order: usize, error: Option<&str>| {
            let style = if error.is_some() {
                Style::default().fg(ROSE)
            } else if self.form.current_field == order {
                Style::default().fg(AMBER)
            } else {
                Style::default()
            };
            let title = match error {
                Some(e) => format!("{} - {}", label, e),
                None => label.to_string(),
            };
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(style)
        };

        f.render_widget(
            Paragraph::new(self.form.title.display()).block(field_block(
                "Title *",
                TITLE_GLOBAL_ORDER,
                self.form.error_for("title"),
            )),
            chunks[0],
        );
        f.render_widget(
            Paragraph::new(self.form.description.display())
                .wrap(Wrap { trim: false })
                .block(field_block("Description", DESCRIPTION_GLOBAL_ORDER, None)),
            chunks[1],
        );

        let status = self.form.selected_status();
        f.render_widget(
            Paragraph::new(Line::from(vec![
                Span::raw("< "),
                Span::styled(status.label(), Style::default().fg(status_color(status))),
                Span::raw(" >"),
            ]))
            .block(field_block("Status", STATUS_GLOBAL_ORDER, None)),
            chunks[2],
        );

        let priority = self.form.selected_priority();
        f.render_widget(
            Paragraph::new(Line::from(vec![
                Span::raw("< "),
                Span::styled(priority.label(), Style::default().fg(priority_color(priority))),
                Span::raw(" >"),
            ]))
            .block(field_block("Priority", PRIORITY_GLOBAL_ORDER, None)),
            chunks[3],
        );

        let on_picker = self.form.current_field == ASSIGNEES_GLOBAL_ORDER;
        let mut spans = Vec::new();
        for (i, user) in self.form.directory.iter().enumerate() {
            let mark = if self.form.is_assigned(&user.id) { "[x]" } else { "[ ]" };
            let mut style = Style::default();
            if self.form.is_assigned(&user.id) {
                let (fg, bg) = avatar_colors(user);
                style = style.fg(fg).bg(bg);
            }
            if on_picker && i == self.form.assignee_cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(format!("{} {}", mark, user.name), style));
            spans.push(Span::raw("  "));
        }
        f.render_widget(
            Paragraph::new(Line::from(spans)).block(field_block(
                "Assignees (Left/Right, Space)",
                ASSIGNEES_GLOBAL_ORDER,
                self.form.error_for("assignees"),
            )),
            chunks[4],
        );

        f.render_widget(
            Paragraph::new(self.form.custom_fields.display()).block(field_block(
                "Custom fields (id:type=value; ...)",
                CUSTOM_FIELDS_GLOBAL_ORDER,
                self.form.error_for("customFields"),
            )),
            chunks[5],
        );

        let mut help: Vec<Line> = self
            .form
            .errors
            .iter()
            .map(|e| {
                Line::from(Span::styled(
                    format!("{}: {}", e.field, e.message),
                    Style::default().fg(ROSE),
                ))
            })
            .collect();
        help.push(Line::from("Tab/Up/Down: field | Left/Right: change | Enter: save | Esc: cancel"));
        f.render_widget(Paragraph::new(help).wrap(Wrap { trim: true }), chunks[6]);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let area = centered_rect(70, 80, area);
        f.render_widget(Clear, area);
        let lines = vec![
            Line::from(Span::styled("Everywhere", Style::default().add_modifier(Modifier::BOLD))),
            Line::from("  Tab          switch between table and board"),
            Line::from("  /            search titles"),
            Line::from("  a            add a task"),
            Line::from("  e, Enter     edit the highlighted task"),
            Line::from("  d            delete the highlighted task"),
            Line::from("  v            selection mode   Space  select   A  select all   X  delete selected"),
            Line::from("  T S P C      sort by title, status, priority, created (again to flip)"),
            Line::from("  q, Esc       quit"),
            Line::from(""),
            Line::from(Span::styled("Table", Style::default().add_modifier(Modifier::BOLD))),
            Line::from("  Up/Down      move   Left/Right  previous/next page"),
            Line::from("  1 2 3        filter status   4-8  filter priority (none .. urgent)"),
            Line::from("  u            cycle assignee filter   x  clear status/priority filters"),
            Line::from("  r            rename inline"),
            Line::from(""),
            Line::from(Span::styled("Board", Style::default().add_modifier(Modifier::BOLD))),
            Line::from("  Arrows       move between cards"),
            Line::from("  m            pick up card, arrows to aim, Enter to drop, Esc to cancel"),
            Line::from("  g            group by status / priority"),
            Line::from("  A            select the whole column"),
            Line::from(""),
            Line::from("Press any key to close"),
        ];
        let help = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: false });
        f.render_widget(help, area);
    }

    fn render_confirm(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("Confirm Action")
            .borders(Borders::ALL)
            .style(Style::default().bg(Color::Rgb(114, 0, 0)));

        let area = centered_rect(50, 20, area);
        f.render_widget(Clear, area);

        let what = match self.confirm {
            Some(PendingDelete::One(id)) => match self.store.get(id) {
                Some(task) => format!("Delete \"{}\"?", task.title),
                None => "Delete this task?".to_string(),
            },
            Some(PendingDelete::Selected) => {
                let count = match self.screen {
                    Screen::Table => self.table.selection().len(),
                    Screen::Board => self.board.selection().len(),
                };
                format!("Delete {} selected tasks?", count)
            }
            None => String::new(),
        };
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(what, Style::default().add_modifier(Modifier::BOLD))),
            Line::from(""),
            Line::from("This action cannot be undone."),
            Line::from(""),
            Line::from("Press 'y' to confirm, 'n' to cancel"),
        ];
        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let (text, bg) = if let Some(notice) = &self.notice {
            let bg = match notice.kind {
                NoticeKind::Success => EMERALD,
                NoticeKind::Error => ROSE,
            };
            (notice.message.clone(), bg)
        } else {
            let text = match self.mode {
                Mode::Search => format!(
                    "Search: {} (Enter to keep, Esc to clear)",
                    self.search.display()
                ),
                Mode::TitleEdit => "Rename: Enter to save, Esc to cancel".to_string(),
                Mode::Form => "Editing task".to_string(),
                Mode::Help => "Help".to_string(),
                Mode::Confirm => "Confirm Action".to_string(),
                Mode::Normal => self.normal_status_text(),
            };
            (text, SKY)
        };
        let status = Paragraph::new(text)
            .style(Style::default().bg(bg).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    fn normal_status_text(&self) -> String {
        match self.screen {
            Screen::Table => {
                let selection = self.table.selection();
                if selection.is_active() {
                    format!(
                        "{} selected | Space: toggle | A: page | X: delete | v: done",
                        selection.len()
                    )
                } else {
                    format!(
                        "Tasks: {} of {} | Tab: board | /: search | a: add | ?: help",
                        self.table.rows(self.store.tasks()).len(),
                        self.store.len()
                    )
                }
            }
            Screen::Board => {
                let selection = self.board.selection();
                if self.drop_target.is_some() {
                    "Moving card | arrows: aim | Enter: drop | Esc: cancel".to_string()
                } else if selection.is_active() {
                    format!(
                        "{} selected | Space: toggle | A: column | X: delete | v: done",
                        selection.len()
                    )
                } else {
                    format!(
                        "Tasks: {} | Tab: table | m: move | g: group | ?: help",
                        self.store.len()
                    )
                }
            }
        }
    }

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Screen
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        match self.screen {
            Screen::Table => self.render_table(f, chunks[1]),
            Screen::Board => self.render_board(f, chunks[1]),
        }
        match self.mode {
            Mode::Form => self.render_form(f, chunks[1]),
            Mode::Help => self.render_help(f, chunks[1]),
            Mode::Confirm => self.render_confirm(f, chunks[1]),
            _ => {}
        }
        self.render_status_bar(f, chunks[2]);
    }

    /// Main event loop for the TUI application.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}
