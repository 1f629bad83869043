//! Table screen: key handling and rendering for the paginated task table.

use chrono::Local;
use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::fields::*;
use crate::task::Task;
use crate::tui::{
    app::{App, PendingDelete},
    colors::{avatar_colors, priority_color, status_color, AMBER},
    enums::Mode,
    input::InputField,
    utils::clip,
};
use crate::users;

impl App {
    /// Ids on the current table page, in display order.
    pub(crate) fn table_page_ids(&self) -> Vec<u64> {
        self.table
            .page_rows(self.store.tasks())
            .iter()
            .map(|t| t.id)
            .collect()
    }

    pub(crate) fn selected_table_task(&self) -> Option<u64> {
        let ids = self.table_page_ids();
        self.table_state.selected().and_then(|i| ids.get(i).copied())
    }

    pub(crate) fn clamp_table_cursor(&mut self) {
        let len = self.table_page_ids().len();
        if len == 0 {
            self.table_state.select(None);
        } else {
            let i = self.table_state.selected().unwrap_or(0).min(len - 1);
            self.table_state.select(Some(i));
        }
    }

    fn move_table_cursor(&mut self, down: bool) {
        let len = self.table_page_ids().len();
        if len == 0 {
            return;
        }
        let i = self.table_state.selected().unwrap_or(0);
        let next = if down { (i + 1).min(len - 1) } else { i.saturating_sub(1) };
        self.table_state.select(Some(next));
    }

    /// Select the next directory user as the only assignee filter; after
    /// the last user the assignee filter is cleared.
    fn cycle_user_filter(&mut self) {
        let directory = users::directory();
        let next = match self.user_filter {
            None => Some(0),
            Some(i) if i + 1 < directory.len() => Some(i + 1),
            Some(_) => None,
        };
        let mut filter = self.table.filter().clone();
        filter.users = next
            .map(|i| vec![directory[i].id.clone()])
            .unwrap_or_default();
        self.table.set_filter(filter, self.store.tasks());
        self.user_filter = next;
    }

    fn sort_table(&mut self, field: SortField) {
        self.table.sort_by(field, self.store.tasks());
    }

    /// Keys for the table screen. Returns false for keys left to the
    /// global handler.
    pub(crate) fn handle_table_key(&mut self, key: KeyCode) -> bool {
        let selecting = self.table.selection().is_active();
        match key {
            KeyCode::Up => self.move_table_cursor(false),
            KeyCode::Down => self.move_table_cursor(true),
            KeyCode::Left | KeyCode::PageUp => {
                self.table.prev_page(self.store.tasks());
                self.table_state.select(Some(0));
            }
            KeyCode::Right | KeyCode::PageDown => {
                self.table.next_page(self.store.tasks());
                self.table_state.select(Some(0));
            }

            KeyCode::Char('1') => self.table.toggle_status_filter(Status::NotStarted, self.store.tasks()),
            KeyCode::Char('2') => self.table.toggle_status_filter(Status::InProgress, self.store.tasks()),
            KeyCode::Char('3') => self.table.toggle_status_filter(Status::Completed, self.store.tasks()),
            KeyCode::Char('4') => self.table.toggle_priority_filter(Priority::None, self.store.tasks()),
            KeyCode::Char('5') => self.table.toggle_priority_filter(Priority::Low, self.store.tasks()),
            KeyCode::Char('6') => self.table.toggle_priority_filter(Priority::Medium, self.store.tasks()),
            KeyCode::Char('7') => self.table.toggle_priority_filter(Priority::High, self.store.tasks()),
            KeyCode::Char('8') => self.table.toggle_priority_filter(Priority::Urgent, self.store.tasks()),
            KeyCode::Char('u') => self.cycle_user_filter(),
            KeyCode::Char('x') => self.table.clear_filters(self.store.tasks()),

            KeyCode::Char('T') => self.sort_table(SortField::Title),
            KeyCode::Char('S') => self.sort_table(SortField::Status),
            KeyCode::Char('P') => self.sort_table(SortField::Priority),
            KeyCode::Char('C') => self.sort_table(SortField::Created),

            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(id) = self.selected_table_task() {
                    self.open_edit_form(id);
                }
            }
            KeyCode::Char('r') => {
                if let Some(id) = self.selected_table_task() {
                    let title = self.store.get(id).map(|t| t.title.clone()).unwrap_or_default();
                    self.table.begin_title_edit(id);
                    self.title_input = InputField::with_value(&title);
                    self.title_input.active = true;
                    self.mode = Mode::TitleEdit;
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_table_task() {
                    self.request_delete(PendingDelete::One(id));
                }
            }

            KeyCode::Char('v') => {
                if selecting {
                    self.table.exit_selection();
                } else {
                    self.table.enter_selection();
                }
            }
            KeyCode::Char(' ') => {
                if let Some(id) = self.selected_table_task() {
                    self.table.toggle_selected(id);
                }
            }
            KeyCode::Char('A') => self.table.toggle_select_all(self.store.tasks()),
            KeyCode::Char('X') => {
                if !self.table.selection().is_empty() {
                    self.request_delete(PendingDelete::Selected);
                }
            }
            KeyCode::Esc if selecting => self.table.exit_selection(),
            _ => return false,
        }
        true
    }

    fn filter_summary(&self) -> Line<'static> {
        let filter = self.table.filter();
        let mut spans = vec![Span::styled(
            "Filters: ",
            Style::default().add_modifier(Modifier::BOLD),
        )];
        let mut any = false;
        if !filter.search.is_empty() {
            spans.push(Span::raw(format!("\"{}\" ", filter.search)));
            any = true;
        }
        for s in &filter.statuses {
            spans.push(Span::styled(
                format!("[{}] ", s.label()),
                Style::default().fg(status_color(*s)),
            ));
            any = true;
        }
        for p in &filter.priorities {
            spans.push(Span::styled(
                format!("[{}] ", p.label()),
                Style::default().fg(priority_color(*p)),
            ));
            any = true;
        }
        for u in &filter.users {
            let name = users::find(u).map(|u| u.name).unwrap_or_else(|| u.clone());
            spans.push(Span::raw(format!("@{} ", name)));
            any = true;
        }
        if !any {
            spans.push(Span::styled("none", Style::default().fg(Color::DarkGray)));
        }
        if self.table.has_clearable_filters() {
            spans.push(Span::styled(
                "  (x to clear)",
                Style::default().fg(Color::DarkGray),
            ));
        }
        Line::from(spans)
    }

    fn sort_marker(&self, field: SortField) -> &'static str {
        let sort = self.table.sort();
        if sort.field != field {
            ""
        } else if sort.direction == SortDirection::Asc {
            " ▲"
        } else {
            " ▼"
        }
    }

    fn table_row(&self, task: &Task, title_width: usize) -> Row<'static> {
        let selecting = self.table.selection().is_active();
        let check = if self.table.selection().contains(task.id) { "[x]" } else { "[ ]" };

        let title = if self.table.editing_title() == Some(task.id) {
            Cell::from(self.title_input.display()).style(Style::default().fg(AMBER))
        } else {
            Cell::from(clip(&task.title, title_width))
        };

        let mut assignees = Vec::new();
        for a in &task.assignees {
            let (fg, bg) = avatar_colors(a);
            assignees.push(Span::styled(a.initials(), Style::default().fg(fg).bg(bg)));
            assignees.push(Span::raw(" "));
        }

        let mut cells = Vec::new();
        if selecting {
            cells.push(Cell::from(check));
        }
        cells.push(title);
        cells.push(
            Cell::from(task.status.label()).style(Style::default().fg(status_color(task.status))),
        );
        cells.push(
            Cell::from(task.priority.label())
                .style(Style::default().fg(priority_color(task.priority))),
        );
        cells.push(Cell::from(Line::from(assignees)));
        cells.push(Cell::from(
            task.created_at
                .with_timezone(&Local)
                .format("%b %d, %Y")
                .to_string(),
        ));
        Row::new(cells)
    }

    pub(crate) fn render_table(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Filters
                Constraint::Min(0),    // Table
                Constraint::Length(1), // Pagination
            ])
            .split(area);

        f.render_widget(Paragraph::new(self.filter_summary()), chunks[0]);

        let selecting = self.table.selection().is_active();
        let title_width = chunks[1].width.saturating_sub(60).max(12) as usize;

        let mut header_cells = Vec::new();
        if selecting {
            let all = if self.table.all_visible_selected(self.store.tasks()) {
                "[x]"
            } else {
                "[ ]"
            };
            header_cells.push(all.to_string());
        }
        header_cells.push(format!("Title{}", self.sort_marker(SortField::Title)));
        header_cells.push(format!("Status{}", self.sort_marker(SortField::Status)));
        header_cells.push(format!("Priority{}", self.sort_marker(SortField::Priority)));
        header_cells.push("Assignees".to_string());
        header_cells.push(format!("Created{}", self.sort_marker(SortField::Created)));
        let header = Row::new(
            header_cells
                .into_iter()
                .map(|h| Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD))),
        )
        .style(Style::default().bg(Color::DarkGray).fg(Color::White))
        .height(1);

        let rows_data = self.table.page_rows(self.store.tasks());
        let total = self.table.rows(self.store.tasks()).len();
        let rows: Vec<Row> = rows_data
            .iter()
            .map(|task| self.table_row(task, title_width))
            .collect();

        let mut widths = Vec::new();
        if selecting {
            widths.push(Constraint::Length(3));
        }
        widths.extend([
            Constraint::Min(12),    // Title
            Constraint::Length(13), // Status
            Constraint::Length(10), // Priority
            Constraint::Length(16), // Assignees
            Constraint::Length(14), // Created
        ]);

        let block_title = if rows_data.is_empty() {
            "Tasks - no tasks found".to_string()
        } else {
            format!("Tasks ({}/{})", total, self.store.len())
        };
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(block_title))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");
        f.render_stateful_widget(table, chunks[1], &mut self.table_state);

        let pager = self.table.pager();
        let prev = if pager.has_prev() { "< prev" } else { "      " };
        let next = if self.table.has_next_page(self.store.tasks()) {
            "next >"
        } else {
            ""
        };
        let footer = format!(
            "{}  page {} of {}  {}",
            prev,
            pager.page(),
            pager.page_count(total),
            next
        );
        f.render_widget(Paragraph::new(footer), chunks[2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::app::tests::{app_with, press, type_text};
    use crate::tui::enums::Screen;

    #[test]
    fn test_cursor_and_paging() {
        let titles: Vec<String> = (1..=12).map(|i| format!("Task {}", i)).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let mut app = app_with(&refs, Screen::Table);
        assert_eq!(app.table_state.selected(), Some(0));
        press(&mut app, KeyCode::Up);
        assert_eq!(app.table_state.selected(), Some(0));
        press(&mut app, KeyCode::Right);
        assert_eq!(app.table.pager().page(), 2);
        assert_eq!(app.table_page_ids().len(), 2);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.table_state.selected(), Some(1));
    }

    #[test]
    fn test_status_filter_keys() {
        let mut app = app_with(&["One", "Two"], Screen::Table);
        press(&mut app, KeyCode::Char('2'));
        assert!(app.table_page_ids().is_empty());
        assert_eq!(app.table_state.selected(), None);
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.table_page_ids().len(), 2);
        press(&mut app, KeyCode::Char('x'));
        assert!(app.table.filter().statuses.is_empty());
    }

    #[test]
    fn test_user_filter_cycles_back_to_none() {
        let mut app = app_with(&["One"], Screen::Table);
        let count = users::directory().len();
        for _ in 0..count {
            press(&mut app, KeyCode::Char('u'));
            assert_eq!(app.table.filter().users.len(), 1);
        }
        press(&mut app, KeyCode::Char('u'));
        assert!(app.table.filter().users.is_empty());
    }

    #[test]
    fn test_inline_rename() {
        let mut app = app_with(&["Old"], Screen::Table);
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.mode, Mode::TitleEdit);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "New");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.store().tasks()[0].title, "New");
        assert_eq!(app.notice.as_ref().unwrap().message, "Task title updated!");
    }

    #[test]
    fn test_bulk_delete_from_table() {
        let mut app = app_with(&["a", "b", "c"], Screen::Table);
        press(&mut app, KeyCode::Char('v'));
        assert!(app.table.selection().is_active());
        press(&mut app, KeyCode::Char('A'));
        assert_eq!(app.table.selection().len(), 3);
        press(&mut app, KeyCode::Char('X'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.store().is_empty());
        assert_eq!(app.notice.as_ref().unwrap().message, "3 tasks deleted");
        assert!(!app.table.selection().is_active());
    }

    #[test]
    fn test_status_filter_then_bulk_delete_keeps_hidden_tasks() {
        let mut app = app_with(&["a", "b"], Screen::Table);
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.table.selection().len(), 1);
        press(&mut app, KeyCode::Char('3'));
        assert!(app.table.selection().is_empty());
        press(&mut app, KeyCode::Char('X'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.store().len(), 2);
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_search_then_bulk_delete_only_removes_matches() {
        let mut app = app_with(&["Alpha", "Beta"], Screen::Table);
        press(&mut app, KeyCode::Char('A'));
        assert_eq!(app.table.selection().len(), 2);
        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "alp");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.table.selection().len(), 1);
        press(&mut app, KeyCode::Char('X'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.notice.as_ref().unwrap().message, "1 task deleted");
        let titles: Vec<&str> = app.store().tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Beta"]);
    }

    #[test]
    fn test_escape_leaves_selection_before_quitting() {
        let mut app = app_with(&["a"], Screen::Table);
        press(&mut app, KeyCode::Char(' '));
        assert!(app.table.selection().is_active());
        assert!(!press(&mut app, KeyCode::Esc));
        assert!(!app.table.selection().is_active());
        assert!(press(&mut app, KeyCode::Esc));
    }

    #[test]
    fn test_sort_keys_toggle() {
        let mut app = app_with(&["b", "a"], Screen::Table);
        press(&mut app, KeyCode::Char('T'));
        let first = app.table_page_ids()[0];
        assert_eq!(app.store().get(first).unwrap().title, "a");
        press(&mut app, KeyCode::Char('T'));
        let first = app.table_page_ids()[0];
        assert_eq!(app.store().get(first).unwrap().title, "b");
    }
}
