//! Board screen: columns of cards grouped by status or priority, with
//! keyboard drag and drop between columns.

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::engine::{Bucket, BucketKey};
use crate::fields::*;
use crate::task::Task;
use crate::tui::{
    app::{App, PendingDelete},
    colors::{avatar_colors, priority_color, status_color, AMBER, SKY},
    task_form::TaskForm,
    utils::wrap_words,
};
use crate::views::board::{DragState, DropTarget};
use crate::views::Notice;

const CARD_HEIGHT: u16 = 5;

impl App {
    fn board_buckets(&self) -> Vec<Bucket<'_>> {
        self.board.buckets(self.store.tasks())
    }

    fn column_key(&self, column: usize) -> Option<BucketKey> {
        BucketKey::all(self.board.group_by()).get(column).copied()
    }

    fn column_len(&self, column: usize) -> usize {
        self.board_buckets()
            .get(column)
            .map_or(0, |b| b.tasks.len())
    }

    pub(crate) fn selected_board_task(&self) -> Option<u64> {
        self.board_buckets()
            .get(self.board_column)
            .and_then(|b| b.tasks.get(self.board_row))
            .map(|t| t.id)
    }

    pub(crate) fn clamp_board_cursor(&mut self) {
        let columns = BucketKey::all(self.board.group_by()).len();
        self.board_column = self.board_column.min(columns.saturating_sub(1));
        self.board_row = self
            .board_row
            .min(self.column_len(self.board_column).saturating_sub(1));
        if self.board.drag() == DragState::Idle {
            self.drop_target = None;
        }
    }

    /// Put the cursor on a card, wherever it is now.
    fn focus_card(&mut self, task_id: u64) {
        if let Some((key, index)) = self.board.locate(self.store.tasks(), task_id) {
            let keys = BucketKey::all(self.board.group_by());
            if let Some(column) = keys.iter().position(|k| *k == key) {
                self.board_column = column;
                self.board_row = index;
            }
        }
    }

    fn move_board_cursor(&mut self, dx: i32, dy: i32) {
        let columns = BucketKey::all(self.board.group_by()).len() as i32;
        let column = (self.board_column as i32 + dx).clamp(0, columns - 1) as usize;
        if column != self.board_column {
            self.board_column = column;
            self.board_row = self.board_row.min(self.column_len(column).saturating_sub(1));
        }
        let len = self.column_len(self.board_column) as i32;
        self.board_row = (self.board_row as i32 + dy).clamp(0, (len - 1).max(0)) as usize;
    }

    fn move_drop_target(&mut self, dx: i32, dy: i32) {
        let Some(target) = self.drop_target else {
            return;
        };
        let keys = BucketKey::all(self.board.group_by());
        let current = keys.iter().position(|k| *k == target.bucket).unwrap_or(0);
        let column = (current as i32 + dx).clamp(0, keys.len() as i32 - 1) as usize;
        let len = self.column_len(column);
        let index = if column == current {
            (target.index as i32 + dy).clamp(0, len as i32) as usize
        } else {
            // Back in its own column the card returns to where it was picked up.
            match self.board.drag() {
                DragState::Dragging(origin) if origin.bucket == keys[column] => origin.index,
                _ => len,
            }
        };
        self.drop_target = Some(DropTarget {
            bucket: keys[column],
            index,
        });
    }

    fn drop_card(&mut self) {
        let target = self.drop_target.take();
        let dragged = match self.board.drag() {
            DragState::Dragging(origin) => Some(origin.task_id),
            DragState::Idle => None,
        };
        let outcome = self.board.drop_on(&mut self.store, target);
        if let Some(notice) = outcome.notice() {
            self.set_notice(notice);
        }
        if let Some(id) = dragged {
            self.focus_card(id);
        }
    }

    fn toggle_group_by(&mut self) {
        let next = match self.board.group_by() {
            GroupBy::Status => GroupBy::Priority,
            GroupBy::Priority => GroupBy::Status,
        };
        self.board.set_group_by(next);
        self.drop_target = None;
        self.board_column = 0;
        self.board_row = 0;
    }

    fn sort_board(&mut self, field: SortField) {
        let sort = self.board.sort().toggled(field);
        self.board.set_sort(sort);
    }

    /// Keys for the board screen. Returns false for keys left to the
    /// global handler.
    pub(crate) fn handle_board_key(&mut self, key: KeyCode) -> bool {
        if self.drop_target.is_some() {
            match key {
                KeyCode::Left => self.move_drop_target(-1, 0),
                KeyCode::Right => self.move_drop_target(1, 0),
                KeyCode::Up => self.move_drop_target(0, -1),
                KeyCode::Down => self.move_drop_target(0, 1),
                KeyCode::Enter | KeyCode::Char('m') => self.drop_card(),
                KeyCode::Esc => {
                    self.board.cancel_drag();
                    self.drop_target = None;
                }
                _ => {}
            }
            return true;
        }

        let selecting = self.board.selection().is_active();
        match key {
            KeyCode::Left => self.move_board_cursor(-1, 0),
            KeyCode::Right => self.move_board_cursor(1, 0),
            KeyCode::Up => self.move_board_cursor(0, -1),
            KeyCode::Down => self.move_board_cursor(0, 1),

            KeyCode::Char('m') => {
                if let Some(id) = self.selected_board_task() {
                    if self.board.begin_drag(self.store.tasks(), id) {
                        if let Some(bucket) = self.column_key(self.board_column) {
                            self.drop_target = Some(DropTarget {
                                bucket,
                                index: self.board_row,
                            });
                        }
                    } else {
                        self.set_notice(Notice::error("Leave selection mode to move cards"));
                    }
                }
            }
            KeyCode::Char('g') => self.toggle_group_by(),

            KeyCode::Char('T') => self.sort_board(SortField::Title),
            KeyCode::Char('S') => self.sort_board(SortField::Status),
            KeyCode::Char('P') => self.sort_board(SortField::Priority),
            KeyCode::Char('C') => self.sort_board(SortField::Created),

            KeyCode::Char('a') => {
                let form = match self.column_key(self.board_column) {
                    Some(key) => TaskForm::for_bucket(key),
                    None => TaskForm::new(),
                };
                self.open_add_form(form);
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(id) = self.selected_board_task() {
                    self.open_edit_form(id);
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_board_task() {
                    self.request_delete(PendingDelete::One(id));
                }
            }

            KeyCode::Char('v') => {
                if selecting {
                    self.board.exit_selection_mode();
                } else {
                    self.board.enter_selection_mode();
                }
            }
            KeyCode::Char(' ') => {
                if let Some(id) = self.selected_board_task() {
                    self.board.toggle_selected(id);
                }
            }
            KeyCode::Char('A') => {
                if let Some(key) = self.column_key(self.board_column) {
                    self.board.toggle_select_bucket(self.store.tasks(), key);
                }
            }
            KeyCode::Char('X') => {
                if !self.board.selection().is_empty() {
                    self.request_delete(PendingDelete::Selected);
                }
            }
            KeyCode::Esc if selecting => self.board.exit_selection_mode(),
            _ => return false,
        }
        true
    }

    pub(crate) fn render_board(&mut self, f: &mut Frame, area: Rect) {
        let buckets = self.board_buckets();
        let count = buckets.len().max(1) as u32;
        let constraints: Vec<Constraint> = (0..count).map(|_| Constraint::Ratio(1, count)).collect();
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        for (i, bucket) in buckets.iter().enumerate() {
            self.render_column(f, columns[i], i, bucket);
        }
    }

    fn render_column(&self, f: &mut Frame, area: Rect, column: usize, bucket: &Bucket<'_>) {
        let is_cursor_column = column == self.board_column;
        let target = self.drop_target.filter(|t| t.bucket == bucket.key);

        let border_style = if target.is_some() {
            Style::default().fg(AMBER).add_modifier(Modifier::BOLD)
        } else if is_cursor_column && self.drop_target.is_none() {
            Style::default().fg(SKY).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let accent = match bucket.key {
            BucketKey::Status(s) => status_color(s),
            BucketKey::Priority(p) => priority_color(p),
        };
        let mut title = vec![
            Span::styled("● ", Style::default().fg(accent)),
            Span::raw(format!("{} ({})", bucket.key.label(), bucket.tasks.len())),
        ];
        if let Some(t) = target {
            title.push(Span::styled(
                format!(" drop at {}", t.index + 1),
                Style::default().fg(AMBER),
            ));
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .title(Line::from(title))
            .border_style(border_style);
        let inner = block.inner(area);
        f.render_widget(block, area);

        if bucket.tasks.is_empty() {
            let hint = Paragraph::new("No tasks").style(Style::default().fg(Color::DarkGray));
            f.render_widget(hint, inner);
            return;
        }

        let visible = (inner.height / CARD_HEIGHT).max(1) as usize;
        let focus = match target {
            Some(t) => t.index,
            None if is_cursor_column => self.board_row,
            None => 0,
        };
        let offset = focus.saturating_sub(visible - 1);

        for (slot, (index, task)) in bucket
            .tasks
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible)
            .enumerate()
        {
            let card_area = Rect {
                x: inner.x,
                y: inner.y + slot as u16 * CARD_HEIGHT,
                width: inner.width,
                height: CARD_HEIGHT.min(inner.height.saturating_sub(slot as u16 * CARD_HEIGHT)),
            };
            let highlighted =
                is_cursor_column && self.drop_target.is_none() && index == self.board_row;
            self.render_card(f, card_area, task, highlighted);
        }

        if offset > 0 {
            let indicator = Paragraph::new(format!("▲ +{} above", offset))
                .style(Style::default().fg(Color::Cyan));
            f.render_widget(indicator, Rect { height: 1, ..inner });
        }
        let remaining = bucket.tasks.len().saturating_sub(offset + visible);
        if remaining > 0 && inner.height > 0 {
            let indicator = Paragraph::new(format!("▼ +{} below", remaining))
                .style(Style::default().fg(Color::Cyan));
            f.render_widget(
                indicator,
                Rect {
                    y: inner.y + inner.height - 1,
                    height: 1,
                    ..inner
                },
            );
        }
    }

    fn render_card(&self, f: &mut Frame, area: Rect, task: &Task, highlighted: bool) {
        let dragging = matches!(
            self.board.drag(),
            DragState::Dragging(origin) if origin.task_id == task.id
        );
        let selected = self.board.selection().contains(task.id);

        let style = if dragging {
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM)
        } else if highlighted {
            Style::default().bg(SKY).fg(Color::Black).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let mut first = Vec::new();
        if self.board.selection().is_active() {
            first.push(Span::raw(if selected { "[x] " } else { "[ ] " }));
        }
        first.push(Span::raw(format!("#{} ", task.id)));
        match self.board.group_by() {
            GroupBy::Status => first.push(Span::styled(
                task.priority.label(),
                Style::default().fg(priority_color(task.priority)),
            )),
            GroupBy::Priority => first.push(Span::styled(
                task.status.label(),
                Style::default().fg(status_color(task.status)),
            )),
        }

        let mut lines = vec![Line::from(first)];
        let width = area.width.saturating_sub(2) as usize;
        for line in wrap_words(&task.title, width, 1) {
            lines.push(Line::from(line));
        }
        let mut avatars = Vec::new();
        for a in &task.assignees {
            let (fg, bg) = avatar_colors(a);
            avatars.push(Span::styled(a.initials(), Style::default().fg(fg).bg(bg)));
            avatars.push(Span::raw(" "));
        }
        lines.push(Line::from(avatars));

        let border = if selected {
            Style::default().fg(AMBER)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let card = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).border_style(border))
            .style(style);
        f.render_widget(card, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::app::tests::{app_with, press};
    use crate::tui::enums::{Mode, Screen};

    #[test]
    fn test_drag_card_to_next_column() {
        let mut app = app_with(&["Card"], Screen::Board);
        let id = app.selected_board_task().unwrap();
        press(&mut app, KeyCode::Char('m'));
        assert!(app.drop_target.is_some());
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store().get(id).unwrap().status, Status::InProgress);
        assert_eq!(app.notice.as_ref().unwrap().message, "Moved task to In Progress");
        assert_eq!(app.board_column, 1);
        assert_eq!(app.selected_board_task(), Some(id));
    }

    #[test]
    fn test_escape_cancels_drag() {
        let mut app = app_with(&["Card"], Screen::Board);
        press(&mut app, KeyCode::Char('m'));
        press(&mut app, KeyCode::Right);
        assert!(!press(&mut app, KeyCode::Esc));
        assert!(app.drop_target.is_none());
        assert_eq!(app.board.drag(), DragState::Idle);
        assert_eq!(app.store().tasks()[0].status, Status::NotStarted);
    }

    #[test]
    fn test_drop_in_same_column_changes_nothing() {
        let mut app = app_with(&["One", "Two"], Screen::Board);
        let before = app.store().tasks().to_vec();
        press(&mut app, KeyCode::Char('m'));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store().tasks(), before.as_slice());
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_returning_to_origin_column_restores_index() {
        let mut app = app_with(&["One", "Two"], Screen::Board);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char('m'));
        let origin = app.drop_target;
        assert_eq!(origin.map(|t| t.index), Some(1));

        press(&mut app, KeyCode::Right);
        assert_eq!(app.drop_target.map(|t| t.index), Some(0));
        press(&mut app, KeyCode::Left);
        assert_eq!(app.drop_target, origin);

        let before = app.store().tasks().to_vec();
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store().tasks(), before.as_slice());
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_group_by_priority_and_move() {
        let mut app = app_with(&["Card"], Screen::Board);
        press(&mut app, KeyCode::Char('g'));
        assert_eq!(app.board.group_by(), GroupBy::Priority);
        // Columns run urgent .. none; the new card sits in the last one.
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        let id = app.selected_board_task().unwrap();
        press(&mut app, KeyCode::Char('m'));
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store().get(id).unwrap().priority, Priority::Low);
    }

    #[test]
    fn test_selection_blocks_drag_and_bulk_deletes() {
        let mut app = app_with(&["a", "b"], Screen::Board);
        press(&mut app, KeyCode::Char('v'));
        press(&mut app, KeyCode::Char('m'));
        assert!(app.drop_target.is_none());
        assert_eq!(app.notice.as_ref().unwrap().kind, crate::views::NoticeKind::Error);

        press(&mut app, KeyCode::Char('A'));
        assert_eq!(app.board.selection().len(), 2);
        press(&mut app, KeyCode::Char('X'));
        assert_eq!(app.mode, Mode::Confirm);
        press(&mut app, KeyCode::Char('y'));
        assert!(app.store().is_empty());
        assert_eq!(app.notice.as_ref().unwrap().message, "2 tasks deleted");
    }

    #[test]
    fn test_add_presets_column() {
        let mut app = app_with(&[], Screen::Board);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.mode, Mode::Form);
        assert_eq!(app.form.selected_status(), Status::Completed);
    }
}
