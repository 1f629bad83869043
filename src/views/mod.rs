//! View controllers for the table and board screens.
//!
//! Controllers hold transient UI state (filters, sort key, page, selection,
//! drag) and derive what to display from the store on demand. They never
//! touch a task directly: every change goes through `TaskStore`.

pub mod board;
pub mod table;

use std::collections::BTreeSet;

use crate::editor::TaskDraft;
use crate::error::{Error, Result};
use crate::store::TaskStore;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient, user-facing outcome of an action (toast / status bar text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    /// "1 task deleted" / "3 tasks deleted".
    pub fn deleted(count: usize) -> Self {
        let noun = if count == 1 { "task" } else { "tasks" };
        Notice::success(format!("{} {} deleted", count, noun))
    }
}

/// Multi-select state for bulk operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    active: bool,
    ids: BTreeSet<u64>,
}

impl Selection {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn enter(&mut self) {
        self.active = true;
    }

    /// Leave selection mode, dropping any selected ids.
    pub fn exit(&mut self) {
        self.active = false;
        self.ids.clear();
    }

    pub fn ids(&self) -> &BTreeSet<u64> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    /// Select or unselect one task. Selecting implies selection mode.
    pub fn toggle(&mut self, id: u64) {
        self.active = true;
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    /// Whether every visible id is selected (and there is at least one).
    pub fn all_selected(&self, visible: &[u64]) -> bool {
        !visible.is_empty() && visible.iter().all(|id| self.ids.contains(id))
    }

    /// Select-all checkbox: all visible selected becomes none, anything else
    /// becomes exactly the visible ids.
    pub fn toggle_all(&mut self, visible: &[u64]) {
        self.active = true;
        if self.all_selected(visible) {
            self.ids.clear();
        } else {
            self.ids = visible.iter().copied().collect();
        }
    }

    /// Drop ids that are no longer visible.
    pub fn retain_visible(&mut self, visible: &[u64]) {
        self.ids.retain(|id| visible.contains(id));
    }

    /// Delete every selected task, then clear and leave selection mode.
    pub fn delete_from(&mut self, store: &mut TaskStore) -> Option<Notice> {
        if self.ids.is_empty() {
            return None;
        }
        let ids = self.ids.iter().copied().collect();
        let removed = store.delete_many(&ids);
        self.exit();
        Some(Notice::deleted(removed))
    }
}

/// Save an editor draft: update the task being edited, or create a new one.
pub fn save_draft(store: &mut TaskStore, editing: Option<u64>, draft: TaskDraft) -> Result<(Task, Notice)> {
    match editing {
        Some(id) => {
            draft.validate()?;
            let existing = store.get(id).ok_or(Error::TaskNotFound(id))?;
            let task = draft.apply_to(existing, store.now());
            store.update(task.clone());
            Ok((task, Notice::success("Task updated")))
        }
        None => {
            let task = store.create(draft)?;
            Ok((task, Notice::success("Task created")))
        }
    }
}
