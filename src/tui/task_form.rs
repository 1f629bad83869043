//! Task form handling for the terminal user interface.
//!
//! The form edits a `TaskDraft`. Text inputs and selectors are addressed by
//! a global field order; the assignee picker is a checklist over the user
//! directory. Submitting turns the form into a draft and runs validation so
//! errors can be shown next to the offending field.

use crate::editor::{parse_custom_field_arg, TaskDraft};
use crate::engine::BucketKey;
use crate::error::ValidationErrors;
use crate::fields::{Priority, Status};
use crate::task::{Task, User};
use crate::tui::input::InputField;
use crate::users;

/// Global order constants for the form fields.
pub const TITLE_GLOBAL_ORDER: usize = 0;
pub const DESCRIPTION_GLOBAL_ORDER: usize = 1;
pub const STATUS_GLOBAL_ORDER: usize = 2;
pub const PRIORITY_GLOBAL_ORDER: usize = 3;
pub const ASSIGNEES_GLOBAL_ORDER: usize = 4;
pub const CUSTOM_FIELDS_GLOBAL_ORDER: usize = 5;
const FIELD_COUNT: usize = 6;

/// Separator between entries of the custom field input.
const CUSTOM_FIELD_SEPARATOR: char = ';';

/// Task form for creating or editing a task.
pub struct TaskForm {
    pub editing: Option<u64>,
    pub title: InputField,
    pub description: InputField,
    pub custom_fields: InputField,
    pub status: usize,
    pub priority: usize,
    pub statuses: Vec<Status>,
    pub priorities: Vec<Priority>,
    pub directory: Vec<User>,
    pub assignees: Vec<User>,
    pub assignee_cursor: usize,
    pub current_field: usize,
    pub errors: ValidationErrors,
}

impl TaskForm {
    /// Empty form for a new task.
    pub fn new() -> Self {
        let mut form = Self {
            editing: None,
            title: InputField::new(),
            description: InputField::new(),
            custom_fields: InputField::new(),
            status: 0,
            priority: 0,
            statuses: Status::ALL.to_vec(),
            priorities: vec![
                Priority::None,
                Priority::Low,
                Priority::Medium,
                Priority::High,
                Priority::Urgent,
            ],
            directory: users::directory(),
            assignees: Vec::new(),
            assignee_cursor: 0,
            current_field: TITLE_GLOBAL_ORDER,
            errors: ValidationErrors::default(),
        };
        form.update_active_field();
        form
    }

    /// New-task form preset to a board column.
    pub fn for_bucket(key: BucketKey) -> Self {
        let mut form = Self::new();
        match key {
            BucketKey::Status(s) => form.set_status(s),
            BucketKey::Priority(p) => form.set_priority(p),
        }
        form
    }

    /// Form prefilled from an existing task.
    pub fn from_task(task: &Task) -> Self {
        let mut form = Self::new();
        form.editing = Some(task.id);
        form.title = InputField::with_value(&task.title);
        form.description = InputField::with_value(task.description.as_deref().unwrap_or_default());
        let fields: Vec<String> = task
            .custom_fields
            .iter()
            .map(|f| format!("{}:{}={}", f.field_id, f.value.field_type().as_str(), f.value))
            .collect();
        form.custom_fields = InputField::with_value(&fields.join("; "));
        form.set_status(task.status);
        form.set_priority(task.priority);
        form.assignees = task.assignees.clone();
        form.update_active_field();
        form
    }

    fn set_status(&mut self, status: Status) {
        self.status = self.statuses.iter().position(|&s| s == status).unwrap_or(0);
    }

    fn set_priority(&mut self, priority: Priority) {
        self.priority = self.priorities.iter().position(|&p| p == priority).unwrap_or(0);
    }

    pub fn selected_status(&self) -> Status {
        self.statuses[self.status]
    }

    pub fn selected_priority(&self) -> Priority {
        self.priorities[self.priority]
    }

    pub fn is_assigned(&self, user_id: &str) -> bool {
        self.assignees.iter().any(|a| a.id == user_id)
    }

    pub fn is_edit(&self) -> bool {
        self.editing.is_some()
    }

    fn active_input(&mut self) -> Option<&mut InputField> {
        match self.current_field {
            TITLE_GLOBAL_ORDER => Some(&mut self.title),
            DESCRIPTION_GLOBAL_ORDER => Some(&mut self.description),
            CUSTOM_FIELDS_GLOBAL_ORDER => Some(&mut self.custom_fields),
            _ => None,
        }
    }

    /// Move to the next field in the form.
    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % FIELD_COUNT;
        self.update_active_field();
    }

    /// Move to the previous field in the form.
    pub fn prev_field(&mut self) {
        self.current_field = (self.current_field + FIELD_COUNT - 1) % FIELD_COUNT;
        self.update_active_field();
    }

    /// Update which text input shows a cursor.
    pub fn update_active_field(&mut self) {
        self.title.active = self.current_field == TITLE_GLOBAL_ORDER;
        self.description.active = self.current_field == DESCRIPTION_GLOBAL_ORDER;
        self.custom_fields.active = self.current_field == CUSTOM_FIELDS_GLOBAL_ORDER;
    }

    /// Handle character input for the current field. Space toggles the
    /// assignee under the cursor in the picker.
    pub fn handle_char(&mut self, c: char) {
        if self.current_field == ASSIGNEES_GLOBAL_ORDER {
            if c == ' ' {
                self.toggle_assignee_at_cursor();
            }
            return;
        }
        if let Some(input) = self.active_input() {
            input.handle_char(c);
        }
    }

    pub fn handle_backspace(&mut self) {
        if let Some(input) = self.active_input() {
            input.handle_backspace();
        }
    }

    pub fn handle_delete(&mut self) {
        if let Some(input) = self.active_input() {
            input.handle_delete();
        }
    }

    /// Left/right move the cursor in text inputs, cycle selectors, and move
    /// through the assignee picker.
    pub fn handle_left_right(&mut self, right: bool) {
        let step = |value: usize, len: usize| {
            if right {
                (value + 1) % len
            } else {
                (value + len - 1) % len
            }
        };
        match self.current_field {
            STATUS_GLOBAL_ORDER => self.status = step(self.status, self.statuses.len()),
            PRIORITY_GLOBAL_ORDER => self.priority = step(self.priority, self.priorities.len()),
            ASSIGNEES_GLOBAL_ORDER => {
                if !self.directory.is_empty() {
                    self.assignee_cursor = step(self.assignee_cursor, self.directory.len());
                }
            }
            _ => {
                if let Some(input) = self.active_input() {
                    if right {
                        input.move_cursor_right();
                    } else {
                        input.move_cursor_left();
                    }
                }
            }
        }
    }

    pub fn toggle_assignee_at_cursor(&mut self) {
        let Some(user) = self.directory.get(self.assignee_cursor) else {
            return;
        };
        if let Some(pos) = self.assignees.iter().position(|a| a.id == user.id) {
            self.assignees.remove(pos);
        } else {
            self.assignees.push(user.clone());
        }
    }

    /// Build a draft from the form. Custom field syntax errors and draft
    /// validation errors are collected together.
    pub fn to_draft(&self) -> Result<TaskDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut draft = TaskDraft::new(self.title.value.clone());
        draft.status = self.selected_status();
        draft.priority = self.selected_priority();
        draft.description = Some(self.description.value.clone());
        draft.assignees = self.assignees.clone();

        let entries = self
            .custom_fields
            .value
            .split(CUSTOM_FIELD_SEPARATOR)
            .map(str::trim)
            .filter(|e| !e.is_empty());
        for (i, entry) in entries.enumerate() {
            match parse_custom_field_arg(entry) {
                Ok(field) => draft.set_custom_field(&field.field_id, field.value),
                Err(message) => errors.push(format!("customFields[{}]", i), message),
            }
        }

        if let Err(more) = draft.validate() {
            errors.0.extend(more.0);
        }
        if errors.is_empty() {
            Ok(draft)
        } else {
            Err(errors)
        }
    }

    /// First error reported for a field or any of its nested paths.
    pub fn error_for(&self, prefix: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == prefix || e.field.starts_with(&format!("{}[", prefix)))
            .map(|e| e.message.as_str())
    }
}

impl Default for TaskForm {
    fn default() -> Self {
        Self::new()
    }
}
