//! Task editor: drafts, validation and conversion into stored tasks.
//!
//! Both the CLI and the TUI form build a `TaskDraft`, validate it, and hand
//! the resulting `Task` to the store. Validation collects every field-level
//! problem rather than stopping at the first.

use chrono::{DateTime, Utc};

use crate::error::ValidationErrors;
use crate::fields::*;
use crate::task::{CustomField, CustomFieldValue, Task, User};

/// Editable fields of a task, before an id and timestamps are assigned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub status: Status,
    pub priority: Priority,
    pub description: Option<String>,
    pub assignees: Vec<User>,
    pub custom_fields: Vec<CustomField>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        TaskDraft {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Prefill a draft from an existing task (edit form).
    pub fn from_task(task: &Task) -> Self {
        TaskDraft {
            title: task.title.clone(),
            status: task.status,
            priority: task.priority,
            description: task.description.clone(),
            assignees: task.assignees.clone(),
            custom_fields: task.custom_fields.clone(),
        }
    }

    /// Add the user if absent, remove it if present (assignee picker).
    pub fn toggle_assignee(&mut self, user: &User) {
        if let Some(pos) = self.assignees.iter().position(|a| a.id == user.id) {
            self.assignees.remove(pos);
        } else {
            self.assignees.push(user.clone());
        }
    }

    /// Set a custom field, replacing any earlier value for the same id.
    pub fn set_custom_field(&mut self, field_id: &str, value: CustomFieldValue) {
        match self.custom_fields.iter_mut().find(|f| f.field_id == field_id) {
            Some(existing) => existing.value = value,
            None => self.custom_fields.push(CustomField {
                field_id: field_id.to_string(),
                value,
            }),
        }
    }

    pub fn remove_custom_field(&mut self, field_id: &str) {
        self.custom_fields.retain(|f| f.field_id != field_id);
    }

    /// Check every field. Returns all field-scoped errors found.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.title.trim().is_empty() {
            errors.push("title", "Title is required");
        }

        for (i, assignee) in self.assignees.iter().enumerate() {
            if assignee.id.trim().is_empty() {
                errors.push(format!("assignees[{}].id", i), "Assignee id is required");
            }
            if assignee.name.trim().is_empty() {
                errors.push(format!("assignees[{}].name", i), "Assignee name is required");
            }
            if !is_valid_email(&assignee.email) {
                errors.push(format!("assignees[{}].email", i), "Invalid email");
            }
        }

        for (i, field) in self.custom_fields.iter().enumerate() {
            if field.field_id.trim().is_empty() {
                errors.push(format!("customFields[{}].fieldId", i), "Field id is required");
            }
            if let CustomFieldValue::Number(n) = field.value {
                if !n.is_finite() {
                    errors.push(format!("customFields[{}].value", i), "Number must be finite");
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Build a new task. The draft must already be valid.
    pub fn into_task(self, id: u64, now: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title.trim().to_string(),
            status: self.status,
            priority: self.priority,
            assignees: self.assignees,
            description: normalise_description(self.description),
            created_at: now,
            updated_at: now,
            custom_fields: self.custom_fields,
            order: None,
        }
    }

    /// Apply the draft over an existing task, keeping id, creation time and
    /// the manual `order` hint.
    pub fn apply_to(self, task: &Task, now: DateTime<Utc>) -> Task {
        Task {
            id: task.id,
            title: self.title.trim().to_string(),
            status: self.status,
            priority: self.priority,
            assignees: self.assignees,
            description: normalise_description(self.description),
            created_at: task.created_at,
            updated_at: now,
            custom_fields: self.custom_fields,
            order: task.order,
        }
    }
}

fn normalise_description(desc: Option<String>) -> Option<String> {
    desc.map(|d| d.trim().to_string()).filter(|d| !d.is_empty())
}

/// Syntactic email check: one `@`, non-empty local part, dotted domain
/// without empty labels, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|l| {
            !l.is_empty()
                && !l.starts_with('-')
                && !l.ends_with('-')
                && l.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

/// Parse a `--field` argument: `id=value` (text) or `id:type=value`.
pub fn parse_custom_field_arg(raw: &str) -> Result<CustomField, String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Expected id=value or id:type=value, got '{}'", raw))?;
    let (field_id, field_type) = match key.split_once(':') {
        Some((id, ty)) => (id.trim(), ty.parse::<FieldType>()?),
        None => (key.trim(), FieldType::Text),
    };
    if field_id.is_empty() {
        return Err(format!("Missing field id in '{}'", raw));
    }
    Ok(CustomField {
        field_id: field_id.to_string(),
        value: CustomFieldValue::parse(field_type, value)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users;

    #[test]
    fn test_empty_title_is_rejected() {
        let errors = TaskDraft::new("   ").validate().unwrap_err();
        assert_eq!(errors.for_field("title"), Some("Title is required"));
    }

    #[test]
    fn test_valid_draft_passes() {
        let mut draft = TaskDraft::new("Write docs");
        draft.assignees = users::directory();
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_bad_assignee_email_is_reported_per_field() {
        let mut draft = TaskDraft::new("Fix bug");
        let mut bad = users::find("js").unwrap();
        bad.email = "jane.example.com".to_string();
        draft.assignees = vec![users::find("dd").unwrap(), bad];
        let errors = draft.validate().unwrap_err();
        assert_eq!(errors.0.len(), 1);
        assert_eq!(errors.0[0].field, "assignees[1].email");
    }

    #[test]
    fn test_collects_all_errors() {
        let mut draft = TaskDraft::new("");
        draft.custom_fields.push(CustomField {
            field_id: String::new(),
            value: CustomFieldValue::Number(f64::NAN),
        });
        let errors = draft.validate().unwrap_err();
        assert_eq!(errors.0.len(), 3);
    }

    #[test]
    fn test_email_syntax() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.co"));
        assert!(!is_valid_email("alice@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("al ice@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
        assert!(!is_valid_email("alice@example..com"));
    }

    #[test]
    fn test_toggle_assignee() {
        let mut draft = TaskDraft::new("x");
        let jane = users::find("js").unwrap();
        draft.toggle_assignee(&jane);
        assert_eq!(draft.assignees.len(), 1);
        draft.toggle_assignee(&jane);
        assert!(draft.assignees.is_empty());
    }

    #[test]
    fn test_apply_to_keeps_identity() {
        let created = Utc::now() - chrono::Duration::days(2);
        let mut original = TaskDraft::new("Old").into_task(42, created);
        original.order = Some(3.0);
        let mut draft = TaskDraft::from_task(&original);
        draft.title = "  New title ".to_string();
        draft.description = Some("   ".to_string());
        let now = Utc::now();
        let updated = draft.apply_to(&original, now);
        assert_eq!(updated.id, 42);
        assert_eq!(updated.title, "New title");
        assert_eq!(updated.created_at, created);
        assert_eq!(updated.updated_at, now);
        assert_eq!(updated.order, Some(3.0));
        assert_eq!(updated.description, None);
    }

    #[test]
    fn test_parse_custom_field_arg() {
        let f = parse_custom_field_arg("estimate:number=3").unwrap();
        assert_eq!(f.field_id, "estimate");
        assert_eq!(f.value, CustomFieldValue::Number(3.0));
        let f = parse_custom_field_arg("team=core").unwrap();
        assert_eq!(f.value, CustomFieldValue::Text("core".to_string()));
        assert!(parse_custom_field_arg("blocked:bool=perhaps").is_err());
        assert!(parse_custom_field_arg("novalue").is_err());
    }

    #[test]
    fn test_set_custom_field_replaces() {
        let mut draft = TaskDraft::new("x");
        draft.set_custom_field("size", CustomFieldValue::Number(1.0));
        draft.set_custom_field("size", CustomFieldValue::Number(2.0));
        assert_eq!(draft.custom_fields.len(), 1);
        draft.remove_custom_field("size");
        assert!(draft.custom_fields.is_empty());
    }
}
