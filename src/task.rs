//! Task data structure and related types.
//!
//! This module defines the core `Task` struct, the `User` records embedded in
//! its assignee list, and the typed custom field values attached to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::*;

/// A unit of work tracked by the board.
///
/// Serialized with camelCase names so the persisted slot keeps the
/// `createdAt`/`customFields` layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assignees: Vec<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
}

impl Task {
    /// Whether any assignee carries one of the given user ids.
    pub fn is_assigned_to_any(&self, user_ids: &[String]) -> bool {
        self.assignees.iter().any(|a| user_ids.contains(&a.id))
    }
}

/// Background/foreground style pair for a user's avatar badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarStyle {
    pub bg: String,
    pub text: String,
}

/// A collaborator that can be assigned to tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub color: String,
    #[serde(default = "AvatarStyle::neutral")]
    pub style: AvatarStyle,
}

impl AvatarStyle {
    pub fn neutral() -> Self {
        AvatarStyle {
            bg: "bg-gray-500".to_string(),
            text: "text-white".to_string(),
        }
    }
}

impl User {
    /// Initials shown in avatar badges ("Jane Smith" -> "JS").
    pub fn initials(&self) -> String {
        let initials: String = self
            .name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .flat_map(|c| c.to_uppercase())
            .collect();
        if initials.is_empty() {
            self.id.to_uppercase()
        } else {
            initials
        }
    }
}

/// One `{fieldId, value}` pair attached to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub field_id: String,
    pub value: CustomFieldValue,
}

/// Typed value of a custom field.
///
/// Stored untagged so the persisted value stays a plain JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomFieldValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl CustomFieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            CustomFieldValue::Text(_) => FieldType::Text,
            CustomFieldValue::Number(_) => FieldType::Number,
            CustomFieldValue::Boolean(_) => FieldType::Boolean,
        }
    }

    /// Parse raw input as a value of the given type.
    pub fn parse(field_type: FieldType, raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        match field_type {
            FieldType::Text => Ok(CustomFieldValue::Text(raw.to_string())),
            FieldType::Number => raw
                .parse::<f64>()
                .map(CustomFieldValue::Number)
                .map_err(|_| format!("'{}' is not a number", raw)),
            FieldType::Boolean => match raw.to_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(CustomFieldValue::Boolean(true)),
                "false" | "no" | "0" => Ok(CustomFieldValue::Boolean(false)),
                _ => Err(format!("'{}' is not a boolean", raw)),
            },
        }
    }
}

impl std::fmt::Display for CustomFieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CustomFieldValue::Text(s) => f.write_str(s),
            CustomFieldValue::Number(n) => write!(f, "{}", n),
            CustomFieldValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}
