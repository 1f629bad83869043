//! Enumerations and field types for task tracking.
//!
//! This module defines the structured values used to categorise, sort and
//! group tasks: lifecycle status, priority, sort keys, board grouping modes
//! and the value types of custom fields.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Lifecycle stage of a task.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl Status {
    /// All statuses in board display order.
    pub const ALL: [Status; 3] = [Status::NotStarted, Status::InProgress, Status::Completed];

    /// Wire form, as persisted and compared by the status sort.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::NotStarted => "not_started",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
        }
    }

    /// Human readable label used for column headers and badges.
    pub fn label(self) -> &'static str {
        match self {
            Status::NotStarted => "Not Started",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
        }
    }
}

/// Urgency ranking of a task, `None` being the lowest.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// All priorities in board display order (most urgent first).
    pub const BOARD_ORDER: [Priority; 5] = [
        Priority::Urgent,
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::None,
    ];

    /// Rank used by the priority sort: none 0 through urgent 4.
    pub fn rank(self) -> u8 {
        match self {
            Priority::None => 0,
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::None => "None",
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "not_started" => Ok(Status::NotStarted),
            "in_progress" => Ok(Status::InProgress),
            "completed" => Ok(Status::Completed),
            other => Err(format!(
                "Invalid status '{}': expected not_started, in_progress or completed",
                other
            )),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Priority::None),
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(format!(
                "Invalid priority '{}': expected none, low, medium, high or urgent",
                other
            )),
        }
    }
}

/// Column a task list can be sorted by.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SortField {
    Title,
    Status,
    Priority,
    Created,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Status => "status",
            SortField::Priority => "priority",
            SortField::Created => "created",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Field the board partitions tasks by.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum GroupBy {
    #[default]
    Status,
    Priority,
}

/// Value type of a custom field.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
    Boolean,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
        }
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "string" => Ok(FieldType::Text),
            "number" | "num" => Ok(FieldType::Number),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            other => Err(format!("Unknown field type '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_rank_is_monotonic() {
        let ranks: Vec<u8> = [
            Priority::None,
            Priority::Low,
            Priority::Medium,
            Priority::High,
            Priority::Urgent,
        ]
        .iter()
        .map(|p| p.rank())
        .collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_status_parse_accepts_loose_forms() {
        assert_eq!("in progress".parse::<Status>().unwrap(), Status::InProgress);
        assert_eq!("Not-Started".parse::<Status>().unwrap(), Status::NotStarted);
        assert!("done".parse::<Status>().is_err());
    }

    #[test]
    fn test_status_serde_uses_snake_case() {
        let json = serde_json::to_string(&Status::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let back: Priority = serde_json::from_str("\"urgent\"").unwrap();
        assert_eq!(back, Priority::Urgent);
    }
}
