//! Filtering, sorting and grouping of task collections.
//!
//! Everything here is a pure function of its inputs. Views call into this
//! module on every state change to derive what they display; nothing in the
//! store is ever reordered in place.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::fields::*;
use crate::task::Task;

/// Active filter criteria. Criteria combine with AND; values within one
/// criterion combine with OR. Empty criteria do not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub search: String,
    pub statuses: Vec<Status>,
    pub priorities: Vec<Priority>,
    pub users: Vec<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if !self.search.is_empty()
            && !task.title.to_lowercase().contains(&self.search.to_lowercase())
        {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&task.status) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&task.priority) {
            return false;
        }
        if !self.users.is_empty() && !task.is_assigned_to_any(&self.users) {
            return false;
        }
        true
    }

    /// Whether no criterion is active.
    pub fn is_empty(&self) -> bool {
        self.search.is_empty()
            && self.statuses.is_empty()
            && self.priorities.is_empty()
            && self.users.is_empty()
    }
}

/// Sort field plus direction; textual form is `<field>_<direction>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey {
            field: SortField::Created,
            direction: SortDirection::Desc,
        }
    }
}

impl SortKey {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        SortKey { field, direction }
    }

    /// Column-header behaviour: the active field flips direction, any other
    /// field becomes active in ascending order.
    pub fn toggled(self, field: SortField) -> Self {
        if self.field == field {
            SortKey::new(field, self.direction.flipped())
        } else {
            SortKey::new(field, SortDirection::Asc)
        }
    }

    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ord = match self.field {
            SortField::Title => collate(&a.title, &b.title),
            // Lexical on the wire form, not the lifecycle progression.
            SortField::Status => a.status.as_str().cmp(b.status.as_str()),
            SortField::Priority => a.priority.rank().cmp(&b.priority.rank()),
            SortField::Created => a.created_at.cmp(&b.created_at),
        };
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.field.as_str(), self.direction.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = s
            .rsplit_once('_')
            .ok_or_else(|| format!("Invalid sort key '{}'", s))?;
        let field = match field {
            "title" => SortField::Title,
            "status" => SortField::Status,
            "priority" => SortField::Priority,
            "created" => SortField::Created,
            _ => return Err(format!("Invalid sort field '{}'", field)),
        };
        let direction = match direction {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => return Err(format!("Invalid sort direction '{}'", direction)),
        };
        Ok(SortKey::new(field, direction))
    }
}

/// Locale-style collation: case-insensitive first, lowercase before
/// uppercase when the letters tie.
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Tasks matching the filter, in collection order.
pub fn filter_tasks<'a>(tasks: &'a [Task], filter: &TaskFilter) -> Vec<&'a Task> {
    tasks.iter().filter(|t| filter.matches(t)).collect()
}

/// Stable sort: ties keep their relative input order in either direction.
pub fn sort_tasks(tasks: &mut [&Task], key: SortKey) {
    tasks.sort_by(|a, b| key.compare(a, b));
}

/// Filter then sort: the projection both views render from.
pub fn project<'a>(tasks: &'a [Task], filter: &TaskFilter, key: SortKey) -> Vec<&'a Task> {
    let mut out = filter_tasks(tasks, filter);
    sort_tasks(&mut out, key);
    out
}

/// Identity of a board bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketKey {
    Status(Status),
    Priority(Priority),
}

impl BucketKey {
    /// Bucket a task belongs to under a grouping mode.
    pub fn of(task: &Task, by: GroupBy) -> Self {
        match by {
            GroupBy::Status => BucketKey::Status(task.status),
            GroupBy::Priority => BucketKey::Priority(task.priority),
        }
    }

    /// All buckets for a grouping mode, in display order.
    pub fn all(by: GroupBy) -> Vec<BucketKey> {
        match by {
            GroupBy::Status => Status::ALL.iter().map(|&s| BucketKey::Status(s)).collect(),
            GroupBy::Priority => Priority::BOARD_ORDER
                .iter()
                .map(|&p| BucketKey::Priority(p))
                .collect(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BucketKey::Status(s) => s.label(),
            BucketKey::Priority(p) => p.label(),
        }
    }

    /// Write this bucket's key into the task's bucketing field.
    pub fn assign_to(self, task: &mut Task) {
        match self {
            BucketKey::Status(s) => task.status = s,
            BucketKey::Priority(p) => task.priority = p,
        }
    }
}

impl FromStr for BucketKey {
    type Err = String;

    /// Accepts either a status or a priority name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(status) = s.parse::<Status>() {
            return Ok(BucketKey::Status(status));
        }
        if let Ok(priority) = s.parse::<Priority>() {
            return Ok(BucketKey::Priority(priority));
        }
        Err(format!("'{}' is neither a status nor a priority", s))
    }
}

/// One column of the board.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket<'a> {
    pub key: BucketKey,
    pub tasks: Vec<&'a Task>,
}

/// Partition tasks into the fixed buckets of a grouping mode. Each task lands
/// in exactly one bucket; bucket contents keep input order; empty buckets are
/// kept.
pub fn group<'a>(tasks: &[&'a Task], by: GroupBy) -> Vec<Bucket<'a>> {
    BucketKey::all(by)
        .into_iter()
        .map(|key| Bucket {
            key,
            tasks: tasks
                .iter()
                .copied()
                .filter(|t| BucketKey::of(t, by) == key)
                .collect(),
        })
        .collect()
}

/// Distinct statuses present in a collection, in first-seen order.
pub fn distinct_statuses(tasks: &[Task]) -> Vec<Status> {
    let mut out = Vec::new();
    for t in tasks {
        if !out.contains(&t.status) {
            out.push(t.status);
        }
    }
    out
}

/// Distinct priorities present in a collection, in first-seen order.
pub fn distinct_priorities(tasks: &[Task]) -> Vec<Priority> {
    let mut out = Vec::new();
    for t in tasks {
        if !out.contains(&t.priority) {
            out.push(t.priority);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TaskDraft;
    use crate::users;
    use chrono::{Duration, TimeZone, Utc};

    fn task(id: u64, title: &str, status: Status, priority: Priority) -> Task {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut t = TaskDraft::new(title).into_task(id, base + Duration::minutes(id as i64));
        t.status = status;
        t.priority = priority;
        t
    }

    fn ids(tasks: &[&Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_filter_by_status() {
        let tasks = vec![
            task(1, "Fix bug", Status::Completed, Priority::High),
            task(2, "Write docs", Status::NotStarted, Priority::Low),
        ];
        let filter = TaskFilter {
            statuses: vec![Status::Completed],
            ..Default::default()
        };
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec![1]);
    }

    #[test]
    fn test_filter_composition() {
        let mut tasks = vec![
            task(1, "Fix login bug", Status::InProgress, Priority::High),
            task(2, "Fix CSS bug", Status::Completed, Priority::High),
            task(3, "Write docs", Status::InProgress, Priority::Urgent),
            task(4, "fix tests", Status::NotStarted, Priority::Low),
        ];
        tasks[0].assignees = vec![users::find("js").unwrap()];
        tasks[2].assignees = vec![users::find("ak").unwrap()];
        tasks[3].assignees = vec![users::find("dd").unwrap(), users::find("js").unwrap()];

        let filter = TaskFilter {
            search: "FIX".to_string(),
            statuses: vec![Status::InProgress, Status::NotStarted],
            priorities: vec![],
            users: vec!["js".to_string(), "zz".to_string()],
        };
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec![1, 4]);

        for t in &tasks {
            let expected = t.title.to_lowercase().contains("fix")
                && filter.statuses.contains(&t.status)
                && t.assignees.iter().any(|a| filter.users.contains(&a.id));
            assert_eq!(filter.matches(t), expected, "task {}", t.id);
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let tasks = vec![
            task(1, "a", Status::NotStarted, Priority::None),
            task(2, "b", Status::Completed, Priority::Urgent),
        ];
        let filter = TaskFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter_tasks(&tasks, &filter).len(), 2);
    }

    #[test]
    fn test_priority_rank_ordering() {
        let tasks = vec![
            task(1, "a", Status::NotStarted, Priority::Urgent),
            task(2, "b", Status::NotStarted, Priority::None),
            task(3, "c", Status::NotStarted, Priority::High),
        ];
        let asc = project(&tasks, &TaskFilter::default(), "priority_asc".parse().unwrap());
        let priorities: Vec<Priority> = asc.iter().map(|t| t.priority).collect();
        assert_eq!(priorities, vec![Priority::None, Priority::High, Priority::Urgent]);

        let desc = project(&tasks, &TaskFilter::default(), "priority_desc".parse().unwrap());
        assert_eq!(ids(&desc), vec![1, 3, 2]);
    }

    #[test]
    fn test_sort_is_stable_in_both_directions() {
        let tasks = vec![
            task(1, "a", Status::NotStarted, Priority::Low),
            task(2, "b", Status::NotStarted, Priority::High),
            task(3, "c", Status::NotStarted, Priority::Low),
            task(4, "d", Status::NotStarted, Priority::High),
        ];
        let key = SortKey::new(SortField::Priority, SortDirection::Asc);
        let once = project(&tasks, &TaskFilter::default(), key);
        let twice = project(&tasks, &TaskFilter::default(), key);
        assert_eq!(ids(&once), vec![1, 3, 2, 4]);
        assert_eq!(ids(&once), ids(&twice));

        let desc = project(&tasks, &TaskFilter::default(), key.toggled(SortField::Priority));
        assert_eq!(ids(&desc), vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_status_sort_is_lexical() {
        let tasks = vec![
            task(1, "a", Status::NotStarted, Priority::None),
            task(2, "b", Status::InProgress, Priority::None),
            task(3, "c", Status::Completed, Priority::None),
        ];
        let sorted = project(&tasks, &TaskFilter::default(), "status_asc".parse().unwrap());
        assert_eq!(ids(&sorted), vec![3, 2, 1]);
    }

    #[test]
    fn test_title_collation() {
        let tasks = vec![
            task(1, "banana", Status::NotStarted, Priority::None),
            task(2, "Apple", Status::NotStarted, Priority::None),
            task(3, "apple", Status::NotStarted, Priority::None),
            task(4, "cherry", Status::NotStarted, Priority::None),
        ];
        let sorted = project(&tasks, &TaskFilter::default(), "title_asc".parse().unwrap());
        assert_eq!(ids(&sorted), vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_created_sort() {
        let tasks = vec![
            task(2, "b", Status::NotStarted, Priority::None),
            task(1, "a", Status::NotStarted, Priority::None),
            task(3, "c", Status::NotStarted, Priority::None),
        ];
        let newest_first = project(&tasks, &TaskFilter::default(), SortKey::default());
        assert_eq!(ids(&newest_first), vec![3, 2, 1]);
    }

    #[test]
    fn test_sort_key_text_form() {
        let key: SortKey = "created_desc".parse().unwrap();
        assert_eq!(key, SortKey::default());
        assert_eq!(key.to_string(), "created_desc");
        assert!("created".parse::<SortKey>().is_err());
        assert!("due_asc".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_sort_toggle() {
        let key = SortKey::default().toggled(SortField::Title);
        assert_eq!(key, SortKey::new(SortField::Title, SortDirection::Asc));
        let key = key.toggled(SortField::Title);
        assert_eq!(key, SortKey::new(SortField::Title, SortDirection::Desc));
    }

    #[test]
    fn test_group_by_status_sizes() {
        let tasks = vec![
            task(1, "a", Status::NotStarted, Priority::None),
            task(2, "b", Status::InProgress, Priority::None),
            task(3, "c", Status::InProgress, Priority::None),
        ];
        let refs: Vec<&Task> = tasks.iter().collect();
        let buckets = group(&refs, GroupBy::Status);
        let sizes: Vec<usize> = buckets.iter().map(|b| b.tasks.len()).collect();
        assert_eq!(sizes, vec![1, 2, 0]);
        assert_eq!(buckets[2].key, BucketKey::Status(Status::Completed));
    }

    #[test]
    fn test_group_is_complete_and_disjoint() {
        let priorities = [
            Priority::Low,
            Priority::Urgent,
            Priority::None,
            Priority::High,
            Priority::Low,
            Priority::Medium,
            Priority::Urgent,
        ];
        let tasks: Vec<Task> = priorities
            .iter()
            .enumerate()
            .map(|(i, &p)| task(i as u64 + 1, "t", Status::NotStarted, p))
            .collect();
        let refs: Vec<&Task> = tasks.iter().collect();
        for by in [GroupBy::Status, GroupBy::Priority] {
            let buckets = group(&refs, by);
            let mut seen: Vec<u64> = buckets
                .iter()
                .flat_map(|b| b.tasks.iter().map(|t| t.id))
                .collect();
            seen.sort();
            assert_eq!(seen, (1..=7).collect::<Vec<u64>>());
        }
        let buckets = group(&refs, GroupBy::Priority);
        let keys: Vec<BucketKey> = buckets.iter().map(|b| b.key).collect();
        assert_eq!(keys, BucketKey::all(GroupBy::Priority));
        assert_eq!(ids(&buckets[0].tasks), vec![2, 7]);
    }

    #[test]
    fn test_bucket_key_parse_and_assign() {
        let key: BucketKey = "in_progress".parse().unwrap();
        assert_eq!(key, BucketKey::Status(Status::InProgress));
        let key: BucketKey = "urgent".parse().unwrap();
        let mut t = task(1, "a", Status::NotStarted, Priority::None);
        key.assign_to(&mut t);
        assert_eq!(t.priority, Priority::Urgent);
        assert!("someday".parse::<BucketKey>().is_err());
    }

    #[test]
    fn test_distinct_values() {
        let tasks = vec![
            task(1, "a", Status::Completed, Priority::High),
            task(2, "b", Status::Completed, Priority::Low),
            task(3, "c", Status::NotStarted, Priority::High),
        ];
        assert_eq!(distinct_statuses(&tasks), vec![Status::Completed, Status::NotStarted]);
        assert_eq!(distinct_priorities(&tasks), vec![Priority::High, Priority::Low]);
    }
}
