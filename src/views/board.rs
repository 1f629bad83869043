//! Board view controller: buckets by status or priority, drag between
//! buckets, and selection mode for bulk deletes.
//!
//! A drag is a small state machine. `begin_drag` captures the source bucket
//! and index of a card; `drop_on` either cancels, leaves things as they are,
//! or rewrites the bucketing field of the task to the destination bucket.
//! Positions inside a bucket are never persisted.

use tracing::{debug, warn};

use crate::engine::{self, Bucket, BucketKey, SortKey, TaskFilter};
use crate::fields::*;
use crate::store::TaskStore;
use crate::task::Task;
use crate::views::{Notice, Selection};

/// Where a dragged card was picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragOrigin {
    pub task_id: u64,
    pub bucket: BucketKey,
    pub index: usize,
}

/// Where a card is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropTarget {
    pub bucket: BucketKey,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragOrigin),
}

/// Result of releasing a dragged card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// No drag was in progress.
    NotDragging,
    /// Released outside any bucket, or the task vanished meanwhile.
    Cancelled,
    /// Released at its own position.
    Unchanged,
    /// Moved within its bucket; nothing is stored.
    Reordered { task_id: u64 },
    /// Moved to another bucket; the task was updated.
    Moved { task_id: u64, from: BucketKey, to: BucketKey },
}

impl DropOutcome {
    pub fn notice(&self) -> Option<Notice> {
        match self {
            DropOutcome::Moved { to, .. } => {
                Some(Notice::success(format!("Moved task to {}", to.label())))
            }
            _ => None,
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(self, DropOutcome::Moved { .. })
    }
}

/// State behind the board screen.
#[derive(Debug, Clone)]
pub struct BoardView {
    group_by: GroupBy,
    filter: TaskFilter,
    sort: SortKey,
    drag: DragState,
    selection: Selection,
}

impl Default for BoardView {
    fn default() -> Self {
        Self::new(GroupBy::Status)
    }
}

impl BoardView {
    pub fn new(group_by: GroupBy) -> Self {
        BoardView {
            group_by,
            filter: TaskFilter::default(),
            sort: SortKey::default(),
            drag: DragState::Idle,
            selection: Selection::default(),
        }
    }

    pub fn group_by(&self) -> GroupBy {
        self.group_by
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn drag(&self) -> DragState {
        self.drag
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Switch grouping mode. Any drag or selection belongs to the old
    /// buckets and is dropped.
    pub fn set_group_by(&mut self, group_by: GroupBy) {
        if self.group_by != group_by {
            self.group_by = group_by;
            self.drag = DragState::Idle;
            self.selection.exit();
        }
    }

    pub fn set_search(&mut self, search: &str) {
        self.filter.search = search.to_string();
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
    }

    /// Buckets in display order, each holding its filtered, sorted tasks.
    pub fn buckets<'a>(&self, tasks: &'a [Task]) -> Vec<Bucket<'a>> {
        let projected = engine::project(tasks, &self.filter, self.sort);
        engine::group(&projected, self.group_by)
    }

    /// Card count per bucket, for column headers.
    pub fn bucket_counts(&self, tasks: &[Task]) -> Vec<(BucketKey, usize)> {
        self.buckets(tasks)
            .iter()
            .map(|b| (b.key, b.tasks.len()))
            .collect()
    }

    fn visible_ids(&self, tasks: &[Task]) -> Vec<u64> {
        self.buckets(tasks)
            .iter()
            .flat_map(|b| b.tasks.iter().map(|t| t.id))
            .collect()
    }

    /// Bucket and index of a visible card.
    pub fn locate(&self, tasks: &[Task], task_id: u64) -> Option<(BucketKey, usize)> {
        self.buckets(tasks).iter().find_map(|b| {
            b.tasks
                .iter()
                .position(|t| t.id == task_id)
                .map(|index| (b.key, index))
        })
    }

    // Drag and drop

    /// Pick up a visible card. Refused in selection mode.
    pub fn begin_drag(&mut self, tasks: &[Task], task_id: u64) -> bool {
        if self.selection.is_active() {
            debug!(task_id, "drag refused in selection mode");
            return false;
        }
        match self.locate(tasks, task_id) {
            Some((bucket, index)) => {
                self.drag = DragState::Dragging(DragOrigin {
                    task_id,
                    bucket,
                    index,
                });
                true
            }
            None => false,
        }
    }

    pub fn cancel_drag(&mut self) {
        self.drag = DragState::Idle;
    }

    /// Release the dragged card. `None` means released outside any bucket.
    pub fn drop_on(&mut self, store: &mut TaskStore, target: Option<DropTarget>) -> DropOutcome {
        let DragState::Dragging(origin) = std::mem::take(&mut self.drag) else {
            return DropOutcome::NotDragging;
        };
        let Some(target) = target else {
            return DropOutcome::Cancelled;
        };
        if BucketKey::all(self.group_by).iter().all(|k| *k != target.bucket) {
            warn!(?target, group_by = ?self.group_by, "drop target does not belong to this board");
            return DropOutcome::Cancelled;
        }
        if target.bucket == origin.bucket {
            return if target.index == origin.index {
                DropOutcome::Unchanged
            } else {
                DropOutcome::Reordered {
                    task_id: origin.task_id,
                }
            };
        }

        let Some(task) = store.get(origin.task_id) else {
            return DropOutcome::Cancelled;
        };
        let mut task = task.clone();
        target.bucket.assign_to(&mut task);
        store.update(task);
        DropOutcome::Moved {
            task_id: origin.task_id,
            from: origin.bucket,
            to: target.bucket,
        }
    }

    /// Pick up a card and drop it at the end of another bucket in one step.
    pub fn move_task(&mut self, store: &mut TaskStore, task_id: u64, to: BucketKey) -> DropOutcome {
        if !self.begin_drag(store.tasks(), task_id) {
            return DropOutcome::NotDragging;
        }
        let index = self
            .buckets(store.tasks())
            .iter()
            .find(|b| b.key == to)
            .map_or(0, |b| b.tasks.len());
        self.drop_on(store, Some(DropTarget { bucket: to, index }))
    }

    // Selection mode

    /// Enter selection mode. Cancels any drag in progress.
    pub fn enter_selection_mode(&mut self) {
        self.drag = DragState::Idle;
        self.selection.enter();
    }

    pub fn exit_selection_mode(&mut self) {
        self.selection.exit();
    }

    pub fn toggle_selected(&mut self, id: u64) {
        self.drag = DragState::Idle;
        self.selection.toggle(id);
    }

    /// Select every card of one bucket, or none if they all already are.
    pub fn toggle_select_bucket(&mut self, tasks: &[Task], key: BucketKey) {
        let ids: Vec<u64> = self
            .buckets(tasks)
            .iter()
            .find(|b| b.key == key)
            .map(|b| b.tasks.iter().map(|t| t.id).collect())
            .unwrap_or_default();
        self.drag = DragState::Idle;
        self.selection.toggle_all(&ids);
    }

    /// Prune state that refers to cards no longer visible.
    pub fn refresh(&mut self, tasks: &[Task]) {
        let visible = self.visible_ids(tasks);
        self.selection.retain_visible(&visible);
        if let DragState::Dragging(origin) = self.drag {
            if !visible.contains(&origin.task_id) {
                self.drag = DragState::Idle;
            }
        }
    }

    pub fn delete_selected(&mut self, store: &mut TaskStore) -> Option<Notice> {
        let notice = self.selection.delete_from(store)?;
        self.refresh(store.tasks());
        Some(notice)
    }
}
