//! Table view controller: filters, column sorting, pagination, selection and
//! inline title editing.

use std::ops::Range;

use crate::engine::{self, SortKey, TaskFilter};
use crate::fields::*;
use crate::store::TaskStore;
use crate::task::Task;
use crate::views::{Notice, Selection};

/// Rows per table page.
pub const PAGE_SIZE: usize = 10;

/// 1-based page cursor over a list of `total` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    page_size: usize,
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Pager {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages, at least one even when empty.
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size).max(1)
    }

    /// Row indices shown on the current page.
    pub fn range(&self, total: usize) -> Range<usize> {
        let page = self.page.min(self.page_count(total));
        let start = (page - 1) * self.page_size;
        let end = (start + self.page_size).min(total);
        start.min(total)..end
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// False once the last displayed row reaches the end of the list.
    pub fn has_next(&self, total: usize) -> bool {
        self.page * self.page_size < total
    }

    pub fn next(&mut self, total: usize) -> bool {
        if self.has_next(total) {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.has_prev() {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to a page, clamped into `1..=page_count`.
    pub fn go_to(&mut self, page: usize, total: usize) {
        self.page = page.clamp(1, self.page_count(total));
    }

    /// Pull the page back if it no longer has any rows.
    pub fn clamp(&mut self, total: usize) {
        self.page = self.page.clamp(1, self.page_count(total));
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }
}

impl Default for Pager {
    fn default() -> Self {
        Pager::new(PAGE_SIZE)
    }
}

/// State behind the table screen.
#[derive(Debug, Clone, Default)]
pub struct TableView {
    filter: TaskFilter,
    sort: SortKey,
    pager: Pager,
    selection: Selection,
    editing_title: Option<u64>,
}

impl TableView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(page_size: usize) -> Self {
        TableView {
            pager: Pager::new(page_size),
            ..Default::default()
        }
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    // Filters. Every change sends the table back to page 1 and drops
    // selected ids the new filter hides.

    pub fn set_filter(&mut self, filter: TaskFilter, tasks: &[Task]) {
        self.filter = filter;
        self.filter_changed(tasks);
    }

    pub fn set_search(&mut self, search: &str, tasks: &[Task]) {
        self.filter.search = search.to_string();
        self.filter_changed(tasks);
    }

    pub fn toggle_status_filter(&mut self, status: Status, tasks: &[Task]) {
        toggle_value(&mut self.filter.statuses, status);
        self.filter_changed(tasks);
    }

    pub fn toggle_priority_filter(&mut self, priority: Priority, tasks: &[Task]) {
        toggle_value(&mut self.filter.priorities, priority);
        self.filter_changed(tasks);
    }

    pub fn toggle_user_filter(&mut self, user_id: &str, tasks: &[Task]) {
        toggle_value(&mut self.filter.users, user_id.to_string());
        self.filter_changed(tasks);
    }

    fn filter_changed(&mut self, tasks: &[Task]) {
        self.pager.reset();
        self.refresh(tasks);
    }

    /// Whether the "clear filters" control should be offered.
    pub fn has_clearable_filters(&self) -> bool {
        !self.filter.statuses.is_empty() || !self.filter.priorities.is_empty()
    }

    /// Clear status and priority filters.
    pub fn clear_filters(&mut self, tasks: &[Task]) {
        self.filter.statuses.clear();
        self.filter.priorities.clear();
        self.filter_changed(tasks);
    }

    // Sorting

    /// Column header click.
    pub fn sort_by(&mut self, field: SortField, tasks: &[Task]) {
        self.sort = self.sort.toggled(field);
        self.refresh(tasks);
    }

    pub fn set_sort(&mut self, sort: SortKey, tasks: &[Task]) {
        self.sort = sort;
        self.refresh(tasks);
    }

    // Projection

    /// All rows matching the filters, sorted.
    pub fn rows<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        engine::project(tasks, &self.filter, self.sort)
    }

    /// Rows on the current page.
    pub fn page_rows<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        let rows = self.rows(tasks);
        let range = self.pager.range(rows.len());
        rows[range].to_vec()
    }

    fn visible_ids(&self, tasks: &[Task]) -> Vec<u64> {
        self.page_rows(tasks).iter().map(|t| t.id).collect()
    }

    pub fn has_next_page(&self, tasks: &[Task]) -> bool {
        self.pager.has_next(self.rows(tasks).len())
    }

    pub fn next_page(&mut self, tasks: &[Task]) {
        let total = self.rows(tasks).len();
        if self.pager.next(total) {
            let visible = self.visible_ids(tasks);
            self.selection.retain_visible(&visible);
        }
    }

    /// Jump straight to a page, clamped to the pages that exist.
    pub fn go_to_page(&mut self, page: usize, tasks: &[Task]) {
        let total = self.rows(tasks).len();
        self.pager.go_to(page, total);
        let visible = self.visible_ids(tasks);
        self.selection.retain_visible(&visible);
    }

    pub fn prev_page(&mut self, tasks: &[Task]) {
        if self.pager.prev() {
            let visible = self.visible_ids(tasks);
            self.selection.retain_visible(&visible);
        }
    }

    /// Re-clamp the page and prune selection after the collection or the
    /// view state changed.
    pub fn refresh(&mut self, tasks: &[Task]) {
        let total = self.rows(tasks).len();
        self.pager.clamp(total);
        let visible = self.visible_ids(tasks);
        self.selection.retain_visible(&visible);
        if let Some(id) = self.editing_title {
            if !visible.contains(&id) {
                self.editing_title = None;
            }
        }
    }

    // Selection

    pub fn toggle_selected(&mut self, id: u64) {
        self.selection.toggle(id);
    }

    /// Header checkbox state.
    pub fn all_visible_selected(&self, tasks: &[Task]) -> bool {
        self.selection.all_selected(&self.visible_ids(tasks))
    }

    /// Header checkbox click: toggles between the current page and nothing.
    pub fn toggle_select_all(&mut self, tasks: &[Task]) {
        let visible = self.visible_ids(tasks);
        self.selection.toggle_all(&visible);
    }

    pub fn enter_selection(&mut self) {
        self.editing_title = None;
        self.selection.enter();
    }

    pub fn exit_selection(&mut self) {
        self.selection.exit();
    }

    /// Bulk delete of the selected rows.
    pub fn delete_selected(&mut self, store: &mut TaskStore) -> Option<Notice> {
        let notice = self.selection.delete_from(store)?;
        self.refresh(store.tasks());
        Some(notice)
    }

    pub fn delete_one(&mut self, store: &mut TaskStore, id: u64) -> Option<Notice> {
        if !store.delete(id) {
            return None;
        }
        self.refresh(store.tasks());
        Some(Notice::success("Task deleted"))
    }

    // Inline title editing

    pub fn editing_title(&self) -> Option<u64> {
        self.editing_title
    }

    pub fn begin_title_edit(&mut self, id: u64) {
        self.editing_title = Some(id);
    }

    pub fn cancel_title_edit(&mut self) {
        self.editing_title = None;
    }

    /// Save an inline title edit. Blank or unchanged titles are dropped.
    pub fn commit_title(&mut self, store: &mut TaskStore, id: u64, text: &str) -> Option<Notice> {
        self.editing_title = None;
        let title = text.trim();
        let task = store.get(id)?;
        if title.is_empty() || title == task.title {
            return None;
        }
        let mut task = task.clone();
        task.title = title.to_string();
        store.update(task);
        self.refresh(store.tasks());
        Some(Notice::success("Task title updated!"))
    }
}

fn toggle_value<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if let Some(pos) = values.iter().position(|v| *v == value) {
        values.remove(pos);
    } else {
        values.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TaskDraft;
    use chrono::{Duration, TimeZone, Utc};

    /// Store with `n` tasks created a minute apart, ids 1..=n.
    fn store_with(n: u64) -> TaskStore {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut store = TaskStore::in_memory();
        for i in 1..=n {
            let mut draft = TaskDraft::new(format!("Task {:02}", i));
            if i % 2 == 0 {
                draft.status = Status::Completed;
            }
            store.add(draft.into_task(i, base + Duration::minutes(i as i64))).unwrap();
        }
        store
    }

    fn ids(tasks: &[&Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_pagination_bounds() {
        let store = store_with(25);
        let mut view = TableView::new();
        view.set_sort("created_asc".parse().unwrap(), store.tasks());

        assert_eq!(ids(&view.page_rows(store.tasks())), (1..=10).collect::<Vec<_>>());
        assert!(!view.pager().has_prev());

        view.next_page(store.tasks());
        view.next_page(store.tasks());
        assert_eq!(view.pager().page(), 3);
        assert_eq!(ids(&view.page_rows(store.tasks())), (21..=25).collect::<Vec<_>>());
        assert!(!view.has_next_page(store.tasks()));

        view.next_page(store.tasks());
        assert_eq!(view.pager().page(), 3);
    }

    #[test]
    fn test_go_to_page_clamps() {
        let store = store_with(25);
        let mut view = TableView::new();
        view.go_to_page(9, store.tasks());
        assert_eq!(view.pager().page(), 3);
        view.go_to_page(2, store.tasks());
        assert_eq!(view.page_rows(store.tasks()).len(), 10);
    }

    #[test]
    fn test_pager_arithmetic() {
        let mut pager = Pager::new(10);
        assert_eq!(pager.page_count(0), 1);
        assert_eq!(pager.range(0), 0..0);
        assert!(!pager.has_next(10));
        assert!(pager.has_next(11));
        pager.go_to(7, 25);
        assert_eq!(pager.page(), 3);
        pager.go_to(0, 25);
        assert_eq!(pager.page(), 1);
        assert!(!pager.prev());
    }

    #[test]
    fn test_filter_change_resets_page() {
        let store = store_with(25);
        let mut view = TableView::new();
        view.next_page(store.tasks());
        view.next_page(store.tasks());
        view.toggle_status_filter(Status::Completed, store.tasks());
        assert_eq!(view.pager().page(), 1);
        assert_eq!(view.rows(store.tasks()).len(), 12);
    }

    #[test]
    fn test_filter_change_prunes_selection() {
        let mut store = store_with(4);
        let mut view = TableView::new();
        view.toggle_selected(1);
        view.toggle_selected(2);
        view.toggle_status_filter(Status::Completed, store.tasks());
        assert!(!view.selection().contains(1));
        assert!(view.selection().contains(2));

        view.set_search("Task 04", store.tasks());
        assert!(view.selection().is_empty());
        assert!(view.delete_selected(&mut store).is_none());
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_filter_change_drops_hidden_title_edit() {
        let store = store_with(2);
        let mut view = TableView::new();
        view.begin_title_edit(1);
        view.toggle_status_filter(Status::Completed, store.tasks());
        assert_eq!(view.editing_title(), None);
    }

    #[test]
    fn test_shrinking_collection_reclamps_page() {
        let mut store = store_with(21);
        let mut view = TableView::new();
        view.next_page(store.tasks());
        view.next_page(store.tasks());
        assert_eq!(view.pager().page(), 3);
        let last = view.page_rows(store.tasks())[0].id;
        view.delete_one(&mut store, last).unwrap();
        assert_eq!(view.pager().page(), 2);
        assert_eq!(view.page_rows(store.tasks()).len(), 10);
    }

    #[test]
    fn test_select_all_scoped_to_page() {
        let mut store = store_with(25);
        let mut view = TableView::new();
        view.toggle_select_all(store.tasks());
        assert_eq!(view.selection().len(), 10);
        assert!(view.all_visible_selected(store.tasks()));

        let notice = view.delete_selected(&mut store).unwrap();
        assert_eq!(notice.message, "10 tasks deleted");
        assert_eq!(store.len(), 15);
        assert!(view.selection().is_empty());
        assert!(!view.selection().is_active());
    }

    #[test]
    fn test_selection_pruned_on_page_change() {
        let store = store_with(25);
        let mut view = TableView::new();
        let first = view.page_rows(store.tasks())[0].id;
        view.toggle_selected(first);
        view.next_page(store.tasks());
        assert!(!view.selection().contains(first));
    }

    #[test]
    fn test_single_delete_notice() {
        let mut store = store_with(3);
        let mut view = TableView::new();
        let notice = view.delete_one(&mut store, 2).unwrap();
        assert_eq!(notice.message, "Task deleted");
        assert!(view.delete_one(&mut store, 2).is_none());
        assert_eq!(Notice::deleted(1).message, "1 task deleted");
    }

    #[test]
    fn test_commit_title() {
        let mut store = store_with(2);
        let mut view = TableView::new();
        view.begin_title_edit(1);
        assert_eq!(view.editing_title(), Some(1));
        assert!(view.commit_title(&mut store, 1, "   ").is_none());
        assert!(view.commit_title(&mut store, 1, "Task 01").is_none());
        let notice = view.commit_title(&mut store, 1, " Renamed ").unwrap();
        assert_eq!(notice.message, "Task title updated!");
        assert_eq!(store.get(1).unwrap().title, "Renamed");
        assert_eq!(view.editing_title(), None);
    }

    #[test]
    fn test_sort_by_header_toggles() {
        let store = store_with(3);
        let mut view = TableView::new();
        view.sort_by(SortField::Title, store.tasks());
        assert_eq!(ids(&view.rows(store.tasks())), vec![1, 2, 3]);
        view.sort_by(SortField::Title, store.tasks());
        assert_eq!(ids(&view.rows(store.tasks())), vec![3, 2, 1]);
    }

    #[test]
    fn test_clear_filters() {
        let store = store_with(3);
        let mut view = TableView::new();
        assert!(!view.has_clearable_filters());
        view.toggle_priority_filter(Priority::High, store.tasks());
        view.toggle_user_filter("js", store.tasks());
        assert!(view.has_clearable_filters());
        view.clear_filters(store.tasks());
        assert!(!view.has_clearable_filters());
        assert_eq!(view.filter().users, vec!["js".to_string()]);
        view.toggle_user_filter("js", store.tasks());
        assert!(view.filter().is_empty());
    }
}
