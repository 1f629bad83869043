//! Task store: the canonical task collection and its persistence.
//!
//! `TaskStore` is an explicitly constructed state container. It owns the task
//! list, writes the whole collection to a persistence `Slot` after every
//! effective mutation, restores it on construction, and notifies subscribed
//! observers synchronously. Mutations on unknown ids are silent no-ops, and
//! persistence failures are logged rather than surfaced, so the store never
//! brings the application down.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::editor::TaskDraft;
use crate::error::{Error, Result};
use crate::ids::{self, IdGenerator, MonotonicIds};
use crate::task::Task;

/// Name of the default persistence slot.
pub const DEFAULT_SLOT_NAME: &str = "task-store";

/// Version written into the slot envelope. No migrations exist yet.
pub const SLOT_VERSION: u32 = 0;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    tasks: Vec<Task>,
}

/// On-disk layout: `{"state":{"tasks":[...]},"version":0}`.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    state: PersistedState,
    #[serde(default)]
    version: u32,
}

/// Serialize a task collection into the slot envelope.
pub fn encode(tasks: &[Task]) -> Result<String> {
    let envelope = Envelope {
        state: PersistedState {
            tasks: tasks.to_vec(),
        },
        version: SLOT_VERSION,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// Deserialize a slot payload back into a task collection.
pub fn decode(payload: &str) -> Result<Vec<Task>> {
    let envelope: Envelope = serde_json::from_str(payload)?;
    if envelope.version != SLOT_VERSION {
        warn!(version = envelope.version, "unexpected slot version, reading as-is");
    }
    Ok(envelope.state.tasks)
}

/// A named place the serialized collection lives in.
pub trait Slot {
    /// Read the stored payload, `None` when nothing has been written yet.
    fn read(&self) -> io::Result<Option<String>>;

    /// Overwrite the stored payload.
    fn write(&mut self, payload: &str) -> io::Result<()>;

    /// Human readable location, for logs.
    fn describe(&self) -> String;
}

/// JSON file slot, written atomically via temp file + rename.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSlot { path: path.into() }
    }

    /// `<dir>/<name>.json`.
    pub fn named(dir: &Path, name: &str) -> Self {
        Self::new(dir.join(format!("{}.json", name)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Slot for FileSlot {
    fn read(&self) -> io::Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let mut buf = String::new();
        File::open(&self.path)?.read_to_string(&mut buf)?;
        Ok(Some(buf))
    }

    fn write(&mut self, payload: &str) -> io::Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        f.write_all(payload.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory slot. Clones share the same contents, so a store can be
/// reopened from a slot another store wrote to.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    payload: Rc<RefCell<Option<String>>>,
    fail_writes: bool,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(payload: &str) -> Self {
        MemorySlot {
            payload: Rc::new(RefCell::new(Some(payload.to_string()))),
            fail_writes: false,
        }
    }

    /// A slot whose writes always fail, as when storage quota is exhausted.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn contents(&self) -> Option<String> {
        self.payload.borrow().clone()
    }
}

impl Slot for MemorySlot {
    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.payload.borrow().clone())
    }

    fn write(&mut self, payload: &str) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::Other, "storage quota exceeded"));
        }
        *self.payload.borrow_mut() = Some(payload.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Callback invoked with the new snapshot after each effective mutation.
pub type Observer = Box<dyn FnMut(&[Task])>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Owner of the canonical task collection.
pub struct TaskStore {
    tasks: Vec<Task>,
    slot: Box<dyn Slot>,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Fn() -> DateTime<Utc>>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl TaskStore {
    /// Restore the collection from a slot, falling back to an empty one when
    /// the slot is empty, unreadable or malformed.
    pub fn open(slot: impl Slot + 'static) -> Self {
        let tasks = load_tasks(&slot);
        let ids = MonotonicIds::after(&tasks);
        TaskStore {
            tasks,
            slot: Box::new(slot),
            ids: Box::new(ids),
            clock: Box::new(Utc::now),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// A store backed by a fresh memory slot.
    pub fn in_memory() -> Self {
        Self::open(MemorySlot::new())
    }

    /// Replace the id generator. Existing ids are fed to it so it never
    /// hands out one already in use.
    pub fn with_id_generator(mut self, mut ids: impl IdGenerator + 'static) -> Self {
        for t in &self.tasks {
            ids.observe(t.id);
        }
        self.ids = Box::new(ids);
        self
    }

    /// Replace the clock used for `createdAt`/`updatedAt`.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Append a task. A task whose id is already present is rejected and
    /// the collection is left untouched.
    pub fn add(&mut self, task: Task) -> Result<()> {
        if !ids::is_assignable(task.id) {
            warn!(id = task.id, "rejecting task with out of range id");
            return Err(Error::IdOutOfRange(task.id));
        }
        if self.get(task.id).is_some() {
            warn!(id = task.id, "rejecting task with duplicate id");
            return Err(Error::DuplicateId(task.id));
        }
        self.ids.observe(task.id);
        self.tasks.push(task);
        self.commit();
        Ok(())
    }

    /// Validate a draft, assign it a fresh id and timestamps, and add it.
    pub fn create(&mut self, draft: TaskDraft) -> Result<Task> {
        draft.validate()?;
        let mut id = self.ids.next_id();
        while self.get(id).is_some() {
            id = self.ids.next_id();
        }
        let task = draft.into_task(id, self.now());
        self.add(task.clone())?;
        Ok(task)
    }

    /// Replace the task with the same id, refreshing `updatedAt`.
    /// Returns false, changing nothing, when no task matches.
    pub fn update(&mut self, mut task: Task) -> bool {
        let Some(idx) = self.tasks.iter().position(|t| t.id == task.id) else {
            debug!(id = task.id, "update for unknown task ignored");
            return false;
        };
        task.updated_at = self.now();
        self.tasks[idx] = task;
        self.commit();
        true
    }

    /// Remove a task. Returns false when no task matches.
    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            debug!(id, "delete for unknown task ignored");
            return false;
        }
        self.commit();
        true
    }

    /// Remove every task whose id is in `ids`. Returns how many were removed.
    pub fn delete_many(&mut self, ids: &HashSet<u64>) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !ids.contains(&t.id));
        let removed = before - self.tasks.len();
        if removed > 0 {
            self.commit();
        }
        removed
    }

    /// Register an observer called after each effective mutation.
    pub fn subscribe(&mut self, observer: impl FnMut(&[Task]) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    /// Serialize the whole collection into the slot.
    pub fn persist(&mut self) -> Result<()> {
        let payload = encode(&self.tasks)?;
        self.slot.write(&payload)?;
        Ok(())
    }

    fn commit(&mut self) {
        if let Err(e) = self.persist() {
            error!(
                slot = %self.slot.describe(),
                error = %e,
                "failed to persist tasks, keeping in-memory state"
            );
        }
        for (_, observer) in self.observers.iter_mut() {
            observer(&self.tasks);
        }
    }
}

fn load_tasks(slot: &dyn Slot) -> Vec<Task> {
    let payload = match slot.read() {
        Ok(Some(payload)) => payload,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(slot = %slot.describe(), error = %e, "error reading tasks, starting fresh");
            return Vec::new();
        }
    };
    let tasks = match decode(&payload) {
        Ok(tasks) => tasks,
        Err(e) => {
            warn!(slot = %slot.describe(), error = %e, "error parsing tasks, starting fresh");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let before = tasks.len();
    let tasks: Vec<Task> = tasks.into_iter().filter(|t| seen.insert(t.id)).collect();
    if tasks.len() != before {
        warn!(dropped = before - tasks.len(), "dropped tasks with duplicate ids");
    }

    let before = tasks.len();
    let tasks: Vec<Task> = tasks.into_iter().filter(|t| ids::is_assignable(t.id)).collect();
    if tasks.len() != before {
        warn!(dropped = before - tasks.len(), "dropped tasks with out of range ids");
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::*;
    use chrono::TimeZone;
    use std::cell::Cell;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn task(id: u64, title: &str) -> Task {
        TaskDraft::new(title).into_task(id, fixed_now())
    }

    #[test]
    fn test_round_trip_persistence() {
        for n in [0usize, 1, 5] {
            let slot = MemorySlot::new();
            let mut store = TaskStore::open(slot.clone());
            for i in 0..n {
                let mut t = task(i as u64 + 1, &format!("Task {}", i));
                t.priority = Priority::High;
                t.description = Some("details".to_string());
                store.add(t).unwrap();
            }
            store.persist().unwrap();
            let reopened = TaskStore::open(slot.clone());
            assert_eq!(reopened.tasks(), store.tasks());
            assert_eq!(reopened.len(), n);
        }
    }

    #[test]
    fn test_encode_decode_envelope() {
        let tasks = vec![task(1, "a"), task(2, "b")];
        let payload = encode(&tasks).unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["version"], 0);
        assert_eq!(value["state"]["tasks"].as_array().unwrap().len(), 2);
        assert_eq!(decode(&payload).unwrap(), tasks);
    }

    #[test]
    fn test_malformed_slot_falls_back_to_empty() {
        let store = TaskStore::open(MemorySlot::with_payload("{not json"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_duplicate_ids_in_slot_keep_first() {
        let payload = encode(&[task(1, "first"), task(1, "second")]).unwrap();
        let store = TaskStore::open(MemorySlot::with_payload(&payload));
        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].title, "first");
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let mut store = TaskStore::in_memory();
        store.add(task(1, "a")).unwrap();
        let err = store.add(task(1, "b")).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(1)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].title, "a");
    }

    #[test]
    fn test_out_of_range_id_in_slot_is_dropped() {
        let payload = encode(&[task(u64::MAX, "last"), task(3, "kept")]).unwrap();
        let mut store = TaskStore::open(MemorySlot::with_payload(&payload));
        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].title, "kept");
        let created = store.create(TaskDraft::new("next")).unwrap();
        assert_eq!(created.id, 4);
    }

    #[test]
    fn test_add_rejects_out_of_range_id() {
        let mut store = TaskStore::in_memory();
        let err = store.add(task(u64::MAX, "a")).unwrap_err();
        assert!(matches!(err, Error::IdOutOfRange(u64::MAX)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_create_fails_cleanly_once_ids_run_out() {
        let mut store = TaskStore::in_memory();
        store.add(task(crate::ids::MAX_ID, "top")).unwrap();
        let err = store.create(TaskDraft::new("one more")).unwrap_err();
        assert!(matches!(err, Error::IdOutOfRange(u64::MAX)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_and_delete_absent_are_noops() {
        let slot = MemorySlot::new();
        let mut store = TaskStore::open(slot.clone());
        store.add(task(1, "a")).unwrap();
        let snapshot = store.tasks().to_vec();
        let written = slot.contents();

        assert!(!store.update(task(99, "ghost")));
        assert!(!store.delete(99));
        assert_eq!(store.delete_many(&HashSet::from([98, 99])), 0);

        assert_eq!(store.tasks(), snapshot.as_slice());
        assert_eq!(slot.contents(), written);
    }

    #[test]
    fn test_update_replaces_and_refreshes_timestamp() {
        let later = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mut store = TaskStore::in_memory().with_clock(move || later);
        store.add(task(1, "a")).unwrap();
        let mut edited = store.get(1).unwrap().clone();
        edited.status = Status::Completed;
        assert!(store.update(edited));
        let stored = store.get(1).unwrap();
        assert_eq!(stored.status, Status::Completed);
        assert_eq!(stored.updated_at, later);
        assert_eq!(stored.created_at, fixed_now());
    }

    #[test]
    fn test_create_assigns_fresh_ids() {
        let mut store = TaskStore::in_memory().with_clock(fixed_now);
        store.add(task(5, "existing")).unwrap();
        let a = store.create(TaskDraft::new("one")).unwrap();
        let b = store.create(TaskDraft::new("two")).unwrap();
        assert_eq!((a.id, b.id), (6, 7));
        assert_eq!(a.created_at, fixed_now());
        store.delete(b.id);
        let c = store.create(TaskDraft::new("three")).unwrap();
        assert_eq!(c.id, 8);
    }

    #[test]
    fn test_create_skips_ids_added_explicitly() {
        let mut store = TaskStore::in_memory().with_id_generator(MonotonicIds::starting_at(1));
        store.add(task(1, "manual")).unwrap();
        let created = store.create(TaskDraft::new("auto")).unwrap();
        assert_eq!(created.id, 2);
    }

    #[test]
    fn test_create_rejects_invalid_draft() {
        let mut store = TaskStore::in_memory();
        let err = store.create(TaskDraft::new("")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_bulk_delete_count() {
        let mut store = TaskStore::in_memory();
        for i in 1..=6 {
            store.add(task(i, "t")).unwrap();
        }
        let removed = store.delete_many(&HashSet::from([2, 4, 6]));
        assert_eq!(removed, 3);
        let ids: Vec<u64> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn test_write_failure_keeps_in_memory_state() {
        let mut store = TaskStore::open(MemorySlot::new().failing_writes());
        store.add(task(1, "a")).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.persist().is_err());
    }

    #[test]
    fn test_observers_notified_in_order() {
        let mut store = TaskStore::in_memory();
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = log.clone();
        let second = log.clone();
        store.subscribe(move |tasks| first.borrow_mut().push(("first", tasks.len())));
        let id = store.subscribe(move |tasks| second.borrow_mut().push(("second", tasks.len())));

        store.add(task(1, "a")).unwrap();
        assert_eq!(*log.borrow(), vec![("first", 1), ("second", 1)]);

        assert!(store.unsubscribe(id));
        store.delete(1);
        assert_eq!(log.borrow().last(), Some(&("first", 0)));
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_noop_mutations_do_not_notify() {
        let mut store = TaskStore::in_memory();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        store.subscribe(move |_| counter.set(counter.get() + 1));
        store.delete(1);
        store.update(task(1, "x"));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_file_slot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::named(dir.path(), DEFAULT_SLOT_NAME);
        assert!(slot.path().ends_with("task-store.json"));
        {
            let mut store = TaskStore::open(slot.clone());
            store.create(TaskDraft::new("persisted")).unwrap();
        }
        let store = TaskStore::open(slot.clone());
        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].title, "persisted");
        assert!(!dir.path().join("task-store.json.tmp").exists());
    }

    #[test]
    fn test_file_slot_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::open(FileSlot::named(dir.path(), "absent"));
        assert!(store.is_empty());
    }
}
