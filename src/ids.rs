//! Task id allocation.

use crate::task::Task;

/// The largest id a stored task may carry. `u64::MAX` is reserved so the
/// counter always has a successor.
pub const MAX_ID: u64 = u64::MAX - 1;

/// Whether `id` can be stored without exhausting the counter.
pub fn is_assignable(id: u64) -> bool {
    id <= MAX_ID
}

/// Source of fresh task ids.
pub trait IdGenerator {
    /// Return an id never returned before by this generator.
    fn next_id(&mut self) -> u64;

    /// Make sure future ids are strictly greater than `id`.
    fn observe(&mut self, id: u64);
}

/// Monotonic counter. Ids are never reissued, even after deletes.
#[derive(Debug, Clone)]
pub struct MonotonicIds {
    next: u64,
}

impl MonotonicIds {
    pub fn starting_at(next: u64) -> Self {
        MonotonicIds { next: next.max(1) }
    }

    /// Seed past the highest id already in use.
    pub fn after(tasks: &[Task]) -> Self {
        let max = tasks.iter().map(|t| t.id).max().unwrap_or(0);
        Self::starting_at(max.saturating_add(1))
    }
}

impl Default for MonotonicIds {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdGenerator for MonotonicIds {
    fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next = self.next.saturating_add(1);
        id
    }

    fn observe(&mut self, id: u64) {
        if id >= self.next {
            self.next = id.saturating_add(1);
        }
    }
}
