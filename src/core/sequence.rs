//! Sequential ID allocation
//!
//! IDs are minted by reading the collection's current maximum and adding
//! one. That read-then-insert window must be exclusive within the process,
//! so [`IdSequence::reserve`] hands back a [`ReservedId`] that keeps the
//! allocator's mutex held until the caller has inserted the document.
//!
//! Uniqueness is per-process only. Two processes allocating against the
//! same store can mint the same id; the duplicate-key rejection on insert
//! turns that race into a database error rather than silent corruption.

use crate::store::{Collection, Document};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Process-level allocator of sequential integer IDs
pub struct IdSequence {
    serial: Mutex<()>,
}

impl IdSequence {
    /// Create a new allocator
    pub fn new() -> Self {
        IdSequence {
            serial: Mutex::new(()),
        }
    }

    /// Reserve the next id for `collection`
    ///
    /// Returns `max id + 1`, or `1` for an empty collection. The returned
    /// reservation holds the allocator's lock; keep it alive until the
    /// insert using the id has completed, then drop it.
    pub fn reserve<'a, T>(&'a self, collection: &Collection<T>) -> ReservedId<'a>
    where
        T: Document<Id = u32>,
    {
        // A poisoned lock only means some other caller panicked mid-insert;
        // the max-id read below is still sound.
        let serial = self.serial.lock().unwrap_or_else(PoisonError::into_inner);
        let id = collection.latest_by_id().map_or(1, |doc| doc.id() + 1);
        ReservedId { id, _serial: serial }
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// An allocated id, exclusive until dropped
pub struct ReservedId<'a> {
    id: u32,
    _serial: MutexGuard<'a, ()>,
}

impl ReservedId<'_> {
    /// The reserved id
    pub fn get(&self) -> u32 {
        self.id
    }
}
