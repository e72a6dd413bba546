//! Bounded newest-first ring buffer.
//!
//! Holds the most recent alerts (or traffic samples) for display. Pushing
//! past capacity evicts the oldest entry. Entries are stored as `Arc<T>` so
//! the published newest-first view shares them instead of cloning.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::model::AlertRecord;

pub struct AlertBuffer<T = AlertRecord> {
    // Oldest at the front, newest at the back.
    entries: VecDeque<Arc<T>>,
    capacity: usize,
}

impl<T> AlertBuffer<T> {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when full. Returns the evicted
    /// entry, if any.
    pub fn push(&mut self, entry: T) -> Option<Arc<T>> {
        self.push_arc(Arc::new(entry))
    }

    pub fn push_arc(&mut self, entry: Arc<T>) -> Option<Arc<T>> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    /// Iterate newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.entries.iter().rev()
    }

    /// The newest entry.
    pub fn latest(&self) -> Option<&Arc<T>> {
        self.entries.back()
    }

    /// Newest-first copy for publishing.
    pub fn to_vec(&self) -> Vec<Arc<T>> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for AlertBuffer<T> {
    fn default() -> Self {
        Self::new(10)
    }
}
