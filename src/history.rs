//! Navigation history: a bounded, linear undo/redo log of shown items.
//!
//! The history is independent of any provider's queue. One cursor tracks
//! the logical current item; appending while the cursor is not at the
//! tail discards the forward entries (linear, not a tree). The log is
//! bounded: once full, the oldest entry is evicted and the cursor is
//! re-based so the logical current item never changes due to eviction.

use serde::{Deserialize, Serialize};

use crate::model::MediaItem;

/// Bounded back/forward log with one cursor.
///
/// Invariant: `cursor` is in `[-1, len - 1]`; `-1` means nothing has
/// been shown yet.
#[derive(Debug, Clone)]
pub struct NavigationHistory {
    items: Vec<MediaItem>,
    cursor: i32,
    capacity: usize,
}

/// Loss-free serialized form of a [`NavigationHistory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub items: Vec<MediaItem>,
    pub cursor: i32,
    pub capacity: usize,
}

impl NavigationHistory {
    /// Create an empty history holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            cursor: -1,
            capacity: capacity.max(1),
        }
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The logical current item, if anything has been shown.
    pub fn current(&self) -> Option<&MediaItem> {
        if self.cursor < 0 {
            return None;
        }
        self.items.get(self.cursor as usize)
    }

    /// Record a newly shown item.
    ///
    /// If the cursor is not at the tail, everything after it is
    /// discarded first (redo entries are lost). Then the item is
    /// appended, the cursor advances, and the bound is enforced by
    /// evicting from the head.
    pub fn add(&mut self, item: MediaItem) {
        let keep = (self.cursor + 1) as usize;
        self.items.truncate(keep);
        self.items.push(item);
        self.cursor += 1;

        while self.items.len() > self.capacity {
            self.items.remove(0);
            self.cursor -= 1;
        }
    }

    /// Step the cursor back one entry. Returns `None` at the boundary,
    /// never wraps.
    pub fn previous(&mut self) -> Option<MediaItem> {
        if self.cursor <= 0 {
            return None;
        }
        self.cursor -= 1;
        self.items.get(self.cursor as usize).cloned()
    }

    /// Step the cursor forward one entry. Returns `None` at the
    /// boundary, never wraps.
    pub fn next(&mut self) -> Option<MediaItem> {
        if (self.cursor + 1) as usize >= self.items.len() {
            return None;
        }
        self.cursor += 1;
        self.items.get(self.cursor as usize).cloned()
    }

    /// Whether `previous()` would yield an item. O(1), no I/O.
    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    /// Whether `next()` would yield an item. O(1), no I/O.
    pub fn can_go_forward(&self) -> bool {
        ((self.cursor + 1) as usize) < self.items.len()
    }

    /// Drop all entries and reset the cursor.
    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = -1;
    }

    /// Serialize the full state.
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            items: self.items.clone(),
            cursor: self.cursor,
            capacity: self.capacity,
        }
    }

    /// Rebuild a history from a snapshot. Out-of-range cursors are
    /// clamped rather than trusted.
    pub fn restore(snapshot: HistorySnapshot) -> Self {
        let capacity = snapshot.capacity.max(1);
        let mut items = snapshot.items;
        while items.len() > capacity {
            items.remove(0);
        }
        let cursor = snapshot.cursor.clamp(-1, items.len() as i32 - 1);
        Self {
            items,
            cursor,
            capacity,
        }
    }
}
