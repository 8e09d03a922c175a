//
// orchestrator/pending.rs
//
// Cursor moves waiting for a buffer to finish loading
//
// Each view has at most one pending move. A second toggle into the same view
// before it has loaded replaces the first; moves for different views are
// independent. Nothing expires: a move waits until its view reports loaded.
//

use indexmap::IndexMap;
use std::hash::Hash;

/// A cursor move to perform once `view` has loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCursor<V> {
    pub view: V,
    /// Method under the cursor in the file we toggled away from
    pub method: String,
    /// Whether that file was a test file
    pub was_test_file: bool,
}

/// Pending cursor moves, oldest first
#[derive(Debug, Clone)]
pub struct PendingCursors<V: Hash + Eq> {
    entries: IndexMap<V, PendingCursor<V>>,
}

impl<V: Clone + Hash + Eq> PendingCursors<V> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Record a move, replacing any earlier one for the same view
    pub fn insert(&mut self, pending: PendingCursor<V>) {
        if let Some(previous) = self.entries.insert(pending.view.clone(), pending) {
            log::debug!(
                "Dropped pending cursor move to '{}', superseded by a newer toggle",
                previous.method
            );
        }
    }

    /// Remove and return the move waiting on `view`
    pub fn take(&mut self, view: &V) -> Option<PendingCursor<V>> {
        self.entries.shift_remove(view)
    }

    pub fn get(&self, view: &V) -> Option<&PendingCursor<V>> {
        self.entries.get(view)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone + Hash + Eq> Default for PendingCursors<V> {
    fn default() -> Self {
        Self::new()
    }
}
