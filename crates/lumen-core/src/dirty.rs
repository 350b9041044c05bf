//! Change tracking
//!
//! The tracker keeps a global dirty flag plus the set of universes whose
//! resolved output changed since the last flush. Both are only touched when a
//! value really changed.

use std::collections::BTreeSet;

/// What the scheduler sees when it inspects the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtySnapshot {
    /// Nothing changed since the last flush
    Clean,
    /// These universes changed (ascending, never empty)
    Dirty(Vec<u16>),
    /// Flag and set disagree. This is a logic error.
    Inconsistent,
}

/// Dirty flag plus dirty-universe set
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    is_dirty: bool,
    universes: BTreeSet<u16>,
}

impl ChangeTracker {
    /// Create a clean tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a universe as changed. Idempotent.
    pub fn mark_dirty(&mut self, universe: u16) {
        self.is_dirty = true;
        self.universes.insert(universe);
    }

    /// Global dirty flag
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Dirty universes in ascending order
    pub fn dirty_universes(&self) -> Vec<u16> {
        self.universes.iter().copied().collect()
    }

    /// Number of dirty universes
    pub fn dirty_count(&self) -> usize {
        self.universes.len()
    }

    /// Classify the current state for a flush decision
    pub fn snapshot(&self) -> DirtySnapshot {
        match (self.is_dirty, self.universes.is_empty()) {
            (false, true) => DirtySnapshot::Clean,
            (true, false) => DirtySnapshot::Dirty(self.dirty_universes()),
            _ => DirtySnapshot::Inconsistent,
        }
    }

    /// Raise the flag without recording a universe. Test hook for the
    /// inconsistent state; nothing in the engine calls it.
    #[doc(hidden)]
    pub fn set_flag_only(&mut self) {
        self.is_dirty = true;
    }

    /// Record a universe without raising the flag. Test hook, see
    /// [`set_flag_only`](Self::set_flag_only).
    #[doc(hidden)]
    pub fn insert_without_flag(&mut self, universe: u16) {
        self.universes.insert(universe);
    }

    /// Re-raise the flag for universes recorded without it. Returns whether
    /// anything was left to flush.
    pub fn restore_flag(&mut self) -> bool {
        self.is_dirty = !self.universes.is_empty();
        self.is_dirty
    }

    /// Reset flag and set after a flush
    pub fn clear(&mut self) {
        self.is_dirty = false;
        self.universes.clear();
    }
}
