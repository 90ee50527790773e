/// Changeset - Incremental Change Propagation for collection adapters
///
/// Every structural change an adapter makes to its row set is recorded as an
/// `AdapterChange`. Layers stacked on top of the adapter (the filter/sort
/// proxy, selection caches) replay the changes they have not seen yet instead
/// of rebuilding their indexes from scratch.
///
/// # Change Types
///
/// - `ModelReset`: rows were rebuilt or reordered; derived indexes must rebuild
/// - `RowsAppended`: a page was loaded at the end of the loaded prefix
/// - `RowInserted`: one row was spliced in at a position
/// - `RowsRemoved`: rows were deleted (positions before the deletion)
/// - `RowUpdated`: one row's value and metadata changed in place
///
/// # Usage Pattern
///
/// 1. Adapter operations push changes and advance the revision
/// 2. Consumers remember the revision they last synced to
/// 3. `since(revision)` hands them exactly the changes they missed, or `None`
///    when those were compacted away and a rebuild is required

/// Represents a single change to an adapter's rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterChange {
    ModelReset,

    /// Rows `start..start + count` became loaded
    RowsAppended { start: usize, count: usize },

    /// A row was inserted at the given index
    RowInserted { index: usize },

    /// Rows at these indexes (pre-removal numbering, ascending) were deleted
    RowsRemoved { indexes: Vec<usize> },

    /// A row's value changed; its position did not
    RowUpdated { index: usize },
}

impl AdapterChange {
    /// Returns true if this change moves rows after the affected one
    pub fn shifts_indices(&self) -> bool {
        matches!(
            self,
            AdapterChange::RowInserted { .. } | AdapterChange::RowsRemoved { .. } | AdapterChange::ModelReset
        )
    }
}

/// Ordered log of changes with a monotonically increasing revision
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    changes: Vec<AdapterChange>,
    /// Revision of `changes[0]`; grows when old changes are compacted
    base: u64,
}

impl Changeset {
    pub fn new() -> Self {
        Changeset {
            changes: Vec::new(),
            base: 0,
        }
    }

    /// Add a change to the changeset
    pub fn push(&mut self, change: AdapterChange) {
        self.changes.push(change);
    }

    /// Revision after the latest change
    pub fn revision(&self) -> u64 {
        self.base + self.changes.len() as u64
    }

    /// Changes after `revision`; `None` if some were already compacted away
    pub fn since(&self, revision: u64) -> Option<&[AdapterChange]> {
        if revision < self.base {
            return None;
        }
        let offset = (revision - self.base) as usize;
        self.changes.get(offset..).or(Some(&[][..]))
    }

    /// Drop changes before `revision` once every consumer has seen them
    pub fn compact(&mut self, revision: u64) {
        let upto = revision.saturating_sub(self.base).min(self.changes.len() as u64) as usize;
        self.changes.drain(..upto);
        self.base += upto as u64;
    }

    /// Returns true if there are no retained changes
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns the number of retained changes
    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// Trait for layers that follow an adapter incrementally
pub trait IncrementalView {
    /// Apply a set of changes from the adapter
    /// Returns true if the view was modified, false if no changes affected it
    fn apply_changes(&mut self, changes: &[AdapterChange]) -> bool;

    /// Get the revision this view last synced to
    fn last_synced_revision(&self) -> u64;

    /// Force a full rebuild (fallback when incremental isn't possible)
    fn rebuild(&mut self);
}

/// Row shifting shared by views that hold adapter row numbers.
///
/// An insert at `at` moves every row at or after `at` down by one. A removal
/// is given as the set of removed rows in pre-removal numbering; surviving
/// rows move up by the number of removed rows above them.
pub struct IndexAdjuster;

impl IndexAdjuster {
    pub fn adjust_for_insert(row: usize, at: usize) -> usize {
        row + usize::from(row >= at)
    }

    /// None when `row` itself was removed
    pub fn adjust_for_delete_many(row: usize, removed: &[usize]) -> Option<usize> {
        let mut above = 0;
        for &r in removed {
            if r == row {
                return None;
            }
            if r < row {
                above += 1;
            }
        }
        Some(row - above)
    }

    pub fn adjust_mapping_for_insert(rows: &mut [usize], at: usize) {
        rows.iter_mut().for_each(|row| *row = Self::adjust_for_insert(*row, at));
    }

    /// Shifts survivors in place and drops rows that were removed; order is kept
    pub fn adjust_mapping_for_delete(rows: &mut Vec<usize>, removed: &[usize]) {
        rows.retain_mut(|row| match Self::adjust_for_delete_many(*row, removed) {
            Some(shifted) => {
                *row = shifted;
                true
            }
            None => false,
        });
    }
}
