//! Row selection.
//!
//! Selected rows are kept as a set; the sorted list consumers ask for is
//! cached and dropped whenever the selection or the adapter's rows change.

use crate::adapter::CollectionAdapter;
use crate::changeset::{AdapterChange, IncrementalView, IndexAdjuster};
use crate::display::{wrap_text, TOOLTIP_WIDTH};
use std::collections::HashSet;

const DESELECT_TIP: &str = "Click to deselect this row";
const SELECT_TIP: &str = "Click to select this row. Maintain pressed Ctrl (Cmd on macOS) for multiple rows";

/// Tooltip for the select-row button of a row
pub fn select_row_tooltip(selected: bool) -> String {
    let text = if selected { DESELECT_TIP } else { SELECT_TIP };
    wrap_text(text, TOOLTIP_WIDTH).join("\n")
}

#[derive(Debug, Clone, Default)]
pub struct RowSelection {
    selected: HashSet<usize>,
    cache: Option<Vec<usize>>,
    last_synced_revision: u64,
}

impl RowSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, row: usize) {
        if self.selected.insert(row) {
            self.invalidate();
        }
    }

    pub fn deselect(&mut self, row: usize) {
        if self.selected.remove(&row) {
            self.invalidate();
        }
    }

    /// Flips one row; returns whether it is selected afterwards
    pub fn toggle(&mut self, row: usize) -> bool {
        if self.is_selected(row) {
            self.deselect(row);
            false
        } else {
            self.select(row);
            true
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.invalidate();
    }

    pub fn is_selected(&self, row: usize) -> bool {
        self.selected.contains(&row)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Selected rows in ascending order
    pub fn selected_rows(&mut self) -> &[usize] {
        let selected = &self.selected;
        self.cache.get_or_insert_with(|| {
            let mut rows: Vec<usize> = selected.iter().copied().collect();
            rows.sort_unstable();
            rows
        })
    }

    /// Follows row moves in `adapter` since the last sync
    pub fn sync(&mut self, adapter: &CollectionAdapter) -> bool {
        let changed = match adapter.changeset().since(self.last_synced_revision) {
            Some(changes) => self.apply_changes(changes),
            None => {
                self.rebuild();
                true
            }
        };
        self.last_synced_revision = adapter.changeset().revision();
        changed
    }
}

impl IncrementalView for RowSelection {
    fn apply_changes(&mut self, changes: &[AdapterChange]) -> bool {
        let mut modified = false;
        for change in changes.iter().filter(|c| c.shifts_indices()) {
            match change {
                AdapterChange::ModelReset => {
                    modified |= !self.selected.is_empty();
                    self.selected.clear();
                }
                AdapterChange::RowInserted { index } => {
                    let rows: Vec<usize> = self.selected.drain().collect();
                    modified |= rows.iter().any(|r| r >= index);
                    self.selected = rows
                        .into_iter()
                        .map(|r| IndexAdjuster::adjust_for_insert(r, *index))
                        .collect();
                }
                AdapterChange::RowsRemoved { indexes } => {
                    let mut rows: Vec<usize> = self.selected.drain().collect();
                    let before = rows.clone();
                    IndexAdjuster::adjust_mapping_for_delete(&mut rows, indexes);
                    modified |= rows != before;
                    self.selected = rows.into_iter().collect();
                }
                AdapterChange::RowsAppended { .. } | AdapterChange::RowUpdated { .. } => {}
            }
        }
        if modified {
            self.invalidate();
        }
        modified
    }

    fn last_synced_revision(&self) -> u64 {
        self.last_synced_revision
    }

    fn rebuild(&mut self) {
        self.selected.clear();
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterOptions;
    use crate::mutation::{InsertAt, Placement};
    use crate::value::{Key, Value};

    #[test]
    fn test_tooltips_wrap() {
        assert_eq!(select_row_tooltip(true), "Click to deselect this row");
        let tip = select_row_tooltip(false);
        assert!(tip.lines().count() > 1);
        assert!(tip.lines().all(|l| l.chars().count() <= TOOLTIP_WIDTH));
        assert_eq!(tip.replace('\n', " "), SELECT_TIP);
    }

    #[test]
    fn test_cache_is_invalidated_explicitly() {
        let mut selection = RowSelection::new();
        selection.select(4);
        selection.select(1);
        assert_eq!(selection.selected_rows(), &[1, 4]);
        assert!(selection.is_cached());

        selection.select(4);
        assert!(selection.is_cached());
        assert!(!selection.toggle(1));
        assert!(!selection.is_cached());
        assert_eq!(selection.selected_rows(), &[4]);
    }

    #[test]
    fn test_selection_follows_structural_changes() {
        let value = Value::list((0..5).map(Value::Int));
        let mut adapter = CollectionAdapter::from_value(value, AdapterOptions::default()).unwrap();
        let mut selection = RowSelection::new();
        selection.sync(&adapter);
        selection.select(1);
        selection.select(3);
        assert_eq!(selection.selected_rows(), &[1, 3]);

        adapter.insert(InsertAt::Row(0, Placement::Above), Value::Null).unwrap();
        assert!(selection.sync(&adapter));
        assert!(!selection.is_cached());
        assert_eq!(selection.selected_rows(), &[2, 4]);

        adapter.remove(&[Key::from(2usize)]).unwrap();
        selection.sync(&adapter);
        assert_eq!(selection.selected_rows(), &[3]);

        adapter.set_search_text("x");
        selection.sync(&adapter);
        assert!(selection.is_empty());
    }
}
