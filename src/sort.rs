/// Sorting primitives
///
/// The adapter and the proxy never call `slice::sort_by` with comparators
/// derived from dynamic values: such comparators can be inconsistent (e.g. a
/// fixed `left < right` for unorderable pairs), which the standard library
/// may reject by panicking. Instead every reorder goes through
/// `stable_sort_by`, a merge sort driven by a "comes before" predicate that
/// terminates and stays stable whatever the predicate answers.
///
/// Row reorders are expressed as permutations (`order[i]` = old position of
/// the row now at position `i`) so several parallel arrays can be moved in
/// lockstep with `apply_permutation`.

use crate::value::Unorderable;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Ascending),
            "desc" | "descending" => Some(SortDirection::Descending),
            _ => None,
        }
    }
}

/// Current ordering of an adapter's rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortState {
    /// Insertion order (mappings only once a sort has been applied)
    Unsorted,
    Ascending(usize),
    Descending(usize),
}

impl SortState {
    pub fn column(&self) -> Option<usize> {
        match self {
            SortState::Unsorted => None,
            SortState::Ascending(c) | SortState::Descending(c) => Some(*c),
        }
    }

    pub fn direction(&self) -> Option<SortDirection> {
        match self {
            SortState::Unsorted => None,
            SortState::Ascending(_) => Some(SortDirection::Ascending),
            SortState::Descending(_) => Some(SortDirection::Descending),
        }
    }
}

/// What a sort request resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortAction {
    /// Reorder by this column and direction
    Sort(usize, SortDirection),
    /// Return to the retained insertion order
    Restore,
}

/// Sort state machine.
///
/// With `three_state` (mapping collections), repeating an ascending sort on
/// the same column restores insertion order instead of re-sorting. Without
/// it the cycle is `Ascending <-> Descending` and `Unsorted` only exists
/// before the first sort.
#[derive(Debug, Clone)]
pub struct SortTracker {
    state: SortState,
    previous_column: Option<usize>,
    three_state: bool,
}

impl SortTracker {
    pub fn new(initial: SortState, three_state: bool) -> Self {
        SortTracker {
            state: initial,
            previous_column: initial.column(),
            three_state,
        }
    }

    pub fn state(&self) -> SortState {
        self.state
    }

    pub fn previous_column(&self) -> Option<usize> {
        self.previous_column
    }

    pub fn is_three_state(&self) -> bool {
        self.three_state
    }

    /// Resolves an explicit `sort(column, direction)` request.
    ///
    /// Returns the action the caller must perform; call `commit` once it
    /// succeeded so a failed reorder leaves the state untouched.
    pub fn request(&self, column: usize, direction: SortDirection) -> SortAction {
        if self.three_state
            && direction == SortDirection::Ascending
            && self.state == SortState::Ascending(column)
        {
            SortAction::Restore
        } else {
            SortAction::Sort(column, direction)
        }
    }

    /// Header click: Asc -> Desc -> (mapping: insertion order) -> Asc
    pub fn toggle(&self, column: usize) -> SortAction {
        match self.state {
            SortState::Ascending(c) if c == column => SortAction::Sort(column, SortDirection::Descending),
            SortState::Descending(c) if c == column && self.three_state => SortAction::Restore,
            _ => SortAction::Sort(column, SortDirection::Ascending),
        }
    }

    pub fn commit(&mut self, action: SortAction) {
        match action {
            SortAction::Sort(column, SortDirection::Ascending) => {
                self.state = SortState::Ascending(column);
                self.previous_column = Some(column);
            }
            SortAction::Sort(column, SortDirection::Descending) => {
                self.state = SortState::Descending(column);
                self.previous_column = Some(column);
            }
            SortAction::Restore => {
                self.state = SortState::Unsorted;
            }
        }
    }
}

/// Stable merge sort on a "comes before" predicate; never panics.
pub fn stable_sort_by<T, F>(items: &mut Vec<T>, mut before: F)
where
    T: Clone,
    F: FnMut(&T, &T) -> bool,
{
    let len = items.len();
    if len < 2 {
        return;
    }
    let mut buffer = items.clone();
    let mut width = 1;
    while width < len {
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            merge(&items[start..mid], &items[mid..end], &mut buffer[start..end], &mut before);
            start = end;
        }
        std::mem::swap(items, &mut buffer);
        width *= 2;
    }
}

fn merge<T: Clone, F: FnMut(&T, &T) -> bool>(left: &[T], right: &[T], out: &mut [T], before: &mut F) {
    let (mut i, mut j) = (0, 0);
    for slot in out.iter_mut() {
        // Take from the right only when it strictly comes first
        let take_right = i >= left.len() || (j < right.len() && before(&right[j], &left[i]));
        if take_right {
            *slot = right[j].clone();
            j += 1;
        } else {
            *slot = left[i].clone();
            i += 1;
        }
    }
}

/// Permutation sorting `0..len` with a fallible comparator.
///
/// The first `Unorderable` aborts the sort; callers keep their previous
/// order in that case.
pub fn try_sort_permutation<F>(
    len: usize,
    direction: SortDirection,
    mut cmp: F,
) -> Result<Vec<usize>, Unorderable>
where
    F: FnMut(usize, usize) -> Result<Ordering, Unorderable>,
{
    let mut order: Vec<usize> = (0..len).collect();
    let mut failed = false;
    let wanted = match direction {
        SortDirection::Ascending => Ordering::Less,
        SortDirection::Descending => Ordering::Greater,
    };
    stable_sort_by(&mut order, |&a, &b| {
        if failed {
            return false;
        }
        match cmp(a, b) {
            Ok(ord) => ord == wanted,
            Err(Unorderable) => {
                failed = true;
                false
            }
        }
    });
    if failed {
        Err(Unorderable)
    } else {
        Ok(order)
    }
}

/// Permutation sorting `0..len` with an infallible comparator
pub fn sort_permutation<F>(len: usize, direction: SortDirection, mut cmp: F) -> Vec<usize>
where
    F: FnMut(usize, usize) -> Ordering,
{
    let mut order: Vec<usize> = (0..len).collect();
    let wanted = match direction {
        SortDirection::Ascending => Ordering::Less,
        SortDirection::Descending => Ordering::Greater,
    };
    stable_sort_by(&mut order, |&a, &b| cmp(a, b) == wanted);
    order
}

/// Reorders `items` so that `items[i]` becomes the old `items[order[i]]`
pub fn apply_permutation<T: Clone>(items: &[T], order: &[usize]) -> Vec<T> {
    order.iter().map(|&i| items[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_sort_keeps_equal_elements_in_order() {
        let mut items = vec![(1, 'a'), (0, 'b'), (1, 'c'), (0, 'd')];
        stable_sort_by(&mut items, |x, y| x.0 < y.0);
        assert_eq!(items, vec![(0, 'b'), (0, 'd'), (1, 'a'), (1, 'c')]);
    }

    #[test]
    fn test_stable_sort_survives_inconsistent_predicate() {
        let mut items: Vec<usize> = (0..37).collect();
        stable_sort_by(&mut items, |_, _| true);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn test_descending_permutation_is_stable() {
        let values = [2, 1, 2, 3];
        let order = sort_permutation(values.len(), SortDirection::Descending, |a, b| values[a].cmp(&values[b]));
        assert_eq!(order, vec![3, 0, 2, 1]);
    }

    #[test]
    fn test_try_sort_aborts_on_unorderable() {
        let result = try_sort_permutation(3, SortDirection::Ascending, |a, b| {
            if a == 2 || b == 2 {
                Err(Unorderable)
            } else {
                Ok(a.cmp(&b))
            }
        });
        assert_eq!(result, Err(Unorderable));
    }

    #[test]
    fn test_apply_permutation_moves_arrays_in_lockstep() {
        let keys = vec!["b", "c", "a"];
        let sizes = vec![2, 3, 1];
        let order = sort_permutation(3, SortDirection::Ascending, |a, b| keys[a].cmp(keys[b]));
        assert_eq!(apply_permutation(&keys, &order), vec!["a", "b", "c"]);
        assert_eq!(apply_permutation(&sizes, &order), vec![1, 2, 3]);
    }

    #[test]
    fn test_three_state_cycle() {
        let mut tracker = SortTracker::new(SortState::Unsorted, true);
        let action = tracker.request(0, SortDirection::Ascending);
        assert_eq!(action, SortAction::Sort(0, SortDirection::Ascending));
        tracker.commit(action);

        let again = tracker.request(0, SortDirection::Ascending);
        assert_eq!(again, SortAction::Restore);
        tracker.commit(again);
        assert_eq!(tracker.state(), SortState::Unsorted);
        assert_eq!(tracker.previous_column(), Some(0));
    }

    #[test]
    fn test_two_state_cycle() {
        let mut tracker = SortTracker::new(SortState::Ascending(0), false);
        assert_eq!(tracker.request(0, SortDirection::Ascending), SortAction::Sort(0, SortDirection::Ascending));

        let toggled = tracker.toggle(0);
        assert_eq!(toggled, SortAction::Sort(0, SortDirection::Descending));
        tracker.commit(toggled);
        assert_eq!(tracker.toggle(0), SortAction::Sort(0, SortDirection::Ascending));
    }

    #[test]
    fn test_header_toggle_on_mapping() {
        let mut tracker = SortTracker::new(SortState::Unsorted, true);
        for expected in [
            SortState::Ascending(1),
            SortState::Descending(1),
            SortState::Unsorted,
            SortState::Ascending(1),
        ] {
            let action = tracker.toggle(1);
            tracker.commit(action);
            assert_eq!(tracker.state(), expected);
        }
    }

    #[test]
    fn test_other_column_starts_fresh() {
        let mut tracker = SortTracker::new(SortState::Unsorted, true);
        tracker.commit(SortAction::Sort(0, SortDirection::Ascending));
        assert_eq!(tracker.request(2, SortDirection::Ascending), SortAction::Sort(2, SortDirection::Ascending));
        assert_eq!(tracker.toggle(2), SortAction::Sort(2, SortDirection::Ascending));
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!(SortDirection::from_str("DESC"), Some(SortDirection::Descending));
        assert_eq!(SortDirection::from_str("asc"), Some(SortDirection::Ascending));
        assert_eq!(SortDirection::from_str("up"), None);
    }
}
