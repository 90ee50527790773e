//! Filter/sort proxy over a shared adapter.
//!
//! The proxy keeps a `proxy_to_source` row mapping on top of an
//! `Rc<RefCell<CollectionAdapter>>` and follows the adapter's changeset.
//! Appended pages, single-row inserts, removals and updates are applied
//! incrementally; anything else triggers a rebuild.
//!
//! Rows pass the filter when the filter text occurs (case-insensitively) in
//! their name or their type. Sorting is two-state: text cells compare in
//! natural order, everything else ordinally, and operands that cannot be
//! ordered at all compare as "less".

use crate::adapter::{CollectionAdapter, COLUMN_SCORE};
use crate::changeset::{AdapterChange, IncrementalView, IndexAdjuster};
use crate::error::{Error, Result};
use crate::natural::natural_cmp;
use crate::search::normalize_query;
use crate::sort::{stable_sort_by, SortDirection};
use crate::value::{Key, Value};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

/// Comparator used by the proxy for two cell values
pub fn proxy_less_than(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => natural_cmp(a, b) == Ordering::Less,
        _ => left.try_cmp(right).map_or(true, |o| o == Ordering::Less),
    }
}

pub struct FilterProxy {
    source: Rc<RefCell<CollectionAdapter>>,
    /// Lowercased filter text; empty accepts everything
    filter: String,
    proxy_to_source: Vec<usize>,
    source_to_proxy: HashMap<usize, usize>,
    sort: Option<(usize, SortDirection)>,
    last_synced_revision: u64,
}

impl FilterProxy {
    /// Wraps `source` and enables its score column
    pub fn new(source: Rc<RefCell<CollectionAdapter>>) -> Self {
        source.borrow_mut().set_score_column(true);
        let mut proxy = FilterProxy {
            source,
            filter: String::new(),
            proxy_to_source: Vec::new(),
            source_to_proxy: HashMap::new(),
            sort: None,
            last_synced_revision: 0,
        };
        proxy.rebuild();
        proxy
    }

    pub fn source(&self) -> &Rc<RefCell<CollectionAdapter>> {
        &self.source
    }

    pub fn row_count(&self) -> usize {
        self.proxy_to_source.len()
    }

    pub fn filter_text(&self) -> &str {
        &self.filter
    }

    pub fn sort_column(&self) -> Option<(usize, SortDirection)> {
        self.sort
    }

    pub fn map_to_source(&self, proxy_row: usize) -> Option<usize> {
        self.proxy_to_source.get(proxy_row).copied()
    }

    pub fn map_from_source(&self, source_row: usize) -> Option<usize> {
        self.source_to_proxy.get(&source_row).copied()
    }

    fn source_row(&self, proxy_row: usize) -> Result<usize> {
        self.map_to_source(proxy_row).ok_or(Error::IndexOutOfRange {
            index: proxy_row,
            len: self.proxy_to_source.len(),
        })
    }

    fn accepts(&self, adapter: &CollectionAdapter, source_row: usize) -> bool {
        if self.filter.is_empty() {
            return true;
        }
        let name = match adapter.row_key(source_row) {
            Ok(key) => key.to_string().to_lowercase(),
            Err(_) => return false,
        };
        let type_name = adapter.row_type(source_row).map(str::to_lowercase).unwrap_or_default();
        name.contains(&self.filter) || type_name.contains(&self.filter)
    }

    /// Loads every row, then keeps those whose name or type contains `text`
    pub fn set_filter(&mut self, text: &str) -> Result<()> {
        self.source.borrow_mut().load_all()?;
        self.filter = text.to_lowercase();
        self.rebuild();
        Ok(())
    }

    pub fn sort(&mut self, column: usize, direction: SortDirection) -> Result<()> {
        let columns = self.source.borrow().column_count();
        if column >= columns {
            return Err(Error::IndexOutOfRange {
                index: column,
                len: columns,
            });
        }
        self.sort = Some((column, direction));
        self.sort_rows();
        self.reindex();
        Ok(())
    }

    /// Header click: ascending first, then flip
    pub fn toggle_sort(&mut self, column: usize) -> Result<SortDirection> {
        let direction = match self.sort {
            Some((c, SortDirection::Ascending)) if c == column => SortDirection::Descending,
            _ => SortDirection::Ascending,
        };
        self.sort(column, direction)?;
        Ok(direction)
    }

    fn sort_values(&self, adapter: &CollectionAdapter, column: usize, rows: &[usize]) -> HashMap<usize, Value> {
        rows.iter()
            .map(|&row| {
                let value = adapter.sort_value(row, column).unwrap_or(Value::Null);
                (row, value)
            })
            .collect()
    }

    fn sort_rows(&mut self) {
        let Some((column, direction)) = self.sort else {
            return;
        };
        let adapter = self.source.borrow();
        let values = self.sort_values(&adapter, column, &self.proxy_to_source);
        let less = |a: &usize, b: &usize| proxy_less_than(&values[a], &values[b]);
        match direction {
            SortDirection::Ascending => stable_sort_by(&mut self.proxy_to_source, |a, b| less(a, b)),
            SortDirection::Descending => stable_sort_by(&mut self.proxy_to_source, |a, b| less(b, a)),
        }
    }

    /// Proxy position for a new source row under the current sort
    fn insertion_point(&self, adapter: &CollectionAdapter, source_row: usize) -> usize {
        match self.sort {
            None => self.proxy_to_source.partition_point(|&r| r < source_row),
            Some((column, direction)) => {
                let value = adapter.sort_value(source_row, column).unwrap_or(Value::Null);
                self.proxy_to_source
                    .iter()
                    .position(|&r| {
                        let other = adapter.sort_value(r, column).unwrap_or(Value::Null);
                        match direction {
                            SortDirection::Ascending => proxy_less_than(&value, &other),
                            SortDirection::Descending => proxy_less_than(&other, &value),
                        }
                    })
                    .unwrap_or(self.proxy_to_source.len())
            }
        }
    }

    fn insert_source_row(&mut self, source_row: usize) -> bool {
        let adapter = Rc::clone(&self.source);
        let adapter = adapter.borrow();
        if !self.accepts(&adapter, source_row) {
            return false;
        }
        let at = self.insertion_point(&adapter, source_row);
        self.proxy_to_source.insert(at, source_row);
        true
    }

    fn reindex(&mut self) {
        self.source_to_proxy = self
            .proxy_to_source
            .iter()
            .enumerate()
            .map(|(proxy, &source)| (source, proxy))
            .collect();
    }

    pub fn get_key(&self, proxy_row: usize) -> Result<Key> {
        let row = self.source_row(proxy_row)?;
        self.source.borrow().get_key(row)
    }

    pub fn get_value(&self, proxy_row: usize) -> Result<Value> {
        let key = self.get_key(proxy_row)?;
        self.source.borrow().get_value(&key)
    }

    /// Writes through to the adapter; refusals from read-only collections
    /// and objects are ignored
    pub fn set_value(&mut self, proxy_row: usize, value: Value) -> Result<()> {
        let key = self.get_key(proxy_row)?;
        let result = self.source.borrow_mut().set_value(&key, value);
        match result {
            Err(Error::ReadOnly { what }) => {
                log::debug!("ignoring write to read-only {}", what);
            }
            Err(Error::ValueNotSettable { key, reason }) => {
                log::debug!("ignoring write to {}: {}", key, reason);
            }
            other => other?,
        }
        self.sync();
        Ok(())
    }

    pub fn display(&self, proxy_row: usize, column: usize) -> Result<String> {
        let row = self.source_row(proxy_row)?;
        self.source.borrow().display(row, column)
    }

    pub fn index_of_key(&self, key: &Key) -> Option<usize> {
        let row = self.source.borrow().index_of_key(key)?;
        self.map_from_source(row)
    }

    /// Search: filter by `text`, score every row, best matches first
    pub fn find(&mut self, text: &str) -> Result<()> {
        let query = normalize_query(text);
        self.set_filter(&query)?;
        self.source.borrow_mut().set_search_text(&query);
        self.sync();
        if !query.is_empty() {
            self.sort(COLUMN_SCORE, SortDirection::Descending)?;
        }
        log::debug!("find '{}': {} rows", query, self.row_count());
        Ok(())
    }

    /// Next row, wrapping to the top
    pub fn next_row(&self, current: Option<usize>) -> Option<usize> {
        let rows = self.row_count();
        if rows == 0 {
            return None;
        }
        Some(match current {
            Some(row) if row + 1 < rows => row + 1,
            _ => 0,
        })
    }

    /// Previous row, wrapping to the bottom
    pub fn previous_row(&self, current: Option<usize>) -> Option<usize> {
        let rows = self.row_count();
        if rows == 0 {
            return None;
        }
        Some(match current {
            Some(row) if row > 0 && row <= rows => row - 1,
            _ => rows - 1,
        })
    }

    /// Catches up with the adapter; returns true if rows changed
    pub fn sync(&mut self) -> bool {
        let pending = {
            let adapter = self.source.borrow();
            adapter
                .changeset()
                .since(self.last_synced_revision)
                .map(<[AdapterChange]>::to_vec)
        };
        let changed = match pending {
            Some(changes) => self.apply_changes(&changes),
            None => {
                self.rebuild();
                true
            }
        };
        self.last_synced_revision = self.source.borrow().changeset().revision();
        changed
    }
}

impl IncrementalView for FilterProxy {
    fn apply_changes(&mut self, changes: &[AdapterChange]) -> bool {
        if changes.contains(&AdapterChange::ModelReset) {
            self.rebuild();
            return true;
        }

        let mut modified = false;
        for change in changes {
            match change {
                AdapterChange::ModelReset => {}
                AdapterChange::RowsAppended { start, count } => {
                    for row in *start..start + count {
                        modified |= self.insert_source_row(row);
                    }
                }
                AdapterChange::RowInserted { index } => {
                    IndexAdjuster::adjust_mapping_for_insert(&mut self.proxy_to_source, *index);
                    modified |= self.insert_source_row(*index);
                }
                AdapterChange::RowsRemoved { indexes } => {
                    let before = self.proxy_to_source.len();
                    IndexAdjuster::adjust_mapping_for_delete(&mut self.proxy_to_source, indexes);
                    modified |= before != self.proxy_to_source.len();
                }
                AdapterChange::RowUpdated { index } => {
                    // Type (and so membership and order) may have changed
                    let was_present = self.proxy_to_source.contains(index);
                    self.proxy_to_source.retain(|r| r != index);
                    let present = self.insert_source_row(*index);
                    modified |= was_present || present;
                }
            }
        }
        self.reindex();
        modified
    }

    fn last_synced_revision(&self) -> u64 {
        self.last_synced_revision
    }

    fn rebuild(&mut self) {
        let rows = {
            let adapter = self.source.borrow();
            (0..adapter.row_count())
                .filter(|&row| self.accepts(&adapter, row))
                .collect()
        };
        self.proxy_to_source = rows;
        self.sort_rows();
        self.reindex();
        self.last_synced_revision = self.source.borrow().changeset().revision();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterOptions;
    use crate::mutation::InsertAt;
    use crate::object::Record;
    use crate::value::NdArray;

    fn shared(value: Value) -> Rc<RefCell<CollectionAdapter>> {
        Rc::new(RefCell::new(CollectionAdapter::from_value(value, AdapterOptions::default()).unwrap()))
    }

    fn namespace() -> Rc<RefCell<CollectionAdapter>> {
        shared(Value::dict(vec![
            ("df_prices", Value::Int(1)),
            ("x10", Value::list(vec![Value::Int(1)])),
            ("x2", Value::str("b")),
            ("matrix", Value::Array(NdArray::new(vec![2], vec![1.0, 2.0]))),
        ]))
    }

    fn keys(proxy: &FilterProxy) -> Vec<String> {
        (0..proxy.row_count()).map(|r| proxy.get_key(r).unwrap().to_string()).collect()
    }

    #[test]
    fn test_less_than_rules() {
        assert!(proxy_less_than(&Value::str("x2"), &Value::str("x10")));
        assert!(!proxy_less_than(&Value::str("x10"), &Value::str("x2")));
        assert!(proxy_less_than(&Value::Int(1), &Value::Float(1.5)));
        // Unorderable operands always compare as less
        assert!(proxy_less_than(&Value::Int(1), &Value::str("a")));
        assert!(proxy_less_than(&Value::str("a"), &Value::Int(1)));
    }

    #[test]
    fn test_filter_by_name_or_type() {
        let mut proxy = FilterProxy::new(namespace());
        assert_eq!(proxy.row_count(), 4);
        assert_eq!(proxy.source().borrow().column_count(), 5);

        proxy.set_filter("X").unwrap();
        assert_eq!(keys(&proxy), vec!["x10", "x2", "matrix"]);

        proxy.set_filter("list").unwrap();
        assert_eq!(keys(&proxy), vec!["x10"]);
        assert_eq!(proxy.map_to_source(0), Some(1));
        assert_eq!(proxy.map_from_source(1), Some(0));
        assert_eq!(proxy.map_from_source(0), None);
    }

    #[test]
    fn test_natural_sort_and_toggle() {
        let mut proxy = FilterProxy::new(namespace());
        proxy.set_filter("x").unwrap();
        assert_eq!(proxy.toggle_sort(0).unwrap(), SortDirection::Ascending);
        assert_eq!(keys(&proxy), vec!["matrix", "x2", "x10"]);
        assert_eq!(proxy.toggle_sort(0).unwrap(), SortDirection::Descending);
        assert_eq!(keys(&proxy), vec!["x10", "x2", "matrix"]);
        assert_eq!(proxy.toggle_sort(0).unwrap(), SortDirection::Ascending);
    }

    #[test]
    fn test_mixed_keys_sort_deterministically() {
        let value = Value::dict(vec![(Key::Int(3), Value::Null), (Key::from("a"), Value::Null), (Key::Int(1), Value::Null)]);
        let mut first = FilterProxy::new(shared(value.clone()));
        let mut second = FilterProxy::new(shared(value));
        first.sort(0, SortDirection::Ascending).unwrap();
        second.sort(0, SortDirection::Ascending).unwrap();
        assert_eq!(keys(&first), keys(&second));
        assert_eq!(first.row_count(), 3);
    }

    #[test]
    fn test_find_orders_by_score() {
        let adapter = shared(Value::dict(vec![
            ("beta", Value::Null),
            ("xalpha", Value::Null),
            ("alpha", Value::Null),
            ("gamma", Value::Null),
        ]));
        let mut proxy = FilterProxy::new(adapter);
        proxy.find(" Al pha ").unwrap();
        assert_eq!(keys(&proxy), vec!["alpha", "xalpha"]);
        assert_eq!(proxy.display(0, 4).unwrap(), "100");

        proxy.find("").unwrap();
        assert_eq!(proxy.row_count(), 4);
    }

    #[test]
    fn test_find_loads_every_page() {
        let adapter = shared(Value::list((0..300).map(Value::Int)));
        let mut proxy = FilterProxy::new(Rc::clone(&adapter));
        assert_eq!(proxy.row_count(), 50);
        proxy.find("29").unwrap();
        assert_eq!(adapter.borrow().row_count(), 300);
        assert_eq!(proxy.get_key(0).unwrap(), Key::from(29usize));
        assert!(keys(&proxy).contains(&"129".to_string()));
    }

    #[test]
    fn test_row_navigation_wraps() {
        let proxy = FilterProxy::new(namespace());
        assert_eq!(proxy.next_row(Some(3)), Some(0));
        assert_eq!(proxy.next_row(Some(1)), Some(2));
        assert_eq!(proxy.next_row(None), Some(0));
        assert_eq!(proxy.previous_row(Some(0)), Some(3));
        assert_eq!(proxy.previous_row(None), Some(3));

        let empty = FilterProxy::new(shared(Value::list(vec![])));
        assert_eq!(empty.next_row(None), None);
    }

    #[test]
    fn test_incremental_sync_after_mutations() {
        let adapter = namespace();
        let mut proxy = FilterProxy::new(Rc::clone(&adapter));
        proxy.set_filter("x").unwrap();
        proxy.sort(0, SortDirection::Ascending).unwrap();

        adapter.borrow_mut().insert(InsertAt::Key(Key::from("x5")), Value::Int(0)).unwrap();
        adapter.borrow_mut().insert(InsertAt::Key(Key::from("y")), Value::Int(0)).unwrap();
        assert!(proxy.sync());
        assert_eq!(keys(&proxy), vec!["matrix", "x2", "x5", "x10"]);

        adapter.borrow_mut().remove(&[Key::from("x2")]).unwrap();
        proxy.sync();
        assert_eq!(keys(&proxy), vec!["matrix", "x5", "x10"]);
        let row = proxy.index_of_key(&Key::from("x10")).unwrap();
        assert_eq!(proxy.get_key(row).unwrap(), Key::from("x10"));
    }

    #[test]
    fn test_appended_pages_flow_into_proxy() {
        let adapter = shared(Value::list((0..120).map(Value::Int)));
        let mut proxy = FilterProxy::new(Rc::clone(&adapter));
        proxy.sort(0, SortDirection::Descending).unwrap();
        adapter.borrow_mut().fetch_more(None).unwrap();
        proxy.sync();
        assert_eq!(proxy.row_count(), 100);
        assert_eq!(proxy.get_key(0).unwrap(), Key::from(99usize));
    }

    #[test]
    fn test_set_value_on_read_only_is_ignored() {
        let adapter = shared(Value::Tuple(vec![Value::Int(1)]));
        let mut proxy = FilterProxy::new(adapter);
        proxy.set_value(0, Value::Int(5)).unwrap();
        assert_eq!(proxy.get_value(0).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_refused_attribute_write_is_ignored() {
        let obj = Record::new("Point")
            .field("x", Value::Int(1))
            .read_only_field("y", Value::Int(2))
            .into_object();
        let adapter = shared(Value::Object(obj));
        assert!(matches!(
            adapter.borrow_mut().set_value(&Key::from("y"), Value::Int(9)),
            Err(Error::ValueNotSettable { .. })
        ));

        let mut proxy = FilterProxy::new(adapter);
        let y = proxy.index_of_key(&Key::from("y")).unwrap();
        proxy.set_value(y, Value::Int(9)).unwrap();
        assert_eq!(proxy.get_value(y).unwrap(), Value::Int(2));

        let x = proxy.index_of_key(&Key::from("x")).unwrap();
        proxy.set_value(x, Value::Int(7)).unwrap();
        assert_eq!(proxy.get_value(x).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_compacted_history_rebuilds() {
        let adapter = namespace();
        let mut proxy = FilterProxy::new(Rc::clone(&adapter));
        adapter.borrow_mut().remove(&[Key::from("x2")]).unwrap();
        let revision = adapter.borrow().changeset().revision();
        adapter.borrow_mut().compact_changeset(revision);
        assert!(proxy.sync());
        assert_eq!(proxy.row_count(), 3);
        assert_eq!(proxy.last_synced_revision(), revision);
    }
}
