//! Collection adapter (read path).
//!
//! Turns one collection snapshot into addressable table rows:
//!
//! - `keys` holds every key in current row order
//! - `meta` holds size/type records for the loaded prefix only, so
//!   `meta.len()` is the loaded row count and `keys.len()` the total
//! - both arrays are only ever reordered together through one permutation
//!
//! Large collections start with one page loaded and grow through
//! `fetch_more`. Paging is also exposed as a split request/resolve/apply
//! protocol: a page resolved against an older generation (a `reset`
//! happened in between) is dropped on arrival instead of applied.
//!
//! Mutations live in `mutation.rs`.
//!
//! # Examples
//!
//! ```
//! use collview::{AdapterOptions, CollectionAdapter, SortDirection, Value};
//!
//! let value = Value::dict(vec![("b", Value::Int(2)), ("a", Value::str("x"))]);
//! let mut adapter = CollectionAdapter::from_value(value, AdapterOptions::default()).unwrap();
//! assert_eq!(adapter.title(), "Dictionary (2 elements)");
//!
//! adapter.sort(0, SortDirection::Ascending).unwrap();
//! assert_eq!(adapter.get_row(0).unwrap().key.to_string(), "a");
//! ```

use crate::changeset::{AdapterChange, Changeset};
use crate::classify::{classify, DisplayCategory};
use crate::collection::CollectionKind;
use crate::config::AdapterOptions;
use crate::display::{edit_text, value_to_display, wrap_text, TOOLTIP_WIDTH};
use crate::error::{Error, Result};
use crate::natural::natural_cmp;
use crate::provider::{LocalProvider, Metadata, ValueProvider, ValueTraits};
use crate::search;
use crate::selection::select_row_tooltip;
use crate::sort::{
    apply_permutation, sort_permutation, try_sort_permutation, SortAction, SortDirection, SortState, SortTracker,
};
use crate::value::{Key, Value};
use std::collections::HashMap;

pub const COLUMN_KEY: usize = 0;
pub const COLUMN_TYPE: usize = 1;
pub const COLUMN_SIZE: usize = 2;
pub const COLUMN_VALUE: usize = 3;
pub const COLUMN_SCORE: usize = 4;

/// Asks the consumer whether the pointer is over the select-row button of
/// `row`; answers `Some(is_selected)` if so, `None` otherwise
pub type HoverQuery = Box<dyn Fn(usize) -> Option<bool>>;

/// One rendered table row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: Key,
    pub type_name: String,
    pub size: String,
    pub display: String,
    /// Present when the score column is enabled
    pub score: Option<u32>,
}

/// Keys of one page, tagged with the generation they were requested in
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub generation: u64,
    pub start: usize,
    pub keys: Vec<Key>,
}

/// A resolved page waiting to be applied
#[derive(Debug, Clone)]
pub struct PageResult {
    pub generation: u64,
    pub start: usize,
    pub keys: Vec<Key>,
    pub meta: Vec<Metadata>,
}

/// Freshly loaded state, built completely before it replaces anything
struct Snapshot {
    kind: CollectionKind,
    type_name: String,
    read_only: bool,
    keys: Vec<Key>,
    meta: Vec<Metadata>,
}

pub struct CollectionAdapter {
    pub(crate) provider: Box<dyn ValueProvider>,
    pub(crate) options: AdapterOptions,
    pub(crate) kind: CollectionKind,
    type_name: String,
    pub(crate) read_only: bool,
    title_prefix: String,
    pub(crate) keys: Vec<Key>,
    pub(crate) meta: Vec<Metadata>,
    /// Insertion-order snapshot used to leave a mapping sort
    pub(crate) original_keys: Vec<Key>,
    scores: HashMap<Key, u32>,
    search_text: String,
    pub(crate) sort: SortTracker,
    generation: u64,
    pub(crate) changeset: Changeset,
    score_column: bool,
    hover: Option<HoverQuery>,
}

impl CollectionAdapter {
    pub fn new(provider: Box<dyn ValueProvider>, options: AdapterOptions) -> Result<Self> {
        options.validate()?;
        let snapshot = load(provider.as_ref(), &options)?;
        let (initial, three_state) = initial_sort(snapshot.kind);

        let mut adapter = CollectionAdapter {
            provider,
            options,
            kind: snapshot.kind,
            type_name: String::new(),
            read_only: false,
            title_prefix: String::new(),
            keys: Vec::new(),
            meta: Vec::new(),
            original_keys: Vec::new(),
            scores: HashMap::new(),
            search_text: String::new(),
            sort: SortTracker::new(initial, three_state),
            generation: 0,
            changeset: Changeset::new(),
            score_column: false,
            hover: None,
        };
        adapter.install(snapshot);
        Ok(adapter)
    }

    /// Adapter over an in-memory value
    pub fn from_value(value: Value, options: AdapterOptions) -> Result<Self> {
        Self::new(Box::new(LocalProvider::from_value(value)?), options)
    }

    /// Prefix shown before the collection label in `title`
    pub fn with_title(mut self, prefix: impl Into<String>) -> Self {
        self.title_prefix = prefix.into();
        self
    }

    fn install(&mut self, snapshot: Snapshot) {
        let (initial, three_state) = initial_sort(snapshot.kind);
        self.kind = snapshot.kind;
        self.type_name = snapshot.type_name;
        self.read_only = snapshot.read_only;
        self.original_keys = snapshot.keys.clone();
        self.keys = snapshot.keys;
        self.meta = snapshot.meta;
        self.sort = SortTracker::new(initial, three_state);
        self.generation += 1;
        self.rescore();
        self.changeset.push(AdapterChange::ModelReset);
        log::debug!(
            "adapter generation {}: {} rows, {} loaded",
            self.generation,
            self.keys.len(),
            self.meta.len()
        );
    }

    /// Replaces the provider and rebuilds everything from it.
    ///
    /// On failure the adapter keeps its previous provider and state.
    pub fn reset(&mut self, provider: Box<dyn ValueProvider>) -> Result<()> {
        let snapshot = load(provider.as_ref(), &self.options)?;
        self.provider = provider;
        self.install(snapshot);
        Ok(())
    }

    /// Rebuilds from the current provider, e.g. after remote state changed
    pub fn refresh(&mut self) -> Result<()> {
        let snapshot = load(self.provider.as_ref(), &self.options)?;
        self.install(snapshot);
        Ok(())
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }

    pub fn is_remote(&self) -> bool {
        self.provider.is_remote()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn provider(&self) -> &dyn ValueProvider {
        self.provider.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn changeset(&self) -> &Changeset {
        &self.changeset
    }

    /// Drops change history every consumer has already synced past
    pub fn compact_changeset(&mut self, revision: u64) {
        self.changeset.compact(revision);
    }

    pub fn row_count(&self) -> usize {
        self.meta.len()
    }

    pub fn total_row_count(&self) -> usize {
        self.keys.len()
    }

    pub fn can_fetch_more(&self) -> bool {
        self.keys.len() > self.meta.len()
    }

    /// Window title, e.g. `"List (3 elements)"`
    pub fn title(&self) -> String {
        let label = match self.type_name.as_str() {
            "list" => "List",
            "tuple" => "Tuple",
            "set" => "Set",
            "dict" => "Dictionary",
            other => return format!("{}{}", self.title_prefix, other),
        };
        let count = self.keys.len();
        let noun = if count > 1 { "elements" } else { "element" };
        format!("{}{} ({} {})", self.title_prefix, label, count, noun)
    }

    pub fn column_count(&self) -> usize {
        if self.score_column {
            5
        } else {
            4
        }
    }

    /// The score column exists only for consumers that sort by it
    pub fn set_score_column(&mut self, enabled: bool) {
        self.score_column = enabled;
    }

    pub fn header(&self, column: usize) -> Option<String> {
        let label = match column {
            COLUMN_KEY if self.options.show_names => "Name",
            COLUMN_KEY => match self.kind {
                CollectionKind::Sequence | CollectionKind::Set => "Index",
                CollectionKind::Mapping => "Key",
                CollectionKind::Object => "Attribute",
            },
            COLUMN_TYPE => "Type",
            COLUMN_SIZE => "Size",
            COLUMN_VALUE => "Value",
            COLUMN_SCORE if self.score_column => "Score",
            _ => return None,
        };
        Some(label.to_string())
    }

    pub fn headers(&self) -> Vec<String> {
        (0..self.column_count()).filter_map(|c| self.header(c)).collect()
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.meta.len() {
            return Err(Error::IndexOutOfRange {
                index: row,
                len: self.meta.len(),
            });
        }
        Ok(())
    }

    fn check_column(&self, column: usize) -> Result<()> {
        if column >= self.column_count() {
            return Err(Error::IndexOutOfRange {
                index: column,
                len: self.column_count(),
            });
        }
        Ok(())
    }

    // ---- paging ----

    /// Keys of the next page, or `None` when everything is loaded
    pub fn request_page(&self, count: Option<usize>) -> Option<PageRequest> {
        let start = self.meta.len();
        let remaining = self.keys.len() - start;
        if remaining == 0 {
            return None;
        }
        let count = count.unwrap_or(self.options.page_size).min(remaining);
        Some(PageRequest {
            generation: self.generation,
            start,
            keys: self.keys[start..start + count].to_vec(),
        })
    }

    /// Fetches metadata for a requested page with one batched describe
    pub fn resolve_page(&self, request: PageRequest) -> Result<PageResult> {
        let meta = describe_in_order(self.provider.as_ref(), &request.keys)?;
        Ok(PageResult {
            generation: request.generation,
            start: request.start,
            keys: request.keys,
            meta,
        })
    }

    /// Appends a resolved page; returns false when it went stale
    pub fn apply_page(&mut self, page: PageResult) -> bool {
        if page.generation != self.generation {
            log::warn!(
                "discarding page from generation {} (now {})",
                page.generation,
                self.generation
            );
            return false;
        }
        let end = page.start + page.keys.len();
        if page.start != self.meta.len() || end > self.keys.len() || self.keys[page.start..end] != page.keys[..] {
            log::warn!("discarding page at {}: rows moved since it was requested", page.start);
            return false;
        }

        let count = page.meta.len();
        self.meta.extend(page.meta);
        self.changeset.push(AdapterChange::RowsAppended {
            start: page.start,
            count,
        });
        log::debug!("loaded rows {}..{} of {}", page.start, end, self.keys.len());
        true
    }

    /// Loads up to `count` more rows (one page by default); returns how
    /// many were added
    pub fn fetch_more(&mut self, count: Option<usize>) -> Result<usize> {
        let Some(request) = self.request_page(count) else {
            return Ok(0);
        };
        let page = self.resolve_page(request)?;
        let added = page.keys.len();
        Ok(if self.apply_page(page) { added } else { 0 })
    }

    pub fn load_all(&mut self) -> Result<()> {
        let total = self.keys.len();
        self.fetch_more(Some(total))?;
        Ok(())
    }

    // ---- row access ----

    pub fn get_key(&self, row: usize) -> Result<Key> {
        self.check_row(row)?;
        Ok(self.keys[row].clone())
    }

    pub fn get_value(&self, key: &Key) -> Result<Value> {
        self.provider.get_value(key)
    }

    /// Row holding `key`, if it is loaded
    pub fn index_of_key(&self, key: &Key) -> Option<usize> {
        self.keys[..self.meta.len()].iter().position(|k| k == key)
    }

    pub fn row_key(&self, row: usize) -> Result<&Key> {
        self.check_row(row)?;
        Ok(&self.keys[row])
    }

    pub fn row_type(&self, row: usize) -> Result<&str> {
        self.check_row(row)?;
        Ok(&self.meta[row].type_name)
    }

    pub fn metadata(&self, row: usize) -> Result<&Metadata> {
        self.check_row(row)?;
        Ok(&self.meta[row])
    }

    pub fn score(&self, row: usize) -> Result<u32> {
        self.check_row(row)?;
        Ok(self.scores.get(&self.keys[row]).copied().unwrap_or(0))
    }

    /// Value for display; unreadable entries degrade to `None`
    fn value_or_placeholder(&self, key: &Key) -> Value {
        match self.provider.get_value(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("value for {} unavailable: {}", key, e);
                Value::Null
            }
        }
    }

    fn value_text(&self, row: usize) -> String {
        if let Some(traits) = &self.meta[row].traits {
            return traits.view.clone();
        }
        value_to_display(&self.value_or_placeholder(&self.keys[row]), self.options.show_minmax)
    }

    pub fn get_row(&self, row: usize) -> Result<Row> {
        self.check_row(row)?;
        let meta = &self.meta[row];
        Ok(Row {
            key: self.keys[row].clone(),
            type_name: meta.type_name.clone(),
            size: meta.size.clone(),
            display: self.value_text(row),
            score: self.score_column.then(|| self.scores.get(&self.keys[row]).copied().unwrap_or(0)),
        })
    }

    /// Display string of one cell
    pub fn display(&self, row: usize, column: usize) -> Result<String> {
        self.check_row(row)?;
        self.check_column(column)?;
        Ok(match column {
            COLUMN_KEY => self.keys[row].to_string(),
            COLUMN_TYPE => self.meta[row].type_name.clone(),
            COLUMN_SIZE => self.meta[row].size.clone(),
            COLUMN_VALUE => self.value_text(row),
            _ => self.score(row)?.to_string(),
        })
    }

    /// Text placed in the editor when a value cell is edited
    pub fn edit_value(&self, row: usize) -> Result<String> {
        self.check_row(row)?;
        Ok(edit_text(&self.provider.get_value(&self.keys[row])?))
    }

    /// Operand used by the proxy comparator: numbers stay numeric, every
    /// other cell compares as its display text
    pub fn sort_value(&self, row: usize, column: usize) -> Result<Value> {
        self.check_row(row)?;
        self.check_column(column)?;
        Ok(match column {
            COLUMN_KEY => match &self.keys[row] {
                Key::Str(s) => Value::Str(s.clone()),
                Key::Int(i) => Value::Int(*i),
                Key::Float(f) => Value::Float(*f),
                Key::Bool(b) => Value::Bool(*b),
                other => Value::Str(other.to_string()),
            },
            COLUMN_VALUE if self.meta[row].traits.is_none() => {
                let value = self.value_or_placeholder(&self.keys[row]);
                if value.is_numeric() {
                    value
                } else {
                    Value::Str(value_to_display(&value, self.options.show_minmax))
                }
            }
            COLUMN_SCORE => Value::Int(self.score(row)? as i64),
            _ => Value::Str(self.display(row, column)?),
        })
    }

    /// Precomputed or freshly derived facts about one row's value
    pub fn value_traits(&self, row: usize) -> Result<ValueTraits> {
        self.check_row(row)?;
        if let Some(traits) = &self.meta[row].traits {
            return Ok(traits.clone());
        }
        let value = self.provider.get_value(&self.keys[row])?;
        Ok(ValueTraits::of(&value, self.options.show_minmax))
    }

    /// Color group of a row
    pub fn category(&self, row: usize) -> Result<DisplayCategory> {
        self.check_row(row)?;
        if let Some(traits) = &self.meta[row].traits {
            return Ok(classify(&traits.python_type, traits.specialized));
        }
        let value = self.value_or_placeholder(&self.keys[row]);
        Ok(classify(&value.type_name(), value.specialized_kind()))
    }

    pub fn set_hover_query(&mut self, query: HoverQuery) {
        self.hover = Some(query);
    }

    pub fn clear_hover_query(&mut self) {
        self.hover = None;
    }

    pub fn tooltip(&self, row: usize, column: usize) -> Result<String> {
        self.check_row(row)?;
        if let Some(selected) = self.hover.as_ref().and_then(|query| query(row)) {
            return Ok(select_row_tooltip(selected));
        }
        let text = self.display(row, column)?;
        let lines: Vec<String> = text.lines().flat_map(|line| wrap_text(line, TOOLTIP_WIDTH)).collect();
        Ok(lines.join("\n"))
    }

    // ---- search ----

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    /// Scores every key against `text` and notifies a model reset
    pub fn set_search_text(&mut self, text: &str) {
        self.search_text = text.to_string();
        self.rescore();
        self.changeset.push(AdapterChange::ModelReset);
    }

    pub(crate) fn rescore(&mut self) {
        self.scores = self
            .keys
            .iter()
            .map(|k| (k.clone(), search::score(&self.search_text, &k.to_string())))
            .collect();
    }

    // ---- sorting ----

    pub fn sort_state(&self) -> SortState {
        self.sort.state()
    }

    /// Sorts by `column`; repeating an ascending key sort on a mapping
    /// returns to insertion order
    pub fn sort(&mut self, column: usize, direction: SortDirection) -> Result<()> {
        self.check_column(column)?;
        let action = self.sort.request(column, direction);
        self.apply_sort(action)
    }

    /// Header click
    pub fn toggle_sort(&mut self, column: usize) -> Result<SortState> {
        self.check_column(column)?;
        let action = self.sort.toggle(column);
        self.apply_sort(action)?;
        Ok(self.sort.state())
    }

    fn apply_sort(&mut self, action: SortAction) -> Result<()> {
        match action {
            SortAction::Restore => {
                let keys = self.original_keys.clone();
                self.reorder(keys)?;
            }
            SortAction::Sort(COLUMN_KEY, direction) => {
                let keys = &self.keys;
                let order = if keys.iter().all(Key::is_textual) {
                    Ok(sort_permutation(keys.len(), direction, |a, b| {
                        natural_cmp(keys[a].as_str().unwrap_or_default(), keys[b].as_str().unwrap_or_default())
                    }))
                } else {
                    try_sort_permutation(keys.len(), direction, |a, b| keys[a].try_cmp(&keys[b]))
                };
                match order {
                    Ok(order) => {
                        let keys = apply_permutation(&self.keys, &order);
                        self.reorder(keys)?;
                    }
                    Err(_) => log::debug!("keys are not mutually orderable, order unchanged"),
                }
            }
            SortAction::Sort(column @ (COLUMN_TYPE | COLUMN_SIZE), direction) => {
                // Only the loaded rows carry type/size
                let meta = &self.meta;
                let field = |m: &Metadata| -> String {
                    if column == COLUMN_TYPE {
                        m.type_name.clone()
                    } else {
                        m.size.clone()
                    }
                };
                let order = sort_permutation(meta.len(), direction, |a, b| field(&meta[a]).cmp(&field(&meta[b])));
                let loaded = self.meta.len();
                let prefix = apply_permutation(&self.keys[..loaded], &order);
                self.meta = apply_permutation(&self.meta, &order);
                self.keys[..loaded].clone_from_slice(&prefix);
            }
            SortAction::Sort(COLUMN_SCORE, direction) => {
                let scores: Vec<u32> = self
                    .keys
                    .iter()
                    .map(|k| self.scores.get(k).copied().unwrap_or(0))
                    .collect();
                let order = sort_permutation(scores.len(), direction, |a, b| scores[a].cmp(&scores[b]));
                let keys = apply_permutation(&self.keys, &order);
                self.reorder(keys)?;
            }
            SortAction::Sort(_, direction) => {
                let values = self.comparable_values()?;
                match try_sort_permutation(values.len(), direction, |a, b| values[a].try_cmp(&values[b])) {
                    Ok(order) => {
                        let keys = apply_permutation(&self.keys, &order);
                        self.reorder(keys)?;
                    }
                    Err(_) => log::debug!("values are not mutually orderable, order unchanged"),
                }
            }
        }

        self.sort.commit(action);
        self.changeset.push(AdapterChange::ModelReset);
        log::debug!("sort state now {:?}", self.sort.state());
        Ok(())
    }

    /// Every key's value in row order; remote rows compare by their view text
    fn comparable_values(&self) -> Result<Vec<Value>> {
        if !self.provider.is_remote() {
            return Ok(self.keys.iter().map(|k| self.value_or_placeholder(k)).collect());
        }
        let known = self.known_metadata();
        let missing: Vec<Key> = self.keys.iter().filter(|k| !known.contains_key(*k)).cloned().collect();
        let fetched = self.provider.describe(&missing)?;
        Ok(self
            .keys
            .iter()
            .map(|k| {
                let meta = known.get(k).copied().or_else(|| fetched.get(k));
                let view = meta.and_then(|m| m.traits.as_ref()).map(|t| t.view.clone());
                Value::Str(view.unwrap_or_default())
            })
            .collect())
    }

    fn known_metadata(&self) -> HashMap<&Key, &Metadata> {
        self.keys.iter().zip(self.meta.iter()).collect()
    }

    /// Installs a new key order over the same key set, carrying loaded
    /// metadata along and describing newly exposed rows in one batch
    pub(crate) fn reorder(&mut self, keys: Vec<Key>) -> Result<()> {
        let loaded = self.meta.len().min(keys.len());
        let mut known: HashMap<Key, Metadata> = self
            .keys
            .iter()
            .cloned()
            .zip(self.meta.iter().cloned())
            .collect();
        let missing: Vec<Key> = keys[..loaded].iter().filter(|k| !known.contains_key(*k)).cloned().collect();
        if !missing.is_empty() {
            let fetched = self.provider.describe(&missing)?;
            known.extend(fetched);
        }
        let meta = keys[..loaded]
            .iter()
            .map(|k| known.remove(k).unwrap_or_else(Metadata::placeholder))
            .collect();
        self.keys = keys;
        self.meta = meta;
        Ok(())
    }
}

fn initial_sort(kind: CollectionKind) -> (SortState, bool) {
    match kind {
        CollectionKind::Mapping => (SortState::Unsorted, true),
        _ => (SortState::Ascending(COLUMN_KEY), false),
    }
}

pub(crate) fn describe_in_order(provider: &dyn ValueProvider, keys: &[Key]) -> Result<Vec<Metadata>> {
    let mut described = provider.describe(keys)?;
    Ok(keys
        .iter()
        .map(|k| described.remove(k).unwrap_or_else(Metadata::placeholder))
        .collect())
}

fn load(provider: &dyn ValueProvider, options: &AdapterOptions) -> Result<Snapshot> {
    let keys = provider.keys()?;
    let total = keys.len();
    let loaded = if total > options.large_threshold {
        options.page_size.min(total)
    } else {
        total
    };
    let meta = describe_in_order(provider, &keys[..loaded])?;
    Ok(Snapshot {
        kind: provider.kind(),
        type_name: provider.type_name(),
        read_only: provider.is_read_only(),
        keys,
        meta,
    })
}
