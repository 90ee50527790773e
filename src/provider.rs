/// Value providers
///
/// A `ValueProvider` is where the adapter's data actually lives. The local
/// provider owns an in-memory `Collection` and answers directly; the remote
/// provider (see `remote.rs`) forwards every call over a request/response
/// channel to another execution context.
///
/// Metadata for a page of rows is always fetched with one `describe` call
/// carrying every key of that page, so the remote provider pays one round
/// trip per page instead of one per cell.

use crate::classify::SpecializedKind;
use crate::collection::{deep_copy, Collection, CollectionKind};
use crate::display::value_to_display;
use crate::error::{Error, Result};
use crate::value::{FrameKind, Key, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Precomputed facts about one value, shipped with remote metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueTraits {
    /// Runtime type name used for classification
    pub python_type: String,
    pub specialized: SpecializedKind,
    pub is_list: bool,
    pub is_set: bool,
    pub is_dict: bool,
    pub is_array: bool,
    pub is_data_frame: bool,
    pub is_series: bool,
    pub is_image: bool,
    pub len: Option<usize>,
    pub shape: Option<Vec<usize>>,
    pub ndim: Option<usize>,
    /// Value-column text rendered on the owning side
    pub view: String,
}

impl ValueTraits {
    pub fn of(value: &Value, minmax: bool) -> Self {
        let shape = value.shape();
        ValueTraits {
            python_type: value.type_name(),
            specialized: value.specialized_kind(),
            is_list: matches!(value, Value::List(_) | Value::Tuple(_)),
            is_set: matches!(value, Value::Set(_)),
            is_dict: matches!(value, Value::Dict(_)),
            is_array: matches!(value, Value::Array(_)),
            is_data_frame: matches!(value, Value::Frame(f) if f.kind == FrameKind::DataFrame),
            is_series: matches!(value, Value::Frame(f) if f.kind == FrameKind::Series),
            is_image: matches!(value, Value::Image(_)),
            len: value.len(),
            ndim: shape.as_ref().map(Vec::len),
            shape,
            view: value_to_display(value, minmax),
        }
    }
}

/// Size/type record for one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub size: String,
    pub type_name: String,
    /// Present only for remote rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<ValueTraits>,
}

impl Metadata {
    pub fn of(value: &Value) -> Self {
        Metadata {
            size: value.size(),
            type_name: value.readable_type(),
            traits: None,
        }
    }

    pub fn with_traits(value: &Value, minmax: bool) -> Self {
        Metadata {
            traits: Some(ValueTraits::of(value, minmax)),
            ..Metadata::of(value)
        }
    }

    /// Stand-in for a row whose value could not be read
    pub fn placeholder() -> Self {
        Metadata::of(&Value::Null)
    }
}

/// Where an adapter's values live
pub trait ValueProvider {
    fn kind(&self) -> CollectionKind;

    /// Type name of the whole collection
    fn type_name(&self) -> String;

    fn is_read_only(&self) -> bool;

    /// Remote providers own the truth; adapters reload after each mutation
    fn is_remote(&self) -> bool {
        false
    }

    /// Current keys in initial order
    fn keys(&self) -> Result<Vec<Key>>;

    fn get_value(&self, key: &Key) -> Result<Value>;

    /// Metadata for many keys in one call; unreadable entries get a
    /// placeholder record instead of failing the batch
    fn describe(&self, keys: &[Key]) -> Result<HashMap<Key, Metadata>>;

    fn set_value(&mut self, key: &Key, value: Value) -> Result<()>;

    /// Assigns a new mapping entry
    fn new_value(&mut self, key: &Key, value: Value) -> Result<()>;

    /// Splices a value into a sequence
    fn insert_at(&mut self, position: usize, value: Value) -> Result<()> {
        let _ = (position, value);
        Err(Error::unsupported("positional insert", self.kind()))
    }

    fn remove_values(&mut self, keys: &[Key]) -> Result<()>;

    /// Copies `source` to `target` and returns the key actually written
    fn copy_value(&mut self, source: &Key, target: &Key) -> Result<Key>;

    /// Runs a side-effect-only command in the owning context
    fn execute(&mut self, command: &str) -> Result<()> {
        let _ = command;
        Err(Error::unsupported("execute", self.kind()))
    }

    /// The collection as one value, for edit sessions and export
    fn snapshot(&self) -> Result<Value>;
}

/// In-memory provider over an owned collection
#[derive(Debug, Clone)]
pub struct LocalProvider {
    collection: Collection,
}

impl LocalProvider {
    pub fn new(collection: Collection) -> Self {
        LocalProvider { collection }
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(LocalProvider::new(Collection::from_value(value)?))
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.collection.is_read_only() {
            Err(Error::ReadOnly {
                what: self.collection.type_name(),
            })
        } else {
            Ok(())
        }
    }
}

impl ValueProvider for LocalProvider {
    fn kind(&self) -> CollectionKind {
        self.collection.kind()
    }

    fn type_name(&self) -> String {
        self.collection.type_name()
    }

    fn is_read_only(&self) -> bool {
        self.collection.is_read_only()
    }

    fn keys(&self) -> Result<Vec<Key>> {
        Ok(self.collection.keys())
    }

    fn get_value(&self, key: &Key) -> Result<Value> {
        self.collection.get(key)
    }

    fn describe(&self, keys: &[Key]) -> Result<HashMap<Key, Metadata>> {
        let mut out = HashMap::with_capacity(keys.len());
        for key in keys {
            let meta = match self.collection.get(key) {
                Ok(value) => Metadata::of(&value),
                Err(e) => {
                    log::warn!("describe: {} unreadable, using placeholder: {}", key, e);
                    Metadata::placeholder()
                }
            };
            out.insert(key.clone(), meta);
        }
        Ok(out)
    }

    fn set_value(&mut self, key: &Key, value: Value) -> Result<()> {
        self.ensure_writable()?;
        self.collection.set(key, value)
    }

    fn new_value(&mut self, key: &Key, value: Value) -> Result<()> {
        self.ensure_writable()?;
        match self.collection.kind() {
            CollectionKind::Mapping => self.collection.set(key, value),
            kind => Err(Error::unsupported("keyed insert", kind)),
        }
    }

    fn insert_at(&mut self, position: usize, value: Value) -> Result<()> {
        self.ensure_writable()?;
        self.collection.insert_at(position, value)
    }

    fn remove_values(&mut self, keys: &[Key]) -> Result<()> {
        self.ensure_writable()?;
        self.collection.remove(keys)
    }

    fn copy_value(&mut self, source: &Key, target: &Key) -> Result<Key> {
        self.ensure_writable()?;
        self.collection.copy(source, target)
    }

    fn snapshot(&self) -> Result<Value> {
        Ok(deep_copy(&self.collection.to_value()))
    }
}
