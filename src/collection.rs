//! Backing collections.
//!
//! A `Collection` is the tagged variant an adapter is built from. The tag is
//! decided once by `Collection::from_value` and every operation matches on
//! it; nothing re-inspects the payload to guess its shape later.

use crate::error::{Error, Result};
use crate::natural::natural_cmp;
use crate::object::{GenericObjectView, ObjectRef};
use crate::value::{Key, Mapping, Value};

/// Structural kind of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CollectionKind {
    Sequence,
    Mapping,
    Set,
    Object,
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CollectionKind::Sequence => "sequence",
            CollectionKind::Mapping => "mapping",
            CollectionKind::Set => "set",
            CollectionKind::Object => "object",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub enum Collection {
    List(Vec<Value>),
    /// Read-only sequence
    Tuple(Vec<Value>),
    /// Materialized in a fixed order at load time; read-only
    Set(Vec<Value>),
    Dict(Mapping),
    Object(GenericObjectView),
}

impl Collection {
    /// Tags a value; scalars cannot be browsed
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => Ok(Collection::List(items)),
            Value::Tuple(items) => Ok(Collection::Tuple(items)),
            Value::Set(items) => Ok(Collection::Set(items)),
            Value::Dict(mapping) => Ok(Collection::Dict(mapping)),
            Value::Object(obj) => Ok(Collection::Object(GenericObjectView::new(obj))),
            other => Err(Error::unsupported("browsing", other.type_name())),
        }
    }

    pub fn object(obj: ObjectRef) -> Self {
        Collection::Object(GenericObjectView::new(obj))
    }

    pub fn to_value(&self) -> Value {
        match self {
            Collection::List(items) => Value::List(items.clone()),
            Collection::Tuple(items) => Value::Tuple(items.clone()),
            Collection::Set(items) => Value::Set(items.clone()),
            Collection::Dict(mapping) => Value::Dict(mapping.clone()),
            Collection::Object(view) => Value::Object(view.object().clone()),
        }
    }

    pub fn kind(&self) -> CollectionKind {
        match self {
            Collection::List(_) | Collection::Tuple(_) => CollectionKind::Sequence,
            Collection::Set(_) => CollectionKind::Set,
            Collection::Dict(_) => CollectionKind::Mapping,
            Collection::Object(_) => CollectionKind::Object,
        }
    }

    pub fn type_name(&self) -> String {
        match self {
            Collection::List(_) => "list".to_string(),
            Collection::Tuple(_) => "tuple".to_string(),
            Collection::Set(_) => "set".to_string(),
            Collection::Dict(_) => "dict".to_string(),
            Collection::Object(view) => view.type_name(),
        }
    }

    /// Tuples and sets can be browsed but not edited
    pub fn is_read_only(&self) -> bool {
        matches!(self, Collection::Tuple(_) | Collection::Set(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Collection::List(items) | Collection::Tuple(items) | Collection::Set(items) => items.len(),
            Collection::Dict(mapping) => mapping.len(),
            Collection::Object(view) => view.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Initial key order
    pub fn keys(&self) -> Vec<Key> {
        match self {
            Collection::List(items) | Collection::Tuple(items) | Collection::Set(items) => {
                (0..items.len()).map(Key::from).collect()
            }
            Collection::Dict(mapping) => mapping.keys().cloned().collect(),
            Collection::Object(view) => {
                let mut names = view.keys();
                names.sort_by(|a, b| natural_cmp(a, b));
                names.into_iter().map(Key::Str).collect()
            }
        }
    }

    pub fn get(&self, key: &Key) -> Result<Value> {
        match self {
            Collection::List(items) | Collection::Tuple(items) | Collection::Set(items) => key
                .as_index()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| Error::KeyNotFound { key: key.clone() }),
            Collection::Dict(mapping) => mapping
                .get(key)
                .cloned()
                .ok_or_else(|| Error::KeyNotFound { key: key.clone() }),
            Collection::Object(view) => {
                let name = key.as_str().ok_or_else(|| Error::KeyNotFound { key: key.clone() })?;
                view.get(name).map_err(|e| Error::ValueInaccessible {
                    key: key.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    pub fn set(&mut self, key: &Key, value: Value) -> Result<()> {
        match self {
            Collection::List(items) => {
                let slot = key
                    .as_index()
                    .and_then(|i| items.get_mut(i))
                    .ok_or_else(|| Error::KeyNotFound { key: key.clone() })?;
                *slot = value;
                Ok(())
            }
            Collection::Dict(mapping) => {
                mapping.insert(key.clone(), value);
                Ok(())
            }
            Collection::Object(view) => {
                let name = key.as_str().ok_or_else(|| Error::KeyNotFound { key: key.clone() })?;
                view.try_set(name, value)
            }
            Collection::Tuple(_) | Collection::Set(_) => Err(Error::ReadOnly { what: self.type_name() }),
        }
    }

    /// Splices a value into a list at `position`
    pub fn insert_at(&mut self, position: usize, value: Value) -> Result<()> {
        match self {
            Collection::List(items) => {
                if position > items.len() {
                    return Err(Error::IndexOutOfRange {
                        index: position,
                        len: items.len(),
                    });
                }
                items.insert(position, value);
                Ok(())
            }
            Collection::Tuple(_) => Err(Error::ReadOnly { what: self.type_name() }),
            other => Err(Error::unsupported("positional insert", other.kind())),
        }
    }

    /// Removes several entries; the result does not depend on key order
    pub fn remove(&mut self, keys: &[Key]) -> Result<()> {
        match self {
            Collection::List(items) => {
                let mut positions = Vec::with_capacity(keys.len());
                for key in keys {
                    match key.as_index() {
                        Some(i) if i < items.len() => positions.push(i),
                        _ => return Err(Error::KeyNotFound { key: key.clone() }),
                    }
                }
                positions.sort_unstable_by(|a, b| b.cmp(a));
                positions.dedup();
                for i in positions {
                    items.remove(i);
                }
                Ok(())
            }
            Collection::Dict(mapping) => {
                if let Some(missing) = keys.iter().find(|k| !mapping.contains_key(k)) {
                    return Err(Error::KeyNotFound { key: missing.clone() });
                }
                for key in keys {
                    mapping.remove(key);
                }
                Ok(())
            }
            Collection::Tuple(_) | Collection::Set(_) => Err(Error::ReadOnly { what: self.type_name() }),
            Collection::Object(_) => Err(Error::unsupported("remove", CollectionKind::Object)),
        }
    }

    /// Copies `source` to `target`; lists append and return the new position
    pub fn copy(&mut self, source: &Key, target: &Key) -> Result<Key> {
        let value = self.get(source)?;
        match self {
            Collection::List(items) => {
                items.push(value);
                Ok(Key::from(items.len() - 1))
            }
            Collection::Dict(mapping) => {
                mapping.insert(target.clone(), deep_copy(&value));
                Ok(target.clone())
            }
            Collection::Tuple(_) | Collection::Set(_) => Err(Error::ReadOnly { what: self.type_name() }),
            Collection::Object(_) => Err(Error::unsupported("copy", CollectionKind::Object)),
        }
    }
}

/// Clone that also detaches live objects where they support it
pub(crate) fn deep_copy(value: &Value) -> Value {
    match value {
        Value::Object(obj) => obj.duplicate().map(Value::Object).unwrap_or_else(|| value.clone()),
        Value::List(items) => Value::List(items.iter().map(deep_copy).collect()),
        Value::Tuple(items) => Value::Tuple(items.iter().map(deep_copy).collect()),
        Value::Set(items) => Value::Set(items.iter().map(deep_copy).collect()),
        Value::Dict(mapping) => Value::Dict(mapping.iter().map(|(k, v)| (k.clone(), deep_copy(v))).collect()),
        other => other.clone(),
    }
}
