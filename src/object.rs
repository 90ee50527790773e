//! Generic objects and their attribute view.
//!
//! Anything that is not a sequence, mapping or set is shown through its
//! attributes. Types opt in by implementing [`Introspect`]; the adapter only
//! ever talks to them through [`GenericObjectView`], which fixes the error
//! handling contract in one place.

use crate::error::{Error, Result};
use crate::value::{Key, Value};
use hashlink::LinkedHashMap;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Failure classes reported by attribute access
#[derive(Debug, Clone, PartialEq)]
pub enum AttrError {
    /// Attribute missing or not writable
    Attribute(String),
    /// The object does not implement this access
    NotImplemented,
    /// Incompatible type for this attribute
    Type(String),
    /// Incompatible value for this attribute
    Value(String),
    /// Anything else; always propagated
    Other(String),
}

impl AttrError {
    /// Errors the attribute view absorbs instead of reporting
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AttrError::Other(_))
    }

    fn message(&self) -> String {
        match self {
            AttrError::Attribute(m) | AttrError::Type(m) | AttrError::Value(m) | AttrError::Other(m) => {
                m.clone()
            }
            AttrError::NotImplemented => "not implemented".to_string(),
        }
    }
}

/// Reflection surface of an arbitrary object
pub trait Introspect {
    fn type_name(&self) -> String;

    /// Discoverable attribute names
    fn attributes(&self) -> Vec<String>;

    fn get_attribute(&self, name: &str) -> std::result::Result<Value, AttrError>;

    fn set_attribute(&mut self, name: &str, value: Value) -> std::result::Result<(), AttrError>;

    /// Independent deep copy, if the object supports one
    fn duplicate(&self) -> Option<ObjectRef> {
        None
    }
}

/// Shared handle to a live object.
///
/// Cloning shares the object; equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<dyn Introspect>>);

impl ObjectRef {
    pub fn new<T: Introspect + 'static>(object: T) -> Self {
        ObjectRef(Rc::new(RefCell::new(object)))
    }

    pub fn type_name(&self) -> String {
        self.0.borrow().type_name()
    }

    pub fn attributes(&self) -> Vec<String> {
        self.0.borrow().attributes()
    }

    pub fn get_attribute(&self, name: &str) -> std::result::Result<Value, AttrError> {
        self.0.borrow().get_attribute(name)
    }

    pub fn set_attribute(&self, name: &str, value: Value) -> std::result::Result<(), AttrError> {
        self.0.borrow_mut().set_attribute(name, value)
    }

    pub fn duplicate(&self) -> Option<ObjectRef> {
        self.0.borrow().duplicate()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(object) => write!(f, "<{} object>", object.type_name()),
            Err(_) => write!(f, "<object (borrowed)>"),
        }
    }
}

/// Mapping-shaped view over one object's attributes
#[derive(Debug, Clone)]
pub struct GenericObjectView {
    object: ObjectRef,
}

impl GenericObjectView {
    pub fn new(object: ObjectRef) -> Self {
        GenericObjectView { object }
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn type_name(&self) -> String {
        self.object.type_name()
    }

    pub fn keys(&self) -> Vec<String> {
        self.object.attributes()
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads an attribute; recoverable failures yield `Value::Null`
    pub fn get(&self, key: &str) -> Result<Value> {
        match self.object.get_attribute(key) {
            Ok(value) => Ok(value),
            Err(e) if e.is_recoverable() => {
                log::debug!("attribute '{}' unreadable ({:?}), showing None", key, e);
                Ok(Value::Null)
            }
            Err(e) => Err(Error::Attribute {
                name: key.to_string(),
                message: e.message(),
            }),
        }
    }

    /// Writes an attribute; recoverable failures are dropped silently
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        match self.try_set(key, value) {
            Err(Error::ValueNotSettable { reason, .. }) => {
                log::debug!("attribute '{}' not settable ({}), ignoring", key, reason);
                Ok(())
            }
            other => other,
        }
    }

    /// Like `set`, but reports recoverable refusals as `ValueNotSettable`
    pub fn try_set(&self, key: &str, value: Value) -> Result<()> {
        match self.object.set_attribute(key, value) {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable() => Err(Error::ValueNotSettable {
                key: Key::from(key),
                reason: e.message(),
            }),
            Err(e) => Err(Error::Attribute {
                name: key.to_string(),
                message: e.message(),
            }),
        }
    }
}

/// Plain struct-like object with named fields.
///
/// Fields can be marked read-only, and individual fields can be made to fail
/// on access to model objects with broken properties.
#[derive(Debug, Clone)]
pub struct Record {
    type_name: String,
    fields: LinkedHashMap<String, Value>,
    read_only: HashSet<String>,
    broken: LinkedHashMap<String, AttrError>,
    copyable: bool,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Record {
            type_name: type_name.into(),
            fields: LinkedHashMap::new(),
            read_only: HashSet::new(),
            broken: LinkedHashMap::new(),
            copyable: true,
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn read_only_field(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        self.read_only.insert(name.clone());
        self.fields.insert(name, value);
        self
    }

    /// Attribute that is listed but fails with `error` on every access
    pub fn broken_field(mut self, name: impl Into<String>, error: AttrError) -> Self {
        self.broken.insert(name.into(), error);
        self
    }

    /// Objects that refuse to be copied force edit sessions read-only
    pub fn not_copyable(mut self) -> Self {
        self.copyable = false;
        self
    }

    pub fn into_object(self) -> ObjectRef {
        ObjectRef::new(self)
    }
}

impl Introspect for Record {
    fn type_name(&self) -> String {
        self.type_name.clone()
    }

    fn attributes(&self) -> Vec<String> {
        self.fields.keys().chain(self.broken.keys()).cloned().collect()
    }

    fn get_attribute(&self, name: &str) -> std::result::Result<Value, AttrError> {
        if let Some(error) = self.broken.get(name) {
            return Err(error.clone());
        }
        self.fields
            .get(name)
            .cloned()
            .ok_or_else(|| AttrError::Attribute(format!("'{}' object has no attribute '{}'", self.type_name, name)))
    }

    fn set_attribute(&mut self, name: &str, value: Value) -> std::result::Result<(), AttrError> {
        if let Some(error) = self.broken.get(name) {
            return Err(error.clone());
        }
        if self.read_only.contains(name) {
            return Err(AttrError::Attribute(format!("can't set attribute '{}'", name)));
        }
        match self.fields.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(AttrError::Attribute(format!(
                "'{}' object has no attribute '{}'",
                self.type_name, name
            ))),
        }
    }

    fn duplicate(&self) -> Option<ObjectRef> {
        if self.copyable {
            Some(ObjectRef::new(self.clone()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ObjectRef {
        Record::new("Foobar")
            .field("text", Value::str("hello"))
            .read_only_field("version", Value::Int(3))
            .broken_field("lazy", AttrError::NotImplemented)
            .broken_field("explodes", AttrError::Other("boom".to_string()))
            .into_object()
    }

    #[test]
    fn test_keys_list_all_attributes() {
        let view = GenericObjectView::new(sample());
        assert_eq!(view.keys(), vec!["text", "version", "lazy", "explodes"]);
        assert_eq!(view.type_name(), "Foobar");
    }

    #[test]
    fn test_get_absorbs_recoverable_errors() {
        let view = GenericObjectView::new(sample());
        assert_eq!(view.get("text").unwrap(), Value::str("hello"));
        assert_eq!(view.get("lazy").unwrap(), Value::Null);
        assert_eq!(view.get("missing").unwrap(), Value::Null);
        assert!(matches!(view.get("explodes"), Err(Error::Attribute { .. })));
    }

    #[test]
    fn test_set_discards_recoverable_errors() {
        let view = GenericObjectView::new(sample());
        view.set("text", Value::str("bye")).unwrap();
        assert_eq!(view.get("text").unwrap(), Value::str("bye"));

        // Read-only attribute: silently unchanged
        view.set("version", Value::Int(4)).unwrap();
        assert_eq!(view.get("version").unwrap(), Value::Int(3));

        assert!(view.set("explodes", Value::Null).is_err());
    }

    #[test]
    fn test_try_set_reports_refusals() {
        let view = GenericObjectView::new(sample());
        assert!(matches!(
            view.try_set("version", Value::Int(4)),
            Err(Error::ValueNotSettable { key, .. }) if key == Key::from("version")
        ));
        assert!(matches!(view.try_set("explodes", Value::Null), Err(Error::Attribute { .. })));
        view.try_set("text", Value::str("bye")).unwrap();
    }

    #[test]
    fn test_object_identity() {
        let a = sample();
        let b = a.clone();
        assert_eq!(a, b);
        let c = a.duplicate().unwrap();
        assert_ne!(a, c);
        assert_eq!(format!("{:?}", a), "<Foobar object>");
    }
}
