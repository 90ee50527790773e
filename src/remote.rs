//! Remote value provider.
//!
//! The collection lives in another execution context (a kernel, a worker
//! process) and is only reachable by name through a request/response
//! [`Channel`]. Every provider call is one synchronous round trip. A name the
//! owning side does not know comes back as [`Error::KeyNotFound`]; transport
//! and context failures surface as [`Error::RemoteUnavailable`] and are never
//! retried here.
//!
//! [`Namespace`] is the owning side of the protocol and [`Loopback`] wires it
//! to a provider in-process, going through the JSON wire format so both ends
//! are exercised exactly as they would be over a real transport.

use crate::collection::{deep_copy, CollectionKind};
use crate::display::try_to_eval;
use crate::error::{Error, Result};
use crate::messages::{DescribedEntry, Request, Response};
use crate::provider::{Metadata, ValueProvider, ValueTraits};
use crate::value::{Key, Mapping, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Request/response transport to the owning context
pub trait Channel {
    fn round_trip(&mut self, request: Request) -> Result<Response>;
}

/// Provider that addresses values by variable name
pub struct RemoteProvider<C: Channel> {
    channel: RefCell<C>,
    /// Metadata from the latest `describe` calls; dropped on every mutation
    cache: RefCell<HashMap<Key, Metadata>>,
    read_only: bool,
}

impl<C: Channel> RemoteProvider<C> {
    pub fn new(channel: C) -> Self {
        RemoteProvider {
            channel: RefCell::new(channel),
            cache: RefCell::new(HashMap::new()),
            read_only: false,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    fn call(&self, request: Request) -> Result<Response> {
        let response = self.channel.borrow_mut().round_trip(request)?;
        match response {
            Response::Error { message } => Err(Error::remote(message)),
            Response::NotFound { name } => Err(Error::KeyNotFound { key: Key::Str(name) }),
            other => Ok(other),
        }
    }

    fn expect_done(&self, request: Request) -> Result<()> {
        self.cache.borrow_mut().clear();
        match self.call(request)? {
            Response::Done => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            Err(Error::ReadOnly {
                what: "remote namespace".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Cached traits for one variable, fetched on a miss
    pub fn traits(&self, key: &Key) -> Result<ValueTraits> {
        if let Some(traits) = self.cache.borrow().get(key).and_then(|m| m.traits.clone()) {
            return Ok(traits);
        }
        self.describe(std::slice::from_ref(key))?
            .remove(key)
            .and_then(|m| m.traits)
            .ok_or_else(|| Error::KeyNotFound { key: key.clone() })
    }

    pub fn is_list(&self, key: &Key) -> Result<bool> {
        Ok(self.traits(key)?.is_list)
    }

    pub fn is_set(&self, key: &Key) -> Result<bool> {
        Ok(self.traits(key)?.is_set)
    }

    pub fn is_dict(&self, key: &Key) -> Result<bool> {
        Ok(self.traits(key)?.is_dict)
    }

    pub fn is_array(&self, key: &Key) -> Result<bool> {
        Ok(self.traits(key)?.is_array)
    }

    pub fn is_image(&self, key: &Key) -> Result<bool> {
        Ok(self.traits(key)?.is_image)
    }

    pub fn is_data_frame(&self, key: &Key) -> Result<bool> {
        Ok(self.traits(key)?.is_data_frame)
    }

    pub fn is_series(&self, key: &Key) -> Result<bool> {
        Ok(self.traits(key)?.is_series)
    }

    pub fn get_len(&self, key: &Key) -> Result<Option<usize>> {
        Ok(self.traits(key)?.len)
    }

    pub fn get_array_shape(&self, key: &Key) -> Result<Option<Vec<usize>>> {
        Ok(self.traits(key)?.shape)
    }

    pub fn get_array_ndim(&self, key: &Key) -> Result<Option<usize>> {
        Ok(self.traits(key)?.ndim)
    }

    /// Plots a variable with the named plotting function
    pub fn plot(&mut self, key: &Key, funcname: &str) -> Result<()> {
        let name = wire_name("plot", key)?;
        self.execute(&format!("plt.figure(); plt.{}({}); plt.show()", funcname, name))
    }

    pub fn imshow(&mut self, key: &Key) -> Result<()> {
        let name = wire_name("imshow", key)?;
        self.execute(&format!("plt.figure(); plt.imshow({}); plt.show()", name))
    }

    pub fn show_image(&mut self, key: &Key) -> Result<()> {
        let name = wire_name("show_image", key)?;
        self.execute(&format!("{}.show()", name))
    }
}

impl<C: Channel> ValueProvider for RemoteProvider<C> {
    fn kind(&self) -> CollectionKind {
        CollectionKind::Mapping
    }

    fn type_name(&self) -> String {
        "dict".to_string()
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn is_remote(&self) -> bool {
        true
    }

    fn keys(&self) -> Result<Vec<Key>> {
        match self.call(Request::ListNames)? {
            Response::Names { names } => Ok(names.into_iter().map(Key::Str).collect()),
            other => Err(unexpected(&other)),
        }
    }

    fn get_value(&self, key: &Key) -> Result<Value> {
        let name = wire_name("get_value", key)?;
        match self.call(Request::GetValue { name })? {
            Response::Value { value } => Ok(value),
            other => Err(unexpected(&other)),
        }
    }

    fn describe(&self, keys: &[Key]) -> Result<HashMap<Key, Metadata>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let names = keys
            .iter()
            .map(|k| wire_name("describe", k))
            .collect::<Result<Vec<_>>>()?;
        let entries = match self.call(Request::Describe { names })? {
            Response::Described { entries } => entries,
            other => return Err(unexpected(&other)),
        };

        let mut out: HashMap<Key, Metadata> = entries
            .into_iter()
            .map(|entry| (Key::Str(entry.name), entry.metadata))
            .collect();
        self.cache.borrow_mut().extend(out.iter().map(|(k, m)| (k.clone(), m.clone())));

        // Variables deleted behind our back still need a row record
        for key in keys {
            out.entry(key.clone()).or_insert_with(|| {
                log::warn!("describe: {} vanished from the remote namespace", key);
                Metadata::placeholder()
            });
        }
        Ok(out)
    }

    fn set_value(&mut self, key: &Key, value: Value) -> Result<()> {
        self.check_writable()?;
        let name = wire_name("set_value", key)?;
        self.expect_done(Request::SetValue { name, value })
    }

    fn new_value(&mut self, key: &Key, value: Value) -> Result<()> {
        self.set_value(key, value)
    }

    fn remove_values(&mut self, keys: &[Key]) -> Result<()> {
        self.check_writable()?;
        let names = keys
            .iter()
            .map(|k| wire_name("remove_values", k))
            .collect::<Result<Vec<_>>>()?;
        self.expect_done(Request::RemoveValues { names })
    }

    fn copy_value(&mut self, source: &Key, target: &Key) -> Result<Key> {
        self.check_writable()?;
        let request = Request::CopyValue {
            source: wire_name("copy_value", source)?,
            target: wire_name("copy_value", target)?,
        };
        self.expect_done(request)?;
        Ok(target.clone())
    }

    fn execute(&mut self, command: &str) -> Result<()> {
        self.expect_done(Request::Execute {
            command: command.to_string(),
        })
    }

    fn snapshot(&self) -> Result<Value> {
        let mut mapping = Mapping::new();
        for key in self.keys()? {
            let value = self.get_value(&key)?;
            mapping.insert(key, value);
        }
        Ok(Value::Dict(mapping))
    }
}

fn wire_name(operation: &'static str, key: &Key) -> Result<String> {
    key.as_str().map(str::to_string).ok_or_else(|| Error::InvalidKeyType {
        operation,
        key: key.clone(),
    })
}

fn unexpected(response: &Response) -> Error {
    Error::remote(format!("unexpected response: {:?}", response))
}

/// The owning side: a namespace of named values answering requests
#[derive(Debug, Default)]
pub struct Namespace {
    values: Mapping,
    minmax: bool,
    executed: Vec<String>,
}

impl Namespace {
    pub fn new(values: Mapping) -> Self {
        Namespace {
            values,
            minmax: false,
            executed: Vec::new(),
        }
    }

    /// Render array views with min/max
    pub fn with_minmax(mut self, minmax: bool) -> Self {
        self.minmax = minmax;
        self
    }

    pub fn values(&self) -> &Mapping {
        &self.values
    }

    /// Mutates the namespace directly, as background execution would
    pub fn values_mut(&mut self) -> &mut Mapping {
        &mut self.values
    }

    /// Commands received through `Execute`, oldest first
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::ListNames => Response::Names {
                names: self.values.keys().filter_map(Key::as_str).map(str::to_string).collect(),
            },
            Request::GetValue { name } => match self.values.get(&Key::Str(name.clone())) {
                Some(value) => Response::Value { value: value.clone() },
                None => Response::NotFound { name },
            },
            Request::SetValue { name, value } => {
                self.values.insert(Key::Str(name), value);
                Response::Done
            }
            Request::RemoveValues { names } => {
                for name in names {
                    self.values.remove(&Key::Str(name));
                }
                Response::Done
            }
            Request::CopyValue { source, target } => match self.values.get(&Key::Str(source.clone())) {
                Some(value) => {
                    let copy = deep_copy(value);
                    self.values.insert(Key::Str(target), copy);
                    Response::Done
                }
                None => Response::NotFound { name: source },
            },
            Request::Execute { command } => {
                self.run(&command);
                self.executed.push(command);
                Response::Done
            }
            Request::Describe { names } => Response::Described {
                entries: names
                    .into_iter()
                    .filter_map(|name| {
                        let value = self.values.get(&Key::Str(name.clone()))?;
                        Some(DescribedEntry {
                            metadata: Metadata::with_traits(value, self.minmax),
                            name,
                        })
                    })
                    .collect(),
            },
        }
    }

    /// Understands `name = literal` and `del name`; anything else is only
    /// recorded
    fn run(&mut self, command: &str) {
        let command = command.trim();
        if let Some(name) = command.strip_prefix("del ") {
            self.values.remove(&Key::from(name.trim()));
        } else if let Some((name, literal)) = command.split_once('=') {
            let name = name.trim();
            if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                self.values.insert(Key::from(name), try_to_eval(literal.trim()));
            }
        }
    }
}

/// In-process channel that round-trips every message through JSON.
///
/// Clones share the namespace and counters, so a test can keep a handle
/// after moving the channel into a provider.
#[derive(Clone)]
pub struct Loopback {
    namespace: Rc<RefCell<Namespace>>,
    round_trips: Rc<Cell<usize>>,
    available: Rc<Cell<bool>>,
}

impl Loopback {
    pub fn new(namespace: Namespace) -> Self {
        Loopback {
            namespace: Rc::new(RefCell::new(namespace)),
            round_trips: Rc::new(Cell::new(0)),
            available: Rc::new(Cell::new(true)),
        }
    }

    pub fn namespace(&self) -> Rc<RefCell<Namespace>> {
        Rc::clone(&self.namespace)
    }

    /// Completed and attempted round trips so far
    pub fn round_trips(&self) -> usize {
        self.round_trips.get()
    }

    /// Simulates the owning context going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }
}

impl Channel for Loopback {
    fn round_trip(&mut self, request: Request) -> Result<Response> {
        self.round_trips.set(self.round_trips.get() + 1);
        if !self.available.get() {
            return Err(Error::remote("kernel is not responding"));
        }

        let wire = serde_json::to_string(&request).map_err(|e| Error::remote(format!("encode failed: {}", e)))?;
        log::debug!("-> {}", wire);
        let request: Request = serde_json::from_str(&wire)?;

        let response = self.namespace.borrow_mut().handle(request);
        let wire = match serde_json::to_string(&response) {
            Ok(wire) => wire,
            Err(e) => serde_json::to_string(&Response::error(format!("value cannot be sent: {}", e)))?,
        };
        log::debug!("<- {}", wire);
        Ok(serde_json::from_str(&wire)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Record;
    use crate::value::NdArray;

    fn namespace() -> Namespace {
        Namespace::new(
            [
                (Key::from("a"), Value::Int(1)),
                (Key::from("arr"), Value::Array(NdArray::new(vec![3], vec![1.0, 2.0, 3.0]))),
                (Key::from("items"), Value::list(vec![Value::Int(1), Value::Int(2)])),
            ]
            .into_iter()
            .collect(),
        )
    }

    #[test]
    fn test_describe_is_one_round_trip() {
        let mut values = Mapping::new();
        for i in 0..50 {
            values.insert(Key::Str(format!("v{}", i)), Value::Int(i));
        }
        let channel = Loopback::new(Namespace::new(values));
        let provider = RemoteProvider::new(channel.clone());
        let keys = provider.keys().unwrap();
        assert_eq!(channel.round_trips(), 1);

        let meta = provider.describe(&keys).unwrap();
        assert_eq!(meta.len(), 50);
        assert_eq!(channel.round_trips(), 2);
    }

    #[test]
    fn test_missing_names_are_not_outages() {
        let channel = Loopback::new(namespace());
        let mut provider = RemoteProvider::new(channel.clone());

        let err = provider.get_value(&Key::from("gone")).unwrap_err();
        assert!(matches!(err, Error::KeyNotFound { key } if key == Key::from("gone")));
        let err = provider.copy_value(&Key::from("gone"), &Key::from("b")).unwrap_err();
        assert!(!err.is_remote_unavailable());
    }

    #[test]
    fn test_traits_are_served_from_cache() {
        let channel = Loopback::new(namespace());
        let provider = RemoteProvider::new(channel.clone());
        let keys = provider.keys().unwrap();
        provider.describe(&keys).unwrap();
        let before = channel.round_trips();

        assert!(provider.is_array(&Key::from("arr")).unwrap());
        assert_eq!(provider.get_array_ndim(&Key::from("arr")).unwrap(), Some(1));
        assert!(provider.is_list(&Key::from("items")).unwrap());
        assert_eq!(provider.get_len(&Key::from("items")).unwrap(), Some(2));
        assert_eq!(channel.round_trips(), before);
    }

    #[test]
    fn test_mutations_reach_the_namespace() {
        let channel = Loopback::new(namespace());
        let mut provider = RemoteProvider::new(channel.clone());
        provider.set_value(&Key::from("b"), Value::str("x")).unwrap();
        provider.copy_value(&Key::from("a"), &Key::from("a2")).unwrap();
        provider.remove_values(&[Key::from("a")]).unwrap();

        let ns = channel.namespace();
        let ns = ns.borrow();
        assert_eq!(ns.values().get(&Key::from("b")), Some(&Value::str("x")));
        assert_eq!(ns.values().get(&Key::from("a2")), Some(&Value::Int(1)));
        assert!(!ns.values().contains_key(&Key::from("a")));
    }

    #[test]
    fn test_unavailable_channel_surfaces_error() {
        let channel = Loopback::new(namespace());
        let provider = RemoteProvider::new(channel.clone());
        channel.set_available(false);
        let err = provider.keys().unwrap_err();
        assert!(err.is_remote_unavailable());
    }

    #[test]
    fn test_missing_name_is_remote_error() {
        let provider = RemoteProvider::new(Loopback::new(namespace()));
        let err = provider.get_value(&Key::from("nope")).unwrap_err();
        assert!(err.is_remote_unavailable());
        assert!(matches!(
            provider.get_value(&Key::Int(0)),
            Err(Error::InvalidKeyType { .. })
        ));
    }

    #[test]
    fn test_execute_commands() {
        let channel = Loopback::new(namespace());
        let mut provider = RemoteProvider::new(channel.clone());
        provider.execute("z = [1, 2]").unwrap();
        provider.execute("del a").unwrap();
        provider.imshow(&Key::from("arr")).unwrap();

        let ns = channel.namespace();
        let ns = ns.borrow();
        assert_eq!(ns.values().get(&Key::from("z")), Some(&Value::list(vec![Value::Int(1), Value::Int(2)])));
        assert!(!ns.values().contains_key(&Key::from("a")));
        assert_eq!(ns.executed().len(), 3);
        assert_eq!(ns.executed()[2], "plt.figure(); plt.imshow(arr); plt.show()");
    }

    #[test]
    fn test_live_objects_cannot_cross_the_wire() {
        let mut ns = namespace();
        ns.values_mut()
            .insert(Key::from("obj"), Value::Object(Record::new("Foobar").into_object()));
        let provider = RemoteProvider::new(Loopback::new(ns));

        let meta = provider.describe(&[Key::from("obj")]).unwrap();
        assert_eq!(meta[&Key::from("obj")].type_name, "Foobar");
        assert!(provider.get_value(&Key::from("obj")).unwrap_err().is_remote_unavailable());
    }
}
