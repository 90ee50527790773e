/// Value model for collview
///
/// `Value` is the dynamically typed payload stored in collections, and `Key`
/// is the hashable subset used to address mapping entries. Both mirror the
/// kinds of data a variable explorer has to cope with: scalars, nested
/// containers, n-dimensional arrays, data frames, images and opaque objects
/// reachable only through introspection.
///
/// # Ordering
///
/// Values are only partially ordered. `try_cmp` follows the usual dynamic
/// language rules (numbers compare across int/float/bool, strings with
/// strings, sequences lexicographically) and reports `Unorderable` for
/// everything else instead of panicking.

use crate::classify::SpecializedKind;
use crate::object::ObjectRef;
use chrono::{NaiveDate, NaiveDateTime};
use hashlink::LinkedHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Marker returned when two values have no defined relative order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unorderable;

/// Identifier of one collection entry.
///
/// Sequences and sets use `Int` positions, generic objects use `Str`
/// attribute names, and mappings may use any variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Key {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Vec<Key>),
}

impl Key {
    pub fn str(name: impl Into<String>) -> Self {
        Key::Str(name.into())
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, Key::Str(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Position for sequence-like collections
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Int(i) if *i >= 0 => Some(*i as usize),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Key::None => Value::Null,
            Key::Bool(b) => Value::Bool(*b),
            Key::Int(i) => Value::Int(*i),
            Key::Float(f) => Value::Float(*f),
            Key::Str(s) => Value::Str(s.clone()),
            Key::Tuple(items) => Value::Tuple(items.iter().map(Key::to_value).collect()),
        }
    }

    /// Converts a hashable value into a key; containers other than tuples
    /// of hashables return None
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Null => Some(Key::None),
            Value::Bool(b) => Some(Key::Bool(*b)),
            Value::Int(i) => Some(Key::Int(*i)),
            Value::Float(f) => Some(Key::Float(*f)),
            Value::Str(s) => Some(Key::Str(s.clone())),
            Value::Tuple(items) => items
                .iter()
                .map(Key::from_value)
                .collect::<Option<Vec<_>>>()
                .map(Key::Tuple),
            _ => None,
        }
    }

    /// Quoted form used inside container displays
    pub fn repr(&self) -> String {
        match self {
            Key::Str(s) => format!("'{}'", s),
            Key::Tuple(items) => tuple_repr(items.iter().map(Key::repr)),
            other => other.to_string(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Key::None => "NoneType",
            Key::Bool(_) => "bool",
            Key::Int(_) => "int",
            Key::Float(_) => "float",
            Key::Str(_) => "str",
            Key::Tuple(_) => "tuple",
        }
    }

    /// Ordinal comparison; numbers compare across variants
    pub fn try_cmp(&self, other: &Key) -> Result<Ordering, Unorderable> {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => return Ok(compare_f64(a, b)),
            (Some(_), None) | (None, Some(_)) => return Err(Unorderable),
            (None, None) => {}
        }
        match (self, other) {
            (Key::Str(a), Key::Str(b)) => Ok(a.cmp(b)),
            (Key::Tuple(a), Key::Tuple(b)) => lexicographic(a, b, Key::try_cmp),
            _ => Err(Unorderable),
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            Key::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Key::Int(i) => Some(*i as f64),
            Key::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::None, Key::None) => true,
            (Key::Bool(a), Key::Bool(b)) => a == b,
            (Key::Int(a), Key::Int(b)) => a == b,
            (Key::Float(a), Key::Float(b)) => float_bits(*a) == float_bits(*b),
            (Key::Str(a), Key::Str(b)) => a == b,
            (Key::Tuple(a), Key::Tuple(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Key::None => {}
            Key::Bool(b) => b.hash(state),
            Key::Int(i) => i.hash(state),
            Key::Float(f) => float_bits(*f).hash(state),
            Key::Str(s) => s.hash(state),
            Key::Tuple(items) => items.hash(state),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::None => write!(f, "None"),
            Key::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Key::Int(i) => write!(f, "{}", i),
            Key::Float(v) => write!(f, "{}", format_float(*v)),
            Key::Str(s) => write!(f, "{}", s),
            Key::Tuple(items) => write!(f, "{}", tuple_repr(items.iter().map(Key::repr))),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Int(i as i64)
    }
}

/// Insertion-ordered dictionary
#[derive(Clone, Default)]
pub struct Mapping {
    entries: LinkedHashMap<Key, Value>,
}

impl Mapping {
    pub fn new() -> Self {
        Mapping {
            entries: LinkedHashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    /// Assigns a value; existing keys keep their position, new keys are
    /// appended.
    pub fn insert(&mut self, key: Key, value: Value) -> Option<Value> {
        if let Some(slot) = self.entries.get_mut(&key) {
            return Some(std::mem::replace(slot, value));
        }
        self.entries.insert(key, value);
        None
    }

    pub fn remove(&mut self, key: &Key) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter()
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl FromIterator<(Key, Value)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (Key, Value)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}

// Serialized as a list of pairs so non-string keys survive JSON
impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs = Vec::<(Key, Value)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

/// Dense n-dimensional numeric array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdArray {
    pub dtype: String,
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl NdArray {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Self {
        NdArray {
            dtype: "float64".to_string(),
            shape,
            data,
        }
    }

    pub fn with_dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = dtype.into();
        self
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn min(&self) -> Option<f64> {
        self.data.iter().copied().filter(|v| !v.is_nan()).reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.data.iter().copied().filter(|v| !v.is_nan()).reduce(f64::max)
    }
}

/// Tabular value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameKind {
    DataFrame,
    Series,
    Index,
}

/// Shape-only description of a table-like value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub kind: FrameKind,
    pub columns: Vec<String>,
    pub rows: usize,
}

/// Image header (mode and dimensions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub mode: String,
    pub width: u32,
    pub height: u32,
}

/// Dynamically typed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex { re: f64, im: f64 },
    Str(String),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    Dict(Mapping),
    Array(NdArray),
    Frame(Frame),
    Image(ImageInfo),
    /// Live objects never cross the wire
    #[serde(skip)]
    Object(ObjectRef),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn dict<K: Into<Key>, I: IntoIterator<Item = (K, Value)>>(entries: I) -> Self {
        Value::Dict(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Bool(_) | Value::Int(_) | Value::Float(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Type name as the owning runtime would report it
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "NoneType".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Complex { .. } => "complex".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::Bytes(_) => "bytes".to_string(),
            Value::DateTime(_) => "datetime".to_string(),
            Value::Date(_) => "date".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Tuple(_) => "tuple".to_string(),
            Value::Set(_) => "set".to_string(),
            Value::Dict(_) => "dict".to_string(),
            Value::Array(_) => "NDArray".to_string(),
            Value::Frame(frame) => match frame.kind {
                FrameKind::DataFrame => "DataFrame".to_string(),
                FrameKind::Series => "Series".to_string(),
                FrameKind::Index => "Index".to_string(),
            },
            Value::Image(_) => "PIL.Image.Image".to_string(),
            Value::Object(obj) => obj.type_name(),
        }
    }

    /// Type string shown in the Type column
    pub fn readable_type(&self) -> String {
        match self {
            Value::Array(array) => format!("Array of {}", array.dtype),
            Value::Image(_) => "Image".to_string(),
            other => other.type_name(),
        }
    }

    pub fn specialized_kind(&self) -> SpecializedKind {
        match self {
            Value::Array(_) => SpecializedKind::Array,
            _ => SpecializedKind::Unknown,
        }
    }

    /// Element count for containers and strings
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.chars().count()),
            Value::Bytes(b) => Some(b.len()),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => Some(items.len()),
            Value::Dict(mapping) => Some(mapping.len()),
            Value::Array(array) => array.shape.first().copied(),
            Value::Frame(frame) => Some(frame.rows),
            _ => None,
        }
    }

    pub fn shape(&self) -> Option<Vec<usize>> {
        match self {
            Value::Array(array) => Some(array.shape.clone()),
            Value::Frame(frame) => Some(match frame.kind {
                FrameKind::DataFrame => vec![frame.rows, frame.columns.len()],
                FrameKind::Series | FrameKind::Index => vec![frame.rows],
            }),
            Value::Image(image) => Some(vec![image.width as usize, image.height as usize]),
            _ => None,
        }
    }

    /// Size descriptor shown in the Size column
    pub fn size(&self) -> String {
        if let Some(shape) = self.shape() {
            return shape_repr(&shape);
        }
        self.len().unwrap_or(1).to_string()
    }

    /// Ordinal comparison
    pub fn try_cmp(&self, other: &Value) -> Result<Ordering, Unorderable> {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => return Ok(compare_f64(a, b)),
            (Some(_), None) | (None, Some(_)) => return Err(Unorderable),
            (None, None) => {}
        }
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Ok(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Ok(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Ok(a.cmp(b)),
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                lexicographic(a, b, Value::try_cmp)
            }
            _ => Err(Unorderable),
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

/// Plain JSON documents map onto lists, dicts and scalars
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(fields) => {
                Value::Dict(fields.into_iter().map(|(k, v)| (Key::Str(k), Value::from(v))).collect())
            }
        }
    }
}

pub(crate) fn format_float(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else if v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

pub(crate) fn tuple_repr<I: Iterator<Item = String>>(items: I) -> String {
    let parts: Vec<String> = items.collect();
    if parts.len() == 1 {
        format!("({},)", parts[0])
    } else {
        format!("({})", parts.join(", "))
    }
}

pub(crate) fn shape_repr(shape: &[usize]) -> String {
    tuple_repr(shape.iter().map(|d| d.to_string()))
}

fn float_bits(f: f64) -> u64 {
    // -0.0 and 0.0 hash alike
    if f == 0.0 { 0 } else { f.to_bits() }
}

fn compare_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn lexicographic<T>(
    a: &[T],
    b: &[T],
    cmp: fn(&T, &T) -> Result<Ordering, Unorderable>,
) -> Result<Ordering, Unorderable> {
    for (x, y) in a.iter().zip(b.iter()) {
        match cmp(x, y)? {
            Ordering::Equal => continue,
            ord => return Ok(ord),
        }
    }
    Ok(a.len().cmp(&b.len()))
}
