//! Resolved values handed to the caller.
//!
//! `Value` is `Eq + Hash` so it can key mappings and populate sets. Floats
//! compare and hash by bit pattern, which keeps `NaN` usable as a key.
//! Mappings and sets compare without regard to order, and hash the same way.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate};
use indexmap::{IndexMap, IndexSet};

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Symbol(String),
    Binary(Vec<u8>),
    Timestamp(DateTime<FixedOffset>),
    Date(NaiveDate),
    Sequence(Vec<Value>),
    Mapping(Mapping),
    Set(ValueSet),
    Object(Object),
    Singleton(Singleton),
    /// Reference to an allowlisted class by name.
    Class(String),
    /// Value carried under a registered custom tag.
    Tagged(Box<TaggedValue>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
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
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a string key in a mapping value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping().and_then(|m| m.get_str(key))
    }

    /// Short name of the value's shape, used in diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Set(_) => "set",
            Value::Object(_) | Value::Singleton(_) => "object",
            Value::Class(_) => "class",
            Value::Tagged(_) => "tagged value",
            _ => "scalar",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Mapping(a), Value::Mapping(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Singleton(a), Value::Singleton(b)) => a == b,
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::Tagged(a), Value::Tagged(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::String(s) | Value::Symbol(s) | Value::Class(s) => s.hash(state),
            Value::Binary(b) => b.hash(state),
            Value::Timestamp(t) => t.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Sequence(items) => items.hash(state),
            Value::Mapping(m) => m.hash(state),
            Value::Set(s) => s.hash(state),
            Value::Object(o) => o.hash(state),
            Value::Singleton(s) => s.hash(state),
            Value::Tagged(t) => t.hash(state),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Combine per-item hashes so that iteration order does not matter.
fn unordered_hash<I>(items: I) -> u64
where
    I: IntoIterator,
    I::Item: Hash,
{
    items.into_iter().fold(0u64, |acc, item| {
        let mut hasher = DefaultHasher::new();
        item.hash(&mut hasher);
        acc ^ hasher.finish()
    })
}

/// Ordered mapping with unique keys.
///
/// Inserting an existing key replaces its value in place, so the later entry
/// wins while the key keeps its first position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mapping(IndexMap<Value, Value>);

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        self.0.insert(key, value)
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.0.get(&Value::String(key.to_owned()))
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, Value, Value> {
        self.0.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, Value, Value> {
        self.0.keys()
    }
}

impl Hash for Mapping {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.0.len());
        state.write_u64(unordered_hash(self.0.iter()));
    }
}

impl IntoIterator for Mapping {
    type Item = (Value, Value);
    type IntoIter = indexmap::map::IntoIter<Value, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Mapping {
    type Item = (&'a Value, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, Value, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(Value, Value)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        Mapping(iter.into_iter().collect())
    }
}

/// Set-like collection revived from an allowlisted set class or `!!set`.
///
/// Membership is reported only for inserted values; `contains` is `false`
/// for everything else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueSet {
    class: Option<String>,
    members: IndexSet<Value>,
}

impl ValueSet {
    pub(crate) fn new(class: Option<&str>, members: IndexSet<Value>) -> Self {
        Self {
            class: class.map(str::to_owned),
            members,
        }
    }

    /// Class the set was revived as, `None` for a core `!!set`.
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.members.contains(value)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> indexmap::set::Iter<'_, Value> {
        self.members.iter()
    }
}

impl Hash for ValueSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.hash(state);
        state.write_usize(self.members.len());
        state.write_u64(unordered_hash(self.members.iter()));
    }
}

/// Generic instance of an allowlisted class: its name and validated payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Object {
    class: String,
    payload: Box<Value>,
}

impl Object {
    pub fn new<S: Into<String>>(class: S, payload: Value) -> Self {
        Self {
            class: class.into(),
            payload: Box::new(payload),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Field lookup for mapping-shaped payloads.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    pub fn into_payload(self) -> Value {
        *self.payload
    }
}

#[derive(Debug)]
struct SingletonInstance {
    class: String,
}

/// Handle to the one shared instance of a singleton class.
///
/// Equality is identity: two handles are equal only if they point at the
/// same instance.
#[derive(Clone)]
pub struct Singleton(Arc<SingletonInstance>);

impl Singleton {
    pub(crate) fn new(class: &str) -> Self {
        Singleton(Arc::new(SingletonInstance {
            class: class.to_owned(),
        }))
    }

    pub fn class(&self) -> &str {
        &self.0.class
    }

    pub fn ptr_eq(&self, other: &Singleton) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Singleton {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Singleton {}

impl Hash for Singleton {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for Singleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Singleton({}@{:p})", self.0.class, Arc::as_ptr(&self.0))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaggedValue {
    pub tag: String,
    pub value: Value,
}
