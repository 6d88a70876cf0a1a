use std::borrow::Borrow;
use std::sync::Arc;

use crate::{ObjectId, Value};

/// The name of an observable property
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Key(Arc<str>);

impl Key {
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self { Key(Arc::from(value)) }
}
impl From<String> for Key {
    fn from(value: String) -> Self { Key(Arc::from(value)) }
}
impl From<&Key> for Key {
    fn from(value: &Key) -> Self { value.clone() }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str { &self.0 }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

impl PartialEq<str> for Key {
    fn eq(&self, other: &str) -> bool { &*self.0 == other }
}
impl PartialEq<&str> for Key {
    fn eq(&self, other: &&str) -> bool { &*self.0 == *other }
}

/// A single property change, handed by reference to every observer of (object, key)
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub(crate) object: ObjectId,
    pub(crate) key: Key,
    pub(crate) old: Value,
    pub(crate) new: Value,
}

impl Change {
    pub fn new(object: ObjectId, key: impl Into<Key>, old: impl Into<Value>, new: impl Into<Value>) -> Self {
        Self { object, key: key.into(), old: old.into(), new: new.into() }
    }

    pub fn object(&self) -> ObjectId { self.object }
    pub fn key(&self) -> &Key { &self.key }
    pub fn old(&self) -> &Value { &self.old }
    pub fn new_value(&self) -> &Value { &self.new }

    /// True when the old and new values are equal
    pub fn is_noop(&self) -> bool { self.old == self.new }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}: {} -> {}", self.object, self.key, self.old, self.new)
    }
}
