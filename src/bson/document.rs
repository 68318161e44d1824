//! The ordered `String -> Value` mapping BSON documents are built from.

use indexmap::IndexMap;

use super::value::Value;

/// An insertion-ordered mapping from UTF-8 string keys to [`Value`]s.
///
/// At most one `_id` key may exist. When present, it is promoted to the front of the wire
/// encoding of a *top-level* document regardless of where it was inserted — see
/// [`Document::iter_id_first`]. This is a read-time projection, not a re-sort: the map itself
/// keeps the caller's insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    inner: IndexMap<String, Value>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Document {
            inner: IndexMap::new(),
        }
    }

    /// Inserts a key/value pair, returning the previous value for that key, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.insert(key.into(), value.into())
    }

    /// Returns a reference to the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Removes and returns the value for `key`, if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.inner.shift_remove(key)
    }

    /// Returns whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns whether the document has no elements.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter()
    }

    /// Iterates with `_id` (if present) promoted to the front; all other keys keep their
    /// relative insertion order. Used only at the top level of [`crate::bson::encode`] — nested
    /// documents always use plain insertion order (§4.1).
    pub fn iter_id_first(&self) -> impl Iterator<Item = (&String, &Value)> {
        let id_first = self.inner.get_key_value("_id");
        let rest = self.inner.iter().filter(|(k, _)| k.as_str() != "_id");
        id_first.into_iter().chain(rest)
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Document {
            inner: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, Value)> for Document {
    fn extend<T: IntoIterator<Item = (String, Value)>>(&mut self, iter: T) {
        self.inner.extend(iter);
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

/// Output-container generality for [`crate::bson::decode`], standing in for the source's
/// "as_mapping_factory" callback with a static-dispatch trait bound instead of a runtime
/// factory. `Document` is the default, natural instantiation.
pub trait FromDocument: Default {
    /// Inserts one decoded key/value pair.
    fn insert_pair(&mut self, key: String, value: Value);
}

impl FromDocument for Document {
    fn insert_pair(&mut self, key: String, value: Value) {
        self.insert(key, value);
    }
}
