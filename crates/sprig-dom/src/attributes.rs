//! Element attribute map.
//!
//! [§ 4.9.2 Interface NamedNodeMap](https://dom.spec.whatwg.org/#interface-namednodemap)
//!
//! HTML attribute names are ASCII case-insensitive, so names are lower-cased
//! on the way in and every lookup lower-cases its argument. Setting a name that
//! is already present replaces its value.

use std::collections::HashMap;

/// Map of lower-cased attribute names to values for an element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    map: HashMap<String, String>,
}

impl Attributes {
    /// Create an empty attribute map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, replacing any previous value for that name.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let _ = self.map.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Get the value of the attribute called `name`, in any letter case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map
            .get(name.to_ascii_lowercase().as_str())
            .map(String::as_str)
    }

    /// Whether an attribute called `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name.to_ascii_lowercase().as_str())
    }

    /// Iterate over the (lower-cased) attribute names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (name, value) in iter {
            attrs.set(name.as_ref(), value);
        }
        attrs
    }
}
