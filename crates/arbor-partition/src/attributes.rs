//! Attribute values with case-insensitive set semantics.

use std::collections::{BTreeMap, BTreeSet};

use arbor_name::{normalize_attribute_type, normalize_value};
use serde::{Deserialize, Serialize};

/// One attribute: a type as the user spelled it and a set of values.
///
/// Values compare by their normalized form, so `Alice` and `alice` are the
/// same value. The first spelling added is the one kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    id: String,
    values: Vec<String>,
}

impl Attribute {
    /// Creates an attribute, dropping duplicate values.
    pub fn new<I, V>(id: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let mut attribute = Self {
            id: id.into(),
            values: Vec::new(),
        };
        for value in values {
            attribute.add(value);
        }
        attribute
    }

    /// The attribute type as supplied.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The lowercase attribute type used as a key.
    #[must_use]
    pub fn normalized_id(&self) -> String {
        normalize_attribute_type(&self.id)
    }

    /// Replaces the attribute type, keeping the values.
    pub fn rename(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Values in insertion order.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// The first value, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Normalized values, used for indexing and matching.
    pub fn normalized_values(&self) -> impl Iterator<Item = String> + '_ {
        self.values.iter().map(|value| normalize_value(value))
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when the attribute has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns `true` when an equal value is present.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        let wanted = normalize_value(value);
        self.normalized_values().any(|candidate| candidate == wanted)
    }

    /// Adds a value. Returns `false` when an equal value was already present.
    pub fn add(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.contains(&value) {
            return false;
        }
        self.values.push(value);
        true
    }

    /// Removes a value. Returns `false` when no equal value was present.
    pub fn remove(&mut self, value: &str) -> bool {
        let wanted = normalize_value(value);
        let before = self.values.len();
        self.values
            .retain(|candidate| normalize_value(candidate) != wanted);
        self.values.len() != before
    }

    /// Drops every value, keeping the type.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    fn value_set(&self) -> BTreeSet<String> {
        self.normalized_values().collect()
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.normalized_id() == other.normalized_id() && self.value_set() == other.value_set()
    }
}

impl Eq for Attribute {}

/// The attributes of one entry, keyed by normalized type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    by_type: BTreeMap<String, Attribute>,
}

impl Attributes {
    /// An empty attribute set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`put`](Self::put).
    #[must_use]
    pub fn with<I, V>(mut self, id: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.put(Attribute::new(id, values));
        self
    }

    /// Looks up an attribute by type, ignoring case.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Attribute> {
        self.by_type.get(&normalize_attribute_type(id))
    }

    /// Mutable lookup by type.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Attribute> {
        self.by_type.get_mut(&normalize_attribute_type(id))
    }

    /// Returns `true` when the attribute type is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Returns `true` when the attribute holds a value equal to `value`.
    #[must_use]
    pub fn contains_value(&self, id: &str, value: &str) -> bool {
        self.get(id).is_some_and(|attribute| attribute.contains(value))
    }

    /// Values of an attribute, empty when absent.
    #[must_use]
    pub fn values(&self, id: &str) -> &[String] {
        self.get(id).map_or(&[], Attribute::values)
    }

    /// First value of an attribute.
    #[must_use]
    pub fn first_value(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(Attribute::first)
    }

    /// Inserts or replaces an attribute, returning the previous one.
    pub fn put(&mut self, attribute: Attribute) -> Option<Attribute> {
        self.by_type.insert(attribute.normalized_id(), attribute)
    }

    /// Removes an attribute.
    pub fn remove(&mut self, id: &str) -> Option<Attribute> {
        self.by_type.remove(&normalize_attribute_type(id))
    }

    /// Adds values to an attribute, creating it when absent.
    pub fn add_values<I, V>(&mut self, id: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let attribute = self
            .by_type
            .entry(normalize_attribute_type(id))
            .or_insert_with(|| Attribute::new(id, std::iter::empty::<String>()));
        for value in values {
            attribute.add(value);
        }
    }

    /// Removes one value, dropping the attribute when it becomes empty.
    /// Returns `false` when the value was not present.
    pub fn remove_value(&mut self, id: &str, value: &str) -> bool {
        let key = normalize_attribute_type(id);
        let Some(attribute) = self.by_type.get_mut(&key) else {
            return false;
        };
        let removed = attribute.remove(value);
        if attribute.is_empty() {
            self.by_type.remove(&key);
        }
        removed
    }

    /// Keeps only attributes for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&Attribute) -> bool) {
        self.by_type.retain(|_, attribute| keep(attribute));
    }

    /// Iterates attributes in normalized type order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.by_type.values()
    }

    /// Mutable iteration in normalized type order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Attribute> {
        self.by_type.values_mut()
    }

    /// Normalized attribute types present.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.by_type.keys().map(String::as_str)
    }

    /// Number of attribute types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// Returns `true` when no attributes are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Normalized `objectClass` values.
    #[must_use]
    pub fn object_classes(&self) -> Vec<String> {
        self.get("objectclass")
            .map(|attribute| {
                attribute
                    .values()
                    .iter()
                    .map(|value| normalize_attribute_type(value))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns `true` when `objectClass` contains `class`, ignoring case.
    #[must_use]
    pub fn has_object_class(&self, class: &str) -> bool {
        let wanted = normalize_attribute_type(class);
        self.object_classes().iter().any(|present| *present == wanted)
    }
}

impl FromIterator<Attribute> for Attributes {
    fn from_iter<T: IntoIterator<Item = Attribute>>(iter: T) -> Self {
        let mut attributes = Self::new();
        for attribute in iter {
            attributes.put(attribute);
        }
        attributes
    }
}

impl IntoIterator for Attributes {
    type Item = Attribute;
    type IntoIter = std::collections::btree_map::IntoValues<String, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_type.into_values()
    }
}
