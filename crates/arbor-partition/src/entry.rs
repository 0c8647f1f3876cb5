//! Entries, their identifiers and modification requests.

use std::fmt;

use arbor_name::Name;
use serde::{Deserialize, Serialize};

use crate::attributes::{Attribute, Attributes};
use crate::error::PartitionError;

/// Partition-local identifier of an entry. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(u64);

impl EntryId {
    /// The first identifier a partition hands out.
    pub const FIRST: Self = Self(1);

    /// Wraps a raw identifier. Zero is rejected.
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// The raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The identifier following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A stored entry: identifier, name and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    id: EntryId,
    name: Name,
    attributes: Attributes,
}

impl Entry {
    /// Assembles an entry.
    #[must_use]
    pub const fn new(id: EntryId, name: Name, attributes: Attributes) -> Self {
        Self {
            id,
            name,
            attributes,
        }
    }

    /// Partition-local identifier.
    #[must_use]
    pub const fn id(&self) -> EntryId {
        self.id
    }

    /// The entry's name.
    #[must_use]
    pub const fn name(&self) -> &Name {
        &self.name
    }

    /// The entry's attributes.
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Mutable access to the attributes.
    pub const fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Splits the entry into its name and attributes.
    #[must_use]
    pub fn into_parts(self) -> (EntryId, Name, Attributes) {
        (self.id, self.name, self.attributes)
    }

    /// Returns a copy of this entry under a different name.
    #[must_use]
    pub fn renamed(&self, name: Name) -> Self {
        Self {
            id: self.id,
            name,
            attributes: self.attributes.clone(),
        }
    }

    /// Returns this entry with its attributes replaced.
    #[must_use]
    pub fn with_attributes(self, attributes: Attributes) -> Self {
        Self {
            id: self.id,
            name: self.name,
            attributes,
        }
    }

    /// Returns `true` when the entry is an alias with a target.
    #[must_use]
    pub fn is_alias(&self) -> bool {
        self.attributes.has_object_class("alias") && self.attributes.contains("aliasedobjectname")
    }
}

/// Kind of change applied to an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModOp {
    /// Add values, creating the attribute when absent.
    Add,
    /// Replace all values. An empty value list removes the attribute.
    Replace,
    /// Remove listed values, or the whole attribute when none are listed.
    Remove,
}

/// One attribute change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    /// What to do.
    pub op: ModOp,
    /// The attribute and values it applies to.
    pub attribute: Attribute,
}

impl Modification {
    /// Creates a modification.
    #[must_use]
    pub const fn new(op: ModOp, attribute: Attribute) -> Self {
        Self { op, attribute }
    }

    /// Shorthand for an add.
    #[must_use]
    pub const fn add(attribute: Attribute) -> Self {
        Self::new(ModOp::Add, attribute)
    }

    /// Shorthand for a replace.
    #[must_use]
    pub const fn replace(attribute: Attribute) -> Self {
        Self::new(ModOp::Replace, attribute)
    }

    /// Shorthand for a remove.
    #[must_use]
    pub const fn remove(attribute: Attribute) -> Self {
        Self::new(ModOp::Remove, attribute)
    }

    /// Applies this change to `attributes` of the entry called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::NoSuchAttribute`] when a remove targets an
    /// attribute or value that is not present.
    pub fn apply_to(&self, name: &Name, attributes: &mut Attributes) -> Result<(), PartitionError> {
        let id = self.attribute.id();
        match self.op {
            ModOp::Add => {
                if !self.attribute.is_empty() {
                    attributes.add_values(id, self.attribute.values().iter().cloned());
                }
            }
            ModOp::Replace => {
                if self.attribute.is_empty() {
                    attributes.remove(id);
                } else {
                    attributes.put(self.attribute.clone());
                }
            }
            ModOp::Remove => {
                let missing = || PartitionError::NoSuchAttribute {
                    name: name.to_string(),
                    attribute: id.to_owned(),
                };
                if self.attribute.is_empty() {
                    attributes.remove(id).ok_or_else(missing)?;
                } else {
                    for value in self.attribute.values() {
                        if !attributes.remove_value(id, value) {
                            return Err(missing());
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
