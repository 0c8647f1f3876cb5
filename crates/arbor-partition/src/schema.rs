//! Minimal schema knowledge needed by partitions and the interceptor chain.

use std::collections::HashMap;

use arbor_name::normalize_attribute_type;

/// Whether an attribute is user data or server-maintained metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeUsage {
    /// Ordinary user data, returned for `*`.
    User,
    /// Server-maintained metadata, returned only for `+` or by name.
    Operational,
}

/// Kind of an object class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectClassKind {
    /// Defines what an entry is. Every entry needs at least one.
    Structural,
    /// Adds attributes to an entry of any structural class.
    Auxiliary,
    /// Only usable as a superclass.
    Abstract,
}

/// Read-only view of the schema.
///
/// Lookups are case-insensitive and accept attribute aliases such as
/// `commonName` for `cn`.
pub trait SchemaLookup: Send + Sync {
    /// Returns the canonical spelling of an attribute type, resolving
    /// aliases. Unknown types yield `None`.
    fn canonical_attribute(&self, attr_type: &str) -> Option<String>;

    /// Usage of an attribute type. Unknown types are user attributes.
    fn attribute_usage(&self, attr_type: &str) -> AttributeUsage;

    /// Whether the attribute type admits at most one value.
    fn is_single_valued(&self, attr_type: &str) -> bool;

    /// Kind of an object class, or `None` when the class is unknown.
    fn object_class_kind(&self, object_class: &str) -> Option<ObjectClassKind>;

    /// Direct superclasses of an object class, in normalized form.
    fn superclasses(&self, object_class: &str) -> Vec<String>;
}

#[derive(Debug, Clone)]
struct AttributeDefinition {
    canonical: String,
    usage: AttributeUsage,
    single_valued: bool,
}

#[derive(Debug, Clone)]
struct ObjectClassDefinition {
    kind: ObjectClassKind,
    superclasses: Vec<String>,
}

/// A schema held entirely in memory.
///
/// [`StaticSchema::core`] carries the handful of classes and attributes a
/// fresh directory needs. Further definitions can be chained on with
/// [`with_attribute`](Self::with_attribute) and
/// [`with_object_class`](Self::with_object_class).
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    attributes: HashMap<String, AttributeDefinition>,
    object_classes: HashMap<String, ObjectClassDefinition>,
}

impl StaticSchema {
    /// An empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Core classes and attributes used by the default configuration.
    #[must_use]
    pub fn core() -> Self {
        use AttributeUsage::{Operational, User};
        use ObjectClassKind::{Abstract, Auxiliary, Structural};

        Self::new()
            .with_attribute("objectClass", &[], User, false)
            .with_attribute("aliasedObjectName", &[], User, true)
            .with_attribute("cn", &["commonName"], User, false)
            .with_attribute("sn", &["surname"], User, false)
            .with_attribute("givenName", &["gn"], User, false)
            .with_attribute("uid", &["userid"], User, false)
            .with_attribute("ou", &["organizationalUnitName"], User, false)
            .with_attribute("o", &["organizationName"], User, false)
            .with_attribute("dc", &["domainComponent"], User, true)
            .with_attribute("mail", &["rfc822Mailbox"], User, false)
            .with_attribute("description", &[], User, false)
            .with_attribute("telephoneNumber", &[], User, false)
            .with_attribute("userPassword", &[], User, false)
            .with_attribute("displayName", &[], User, true)
            .with_attribute("employeeNumber", &[], User, true)
            .with_attribute("creatorsName", &[], Operational, true)
            .with_attribute("createTimestamp", &[], Operational, true)
            .with_attribute("modifiersName", &[], Operational, true)
            .with_attribute("modifyTimestamp", &[], Operational, true)
            .with_object_class("top", Abstract, &[])
            .with_object_class("alias", Structural, &["top"])
            .with_object_class("extensibleObject", Auxiliary, &["top"])
            .with_object_class("person", Structural, &["top"])
            .with_object_class("organizationalPerson", Structural, &["person"])
            .with_object_class("inetOrgPerson", Structural, &["organizationalPerson"])
            .with_object_class("organizationalUnit", Structural, &["top"])
            .with_object_class("organization", Structural, &["top"])
            .with_object_class("domain", Structural, &["top"])
    }

    /// Adds an attribute type and its aliases.
    #[must_use]
    pub fn with_attribute(
        mut self,
        name: &str,
        aliases: &[&str],
        usage: AttributeUsage,
        single_valued: bool,
    ) -> Self {
        let definition = AttributeDefinition {
            canonical: name.to_owned(),
            usage,
            single_valued,
        };
        for spelling in aliases.iter().copied().chain(std::iter::once(name)) {
            self.attributes
                .insert(normalize_attribute_type(spelling), definition.clone());
        }
        self
    }

    /// Adds an object class.
    #[must_use]
    pub fn with_object_class(
        mut self,
        name: &str,
        kind: ObjectClassKind,
        superclasses: &[&str],
    ) -> Self {
        self.object_classes.insert(
            normalize_attribute_type(name),
            ObjectClassDefinition {
                kind,
                superclasses: superclasses
                    .iter()
                    .map(|class| normalize_attribute_type(class))
                    .collect(),
            },
        );
        self
    }

    fn attribute(&self, attr_type: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(&normalize_attribute_type(attr_type))
    }
}

impl SchemaLookup for StaticSchema {
    fn canonical_attribute(&self, attr_type: &str) -> Option<String> {
        self.attribute(attr_type)
            .map(|definition| definition.canonical.clone())
    }

    fn attribute_usage(&self, attr_type: &str) -> AttributeUsage {
        self.attribute(attr_type)
            .map_or(AttributeUsage::User, |definition| definition.usage)
    }

    fn is_single_valued(&self, attr_type: &str) -> bool {
        self.attribute(attr_type)
            .is_some_and(|definition| definition.single_valued)
    }

    fn object_class_kind(&self, object_class: &str) -> Option<ObjectClassKind> {
        self.object_classes
            .get(&normalize_attribute_type(object_class))
            .map(|definition| definition.kind)
    }

    fn superclasses(&self, object_class: &str) -> Vec<String> {
        self.object_classes
            .get(&normalize_attribute_type(object_class))
            .map(|definition| definition.superclasses.clone())
            .unwrap_or_default()
    }
}
