//! Relative distinguished names and their attribute-value assertions.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::NameError;
use crate::parse::{
    escape_value, is_valid_attribute_type, normalize_attribute_type, normalize_value,
    split_unescaped, trim_value, unescape_value,
};

/// A single `type=value` assertion inside an RDN.
#[derive(Debug, Clone)]
pub struct Ava {
    attr_type: String,
    value: String,
    norm_type: String,
    norm_value: String,
}

impl Ava {
    /// Builds an assertion from an attribute type and an unescaped value.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::InvalidAttributeType`] when the type is neither a
    /// descriptor nor a numeric OID.
    pub fn new(attr_type: impl AsRef<str>, value: impl Into<String>) -> Result<Self, NameError> {
        let attr_type = attr_type.as_ref().trim();
        if !is_valid_attribute_type(attr_type) {
            return Err(NameError::invalid_attribute_type(attr_type));
        }
        let value = value.into();
        Ok(Self {
            norm_type: normalize_attribute_type(attr_type),
            norm_value: normalize_value(&value),
            attr_type: attr_type.to_owned(),
            value,
        })
    }

    fn parse(component: &str) -> Result<Self, NameError> {
        let (attr_type, raw_value) = component
            .split_once('=')
            .ok_or_else(|| NameError::missing_separator(component))?;
        let value = unescape_value(trim_value(raw_value))?;
        Self::new(attr_type, value)
    }

    /// Attribute type as the user wrote it.
    #[must_use]
    pub fn attr_type(&self) -> &str {
        &self.attr_type
    }

    /// Unescaped value as the user wrote it.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Lowercased attribute type.
    #[must_use]
    pub fn normalized_type(&self) -> &str {
        &self.norm_type
    }

    /// Case- and whitespace-folded value.
    #[must_use]
    pub fn normalized_value(&self) -> &str {
        &self.norm_value
    }

    /// Normalized `type=value` text.
    #[must_use]
    pub fn normalized(&self) -> String {
        format!("{}={}", self.norm_type, escape_value(&self.norm_value))
    }

    /// Copy whose normalized type is `attr_type`, keeping the user's spelling.
    fn retyped(&self, attr_type: &str) -> Self {
        Self {
            norm_type: normalize_attribute_type(attr_type),
            ..self.clone()
        }
    }

    fn has_plain_type(&self) -> bool {
        self.norm_type == normalize_attribute_type(&self.attr_type)
    }

    /// User-provided `type=value` text, re-escaped.
    #[must_use]
    pub fn user_provided(&self) -> String {
        format!("{}={}", self.attr_type, escape_value(&self.value))
    }
}

impl PartialEq for Ava {
    fn eq(&self, other: &Self) -> bool {
        self.norm_type == other.norm_type && self.norm_value == other.norm_value
    }
}

impl Eq for Ava {}

impl Hash for Ava {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.norm_type.hash(state);
        self.norm_value.hash(state);
    }
}

/// One naming component of a [`Name`](crate::Name), possibly multi-valued
/// (`cn=a+uid=b`).
///
/// Assertions keep the order the user supplied; the normalized rendering
/// sorts them so that `uid=b+cn=a` and `cn=a+uid=b` compare equal.
#[derive(Debug, Clone)]
pub struct Rdn {
    avas: Vec<Ava>,
    user: String,
    normalized: String,
}

impl Rdn {
    /// Builds a single-valued RDN.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::InvalidAttributeType`] for a malformed type.
    pub fn new(attr_type: impl AsRef<str>, value: impl Into<String>) -> Result<Self, NameError> {
        Ok(Self::assemble(vec![Ava::new(attr_type, value)?], None))
    }

    /// Builds an RDN from one or more assertions.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::EmptyComponent`] when `avas` is empty.
    pub fn from_avas(avas: Vec<Ava>) -> Result<Self, NameError> {
        if avas.is_empty() {
            return Err(NameError::empty_component(""));
        }
        Ok(Self::assemble(avas, None))
    }

    /// Parses the string form of a single RDN.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] describing the first syntax problem found.
    pub fn parse(text: &str) -> Result<Self, NameError> {
        let trimmed = trim_value(text);
        if trimmed.is_empty() {
            return Err(NameError::empty_component(text));
        }
        let avas = split_unescaped(trimmed, |ch| ch == '+')?
            .into_iter()
            .map(|component| {
                let component = trim_value(component);
                if component.is_empty() {
                    Err(NameError::empty_component(trimmed))
                } else {
                    Ava::parse(component)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::assemble(avas, Some(trimmed.to_owned())))
    }

    fn assemble(avas: Vec<Ava>, user: Option<String>) -> Self {
        let mut normalized: Vec<String> = avas.iter().map(Ava::normalized).collect();
        normalized.sort();
        normalized.dedup();
        let user = user.unwrap_or_else(|| {
            avas.iter()
                .map(Ava::user_provided)
                .collect::<Vec<_>>()
                .join("+")
        });
        Self {
            avas,
            user,
            normalized: normalized.join("+"),
        }
    }

    /// Assertions in the order the user supplied them.
    #[must_use]
    pub fn avas(&self) -> &[Ava] {
        &self.avas
    }

    /// Attribute type of the first assertion.
    #[must_use]
    pub fn attr_type(&self) -> &str {
        self.avas.first().map_or("", Ava::attr_type)
    }

    /// Value of the first assertion.
    #[must_use]
    pub fn value(&self) -> &str {
        self.avas.first().map_or("", Ava::value)
    }

    /// Returns `true` for RDNs such as `cn=a+uid=b`.
    #[must_use]
    pub fn is_multi_valued(&self) -> bool {
        self.avas.len() > 1
    }

    /// Checks whether the RDN asserts `attr_type` with `value`, comparing
    /// normalized forms.
    #[must_use]
    pub fn contains(&self, attr_type: &str, value: &str) -> bool {
        let norm_type = normalize_attribute_type(attr_type);
        let norm_value = normalize_value(value);
        self.avas
            .iter()
            .any(|ava| ava.norm_type == norm_type && ava.norm_value == norm_value)
    }

    /// A copy whose normalized form spells each attribute type as
    /// `canonical` returns it. The user-provided text is unchanged, so
    /// `commonName=Bob` still renders as typed but compares equal to `cn=bob`.
    #[must_use]
    pub fn with_canonical_types(&self, canonical: &dyn Fn(&str) -> String) -> Self {
        let avas = self
            .avas
            .iter()
            .map(|ava| ava.retyped(&canonical(&ava.attr_type)))
            .collect();
        Self::assemble(avas, Some(self.user.clone()))
    }

    pub(crate) fn has_plain_types(&self) -> bool {
        self.avas.iter().all(Ava::has_plain_type)
    }

    pub(crate) fn normalized_types(&self) -> Vec<String> {
        self.avas.iter().map(|ava| ava.norm_type.clone()).collect()
    }

    pub(crate) fn with_normalized_types(&self, types: &[String]) -> Option<Self> {
        if types.len() != self.avas.len() {
            return None;
        }
        let avas = self
            .avas
            .iter()
            .zip(types)
            .map(|(ava, attr_type)| ava.retyped(attr_type))
            .collect();
        Some(Self::assemble(avas, Some(self.user.clone())))
    }

    /// User-provided text of this component.
    #[must_use]
    pub fn user_provided(&self) -> &str {
        &self.user
    }

    /// Normalized text of this component.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for Rdn {}

impl Hash for Rdn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.user)
    }
}
