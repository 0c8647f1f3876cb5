//! Search filters and their evaluation against attribute sets.

use std::cmp::Ordering;
use std::fmt;

use arbor_name::{normalize_attribute_type, normalize_value};

use crate::attributes::Attributes;
use crate::error::PartitionError;

/// A boolean predicate over an entry's attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// The attribute is present.
    Present {
        /// Attribute type.
        attribute: String,
    },
    /// Some value equals `value`.
    Equality {
        /// Attribute type.
        attribute: String,
        /// Assertion value.
        value: String,
    },
    /// Some value matches `initial*any*...*final`.
    Substring {
        /// Attribute type.
        attribute: String,
        /// Required prefix.
        initial: Option<String>,
        /// Required inner fragments, in order.
        any: Vec<String>,
        /// Required suffix.
        final_part: Option<String>,
    },
    /// Some value approximately equals `value`, ignoring whitespace.
    Approximate {
        /// Attribute type.
        attribute: String,
        /// Assertion value.
        value: String,
    },
    /// Some value orders at or after `value`.
    GreaterOrEqual {
        /// Attribute type.
        attribute: String,
        /// Assertion value.
        value: String,
    },
    /// Some value orders at or before `value`.
    LessOrEqual {
        /// Attribute type.
        attribute: String,
        /// Assertion value.
        value: String,
    },
    /// Every sub-filter matches.
    And(Vec<Filter>),
    /// At least one sub-filter matches.
    Or(Vec<Filter>),
    /// The sub-filter does not match.
    Not(Box<Filter>),
}

impl Filter {
    /// `(attribute=*)`.
    #[must_use]
    pub fn present(attribute: impl Into<String>) -> Self {
        Self::Present {
            attribute: attribute.into(),
        }
    }

    /// `(attribute=value)`.
    #[must_use]
    pub fn equality(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equality {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// `(attribute=initial*any*final)`.
    #[must_use]
    pub fn substring(
        attribute: impl Into<String>,
        initial: Option<&str>,
        any: &[&str],
        final_part: Option<&str>,
    ) -> Self {
        Self::Substring {
            attribute: attribute.into(),
            initial: initial.map(str::to_owned),
            any: any.iter().map(|fragment| (*fragment).to_owned()).collect(),
            final_part: final_part.map(str::to_owned),
        }
    }

    /// `(attribute~=value)`.
    #[must_use]
    pub fn approximate(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Approximate {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// `(attribute>=value)`.
    #[must_use]
    pub fn greater_or_equal(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::GreaterOrEqual {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// `(attribute<=value)`.
    #[must_use]
    pub fn less_or_equal(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::LessOrEqual {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// `(&...)`.
    #[must_use]
    pub const fn and(filters: Vec<Self>) -> Self {
        Self::And(filters)
    }

    /// `(|...)`.
    #[must_use]
    pub const fn or(filters: Vec<Self>) -> Self {
        Self::Or(filters)
    }

    /// `(!...)`.
    #[must_use]
    pub fn not(filter: Self) -> Self {
        Self::Not(Box::new(filter))
    }

    /// The attribute type a leaf filter tests, `None` for combinators.
    #[must_use]
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::Present { attribute }
            | Self::Equality { attribute, .. }
            | Self::Substring { attribute, .. }
            | Self::Approximate { attribute, .. }
            | Self::GreaterOrEqual { attribute, .. }
            | Self::LessOrEqual { attribute, .. } => Some(attribute),
            Self::And(_) | Self::Or(_) | Self::Not(_) => None,
        }
    }

    /// Rewrites every attribute type with `rename`.
    pub fn rename_attributes(&mut self, rename: &dyn Fn(&str) -> String) {
        match self {
            Self::Present { attribute }
            | Self::Equality { attribute, .. }
            | Self::Substring { attribute, .. }
            | Self::Approximate { attribute, .. }
            | Self::GreaterOrEqual { attribute, .. }
            | Self::LessOrEqual { attribute, .. } => {
                let renamed = rename(attribute);
                *attribute = renamed;
            }
            Self::And(filters) | Self::Or(filters) => {
                for filter in filters {
                    filter.rename_attributes(rename);
                }
            }
            Self::Not(filter) => filter.rename_attributes(rename),
        }
    }

    /// Checks the filter is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::InvalidFilter`] for a blank attribute type, a
    /// substring with no fragments or an empty fragment.
    pub fn validate(&self) -> Result<(), PartitionError> {
        match self {
            Self::And(filters) | Self::Or(filters) => filters.iter().try_for_each(Self::validate),
            Self::Not(filter) => filter.validate(),
            Self::Substring {
                attribute,
                initial,
                any,
                final_part,
            } => {
                check_attribute(attribute)?;
                if initial.is_none() && any.is_empty() && final_part.is_none() {
                    return Err(PartitionError::invalid_filter(format!(
                        "substring filter on '{attribute}' has no fragments"
                    )));
                }
                let fragments = initial.iter().chain(any).chain(final_part.iter());
                for fragment in fragments {
                    if fragment.is_empty() {
                        return Err(PartitionError::invalid_filter(format!(
                            "substring filter on '{attribute}' has an empty fragment"
                        )));
                    }
                }
                Ok(())
            }
            Self::Present { attribute }
            | Self::Equality { attribute, .. }
            | Self::Approximate { attribute, .. }
            | Self::GreaterOrEqual { attribute, .. }
            | Self::LessOrEqual { attribute, .. } => check_attribute(attribute),
        }
    }

    /// Evaluates the filter against an attribute set.
    #[must_use]
    pub fn matches(&self, attributes: &Attributes) -> bool {
        match self {
            Self::And(filters) => filters.iter().all(|filter| filter.matches(attributes)),
            Self::Or(filters) => filters.iter().any(|filter| filter.matches(attributes)),
            Self::Not(filter) => !filter.matches(attributes),
            Self::Present { attribute } => attributes.contains(attribute),
            leaf => leaf.attribute().and_then(|attr| attributes.get(attr)).is_some_and(
                |attribute| {
                    attribute
                        .normalized_values()
                        .any(|value| leaf.matches_value(&value))
                },
            ),
        }
    }

    /// Tests a single normalized value against a leaf assertion.
    ///
    /// Presence accepts every value. Combinators never match a single value.
    #[must_use]
    pub fn matches_value(&self, normalized: &str) -> bool {
        match self {
            Self::Present { .. } => true,
            Self::Equality { value, .. } => normalized == normalize_value(value),
            Self::Approximate { value, .. } => {
                squash(normalized) == squash(&normalize_value(value))
            }
            Self::GreaterOrEqual { value, .. } => {
                compare_values(normalized, &normalize_value(value)) != Ordering::Less
            }
            Self::LessOrEqual { value, .. } => {
                compare_values(normalized, &normalize_value(value)) != Ordering::Greater
            }
            Self::Substring {
                initial,
                any,
                final_part,
                ..
            } => substring_matches(normalized, initial.as_deref(), any, final_part.as_deref()),
            Self::And(_) | Self::Or(_) | Self::Not(_) => false,
        }
    }
}

fn check_attribute(attribute: &str) -> Result<(), PartitionError> {
    let trimmed = attribute.trim();
    let valid = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '.' || ch == ';');
    if valid {
        Ok(())
    } else {
        Err(PartitionError::invalid_filter(format!(
            "'{attribute}' is not a valid attribute type"
        )))
    }
}

fn squash(value: &str) -> String {
    value.chars().filter(|ch| !ch.is_whitespace()).collect()
}

/// Integers compare numerically, everything else lexically.
fn compare_values(left: &str, right: &str) -> Ordering {
    match (left.parse::<i64>(), right.parse::<i64>()) {
        (Ok(left_number), Ok(right_number)) => left_number.cmp(&right_number),
        _ => left.cmp(right),
    }
}

fn substring_matches(
    normalized: &str,
    initial: Option<&str>,
    any: &[String],
    final_part: Option<&str>,
) -> bool {
    let mut rest = normalized;
    if let Some(prefix) = initial {
        match rest.strip_prefix(normalize_value(prefix).as_str()) {
            Some(remaining) => rest = remaining,
            None => return false,
        }
    }
    for fragment in any {
        let needle = normalize_value(fragment);
        match rest.find(needle.as_str()) {
            Some(position) => {
                rest = rest.get(position + needle.len()..).unwrap_or_default();
            }
            None => return false,
        }
    }
    final_part.is_none_or(|suffix| rest.ends_with(normalize_value(suffix).as_str()))
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present { attribute } => write!(f, "({attribute}=*)"),
            Self::Equality { attribute, value } => {
                write!(f, "({attribute}={})", escape_assertion(value))
            }
            Self::Approximate { attribute, value } => {
                write!(f, "({attribute}~={})", escape_assertion(value))
            }
            Self::GreaterOrEqual { attribute, value } => {
                write!(f, "({attribute}>={})", escape_assertion(value))
            }
            Self::LessOrEqual { attribute, value } => {
                write!(f, "({attribute}<={})", escape_assertion(value))
            }
            Self::Substring {
                attribute,
                initial,
                any,
                final_part,
            } => {
                write!(f, "({attribute}=")?;
                if let Some(prefix) = initial {
                    write!(f, "{}", escape_assertion(prefix))?;
                }
                for fragment in any {
                    write!(f, "*{}", escape_assertion(fragment))?;
                }
                write!(f, "*")?;
                if let Some(suffix) = final_part {
                    write!(f, "{}", escape_assertion(suffix))?;
                }
                write!(f, ")")
            }
            Self::And(filters) => write_set(f, '&', filters),
            Self::Or(filters) => write_set(f, '|', filters),
            Self::Not(filter) => write!(f, "(!{filter})"),
        }
    }
}

/// Escapes the characters that are special inside a filter string.
fn escape_assertion(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn write_set(f: &mut fmt::Formatter<'_>, operator: char, filters: &[Filter]) -> fmt::Result {
    write!(f, "({operator}")?;
    for filter in filters {
        write!(f, "{filter}")?;
    }
    write!(f, ")")
}

/// Normalized attribute type tested by a leaf, `None` for combinators.
pub(crate) fn leaf_attribute(filter: &Filter) -> Option<String> {
    filter.attribute().map(normalize_attribute_type)
}
