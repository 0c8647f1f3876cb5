//! Errors raised while parsing or composing names.

use thiserror::Error;

/// Errors returned when a distinguished name cannot be parsed or built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// A naming component between separators was empty.
    #[error("empty naming component in '{name}'")]
    EmptyComponent {
        /// The text that failed to parse.
        name: String,
    },

    /// A component lacked the `type=value` separator.
    #[error("naming component '{component}' has no '=' separator")]
    MissingSeparator {
        /// The offending component.
        component: String,
    },

    /// The attribute type is neither a descriptor nor a numeric OID.
    #[error("invalid attribute type '{attr_type}'")]
    InvalidAttributeType {
        /// The offending attribute type.
        attr_type: String,
    },

    /// A backslash escape was truncated or not a valid hex pair.
    #[error("invalid escape sequence in '{value}'")]
    InvalidEscape {
        /// The value containing the broken escape.
        value: String,
    },

    /// A quoted value was never closed.
    #[error("unterminated quoted value in '{value}'")]
    UnterminatedQuote {
        /// The value containing the open quote.
        value: String,
    },

    /// Stored canonical attribute types do not line up with the name.
    #[error("canonical types do not match the components of '{name}'")]
    MismatchedTypes {
        /// The name whose types were rejected.
        name: String,
    },
}

impl NameError {
    /// Creates an empty component error.
    #[must_use]
    pub fn empty_component(name: impl Into<String>) -> Self {
        Self::EmptyComponent { name: name.into() }
    }

    /// Creates a missing separator error.
    #[must_use]
    pub fn missing_separator(component: impl Into<String>) -> Self {
        Self::MissingSeparator {
            component: component.into(),
        }
    }

    /// Creates an invalid attribute type error.
    #[must_use]
    pub fn invalid_attribute_type(attr_type: impl Into<String>) -> Self {
        Self::InvalidAttributeType {
            attr_type: attr_type.into(),
        }
    }

    /// Creates an invalid escape error.
    #[must_use]
    pub fn invalid_escape(value: impl Into<String>) -> Self {
        Self::InvalidEscape {
            value: value.into(),
        }
    }

    /// Creates an unterminated quote error.
    #[must_use]
    pub fn unterminated_quote(value: impl Into<String>) -> Self {
        Self::UnterminatedQuote {
            value: value.into(),
        }
    }

    /// Creates a mismatched canonical types error.
    #[must_use]
    pub fn mismatched_types(name: impl Into<String>) -> Self {
        Self::MismatchedTypes { name: name.into() }
    }
}
