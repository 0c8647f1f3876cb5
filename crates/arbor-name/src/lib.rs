//! Distinguished names for the Arbor directory core.
//!
//! A [`Name`] is an ordered sequence of relative naming components
//! ([`Rdn`]s), written leaf first in the familiar LDAP string order
//! (`cn=alice,ou=people,dc=example`). Every name carries two renderings:
//!
//! - the **user-provided** form, preserved for display and echoed back to
//!   clients, and
//! - the **normalized** form, which lowercases attribute types, folds value
//!   case and whitespace, and orders multi-valued RDNs canonically.
//!
//! Equality, hashing and ordering are defined on the normalized form only, so
//! `CN=Alice , OU=People` and `cn=alice,ou=people` are the same name. Routing,
//! index keys and suffix matching all operate on normalized text.
//!
//! # Example
//!
//! ```
//! use arbor_name::Name;
//!
//! let name = Name::parse("CN=Test User, OU=System").expect("valid name");
//! let suffix = Name::parse("ou=system").expect("valid suffix");
//!
//! assert!(name.is_within(&suffix));
//! assert_eq!(name.normalized(), "cn=test user,ou=system");
//! assert_eq!(name.rdn().map(|rdn| rdn.value()), Some("Test User"));
//! ```

mod error;
mod name;
mod parse;
mod rdn;

pub use error::NameError;
pub use name::Name;
pub use parse::{escape_value, normalize_attribute_type, normalize_value};
pub use rdn::{Ava, Rdn};

#[cfg(test)]
mod tests;
