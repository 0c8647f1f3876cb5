//! Hierarchical names with prefix/suffix algebra.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NameError;
use crate::parse::split_unescaped;
use crate::rdn::Rdn;

/// A distinguished name: RDNs ordered leaf first.
///
/// The empty name is the root of the namespace. Comparison, hashing and
/// ordering use the normalized rendering.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "NameRepr", into = "NameRepr")]
pub struct Name {
    rdns: Vec<Rdn>,
    user: String,
    normalized: String,
    /// Byte offset of each RDN inside `normalized`.
    offsets: Vec<usize>,
}

impl Name {
    /// The empty name.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses the LDAP string form of a name. `,` and `;` both separate RDNs.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] describing the first syntax problem found.
    pub fn parse(text: &str) -> Result<Self, NameError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let rdns = split_unescaped(trimmed, |ch| ch == ',' || ch == ';')?
            .into_iter()
            .map(|component| {
                if component.trim().is_empty() {
                    Err(NameError::empty_component(trimmed))
                } else {
                    Rdn::parse(component)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_rdns(rdns))
    }

    /// Builds a name from RDNs ordered leaf first.
    #[must_use]
    pub fn from_rdns(rdns: Vec<Rdn>) -> Self {
        let mut user = String::new();
        let mut normalized = String::new();
        let mut offsets = Vec::with_capacity(rdns.len());
        for (position, rdn) in rdns.iter().enumerate() {
            if position > 0 {
                user.push(',');
                normalized.push(',');
            }
            offsets.push(normalized.len());
            user.push_str(rdn.user_provided());
            normalized.push_str(rdn.normalized());
        }
        Self {
            rdns,
            user,
            normalized,
            offsets,
        }
    }

    /// A copy whose normalized form spells attribute types as `canonical`
    /// returns them. The user-provided rendering is kept.
    #[must_use]
    pub fn with_canonical_types(&self, canonical: &dyn Fn(&str) -> String) -> Self {
        Self::from_rdns(
            self.rdns
                .iter()
                .map(|rdn| rdn.with_canonical_types(canonical))
                .collect(),
        )
    }

    /// Number of RDNs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    /// Returns `true` for the root name.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// The leaf RDN, if any.
    #[must_use]
    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// All RDNs, leaf first.
    #[must_use]
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// The user-provided rendering.
    #[must_use]
    pub fn user_provided(&self) -> &str {
        &self.user
    }

    /// The normalized rendering.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// The name with its leaf RDN removed, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.rdns
            .get(1..)
            .map(|rest| Self::from_rdns(rest.to_vec()))
    }

    /// Appends `rdn` below this name.
    #[must_use]
    pub fn child(&self, rdn: Rdn) -> Self {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(rdn);
        rdns.extend(self.rdns.iter().cloned());
        Self::from_rdns(rdns)
    }

    /// Places the relative name `relative` below this name.
    #[must_use]
    pub fn concat(&self, relative: &Self) -> Self {
        let mut rdns = relative.rdns.clone();
        rdns.extend(self.rdns.iter().cloned());
        Self::from_rdns(rdns)
    }

    /// Returns `true` when `base` equals this name or is one of its ancestors.
    #[must_use]
    pub fn is_within(&self, base: &Self) -> bool {
        base.len() <= self.len()
            && self
                .rdns
                .iter()
                .rev()
                .zip(base.rdns.iter().rev())
                .all(|(ours, theirs)| ours == theirs)
    }

    /// Returns `true` when `ancestor` is a strict ancestor of this name.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self.len() > ancestor.len() && self.is_within(ancestor)
    }

    /// Returns `true` when this name sits directly below `parent`.
    #[must_use]
    pub fn is_child_of(&self, parent: &Self) -> bool {
        self.len() == parent.len() + 1 && self.is_within(parent)
    }

    /// Trims `base` from the root side, leaving the relative part.
    #[must_use]
    pub fn relative_to(&self, base: &Self) -> Option<Self> {
        if !self.is_within(base) {
            return None;
        }
        self.rdns
            .get(..self.len() - base.len())
            .map(|relative| Self::from_rdns(relative.to_vec()))
    }

    /// Moves this name from below `old_base` to below `new_base`.
    #[must_use]
    pub fn rebase(&self, old_base: &Self, new_base: &Self) -> Option<Self> {
        self.relative_to(old_base)
            .map(|relative| new_base.concat(&relative))
    }

    /// Normalized renderings of this name and each of its ancestors, longest
    /// first. The root is not included.
    pub fn normalized_ancestors(&self) -> impl Iterator<Item = &str> + '_ {
        self.offsets
            .iter()
            .filter_map(|offset| self.normalized.get(*offset..))
    }

    /// This name and each of its non-root ancestors, longest first.
    pub fn ancestors(&self) -> impl Iterator<Item = Self> + '_ {
        (0..self.len()).filter_map(|start| {
            self.rdns
                .get(start..)
                .map(|rest| Self::from_rdns(rest.to_vec()))
        })
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.user)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("Name").field(&self.user).finish()
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl TryFrom<String> for Name {
    type Error = NameError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::parse(&text)
    }
}

impl TryFrom<&str> for Name {
    type Error = NameError;

    fn try_from(text: &str) -> Result<Self, Self::Error> {
        Self::parse(text)
    }
}

/// Serialized form of a [`Name`]. Names whose normalized types are the
/// lowercased user types are plain strings; others carry their normalized
/// types per RDN so they round-trip unchanged.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NameRepr {
    Text(String),
    Canonical { name: String, types: Vec<Vec<String>> },
}

impl From<Name> for NameRepr {
    fn from(name: Name) -> Self {
        if name.rdns.iter().all(Rdn::has_plain_types) {
            Self::Text(name.user)
        } else {
            let types = name.rdns.iter().map(Rdn::normalized_types).collect();
            Self::Canonical {
                name: name.user,
                types,
            }
        }
    }
}

impl TryFrom<NameRepr> for Name {
    type Error = NameError;

    fn try_from(repr: NameRepr) -> Result<Self, Self::Error> {
        match repr {
            NameRepr::Text(text) => Self::parse(&text),
            NameRepr::Canonical { name, types } => {
                let parsed = Self::parse(&name)?;
                if types.len() != parsed.len() {
                    return Err(NameError::mismatched_types(name));
                }
                parsed
                    .rdns
                    .iter()
                    .zip(&types)
                    .map(|(rdn, rdn_types)| rdn.with_normalized_types(rdn_types))
                    .collect::<Option<Vec<_>>>()
                    .map(Self::from_rdns)
                    .ok_or_else(|| NameError::mismatched_types(name))
            }
        }
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.user
    }
}
