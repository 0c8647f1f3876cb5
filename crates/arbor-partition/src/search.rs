//! Filter evaluation over a partition's indices.

use std::collections::{BTreeMap, BTreeSet};

use arbor_name::{Name, normalize_attribute_type, normalize_value};
use tracing::debug;

use crate::entry::{Entry, EntryId};
use crate::error::PartitionError;
use crate::filter::{Filter, leaf_attribute};
use crate::index::IndexSet;
use crate::schema::{AttributeUsage, SchemaLookup};

const LOG_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::search");
const MAX_ALIAS_HOPS: usize = 32;

/// Opaque string settings passed alongside an operation.
pub type Environment = BTreeMap<String, String>;

/// How far below the base a search reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SearchScope {
    /// The base entry only.
    Base,
    /// Direct children of the base.
    OneLevel,
    /// The base and all its descendants.
    #[default]
    Subtree,
}

/// When aliases are followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AliasDerefMode {
    /// Aliases are returned as ordinary entries.
    Never,
    /// Aliases met below the base are replaced by their targets.
    InSearching,
    /// An alias base is replaced by its target.
    FindingBase,
    /// Both of the above.
    #[default]
    Always,
}

impl AliasDerefMode {
    /// Whether aliases inside the scope are followed.
    #[must_use]
    pub const fn in_searching(self) -> bool {
        matches!(self, Self::InSearching | Self::Always)
    }

    /// Whether an alias base is followed.
    #[must_use]
    pub const fn finding_base(self) -> bool {
        matches!(self, Self::FindingBase | Self::Always)
    }
}

/// Search parameters besides the base and filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchControls {
    /// Search scope.
    pub scope: SearchScope,
    /// Alias handling.
    pub deref_aliases: AliasDerefMode,
    /// Requested attribute types. Empty means all user attributes.
    pub attributes: Vec<String>,
    /// Return attribute types without values.
    pub types_only: bool,
    /// Upper bound on returned entries.
    pub size_limit: Option<usize>,
}

impl SearchControls {
    /// Controls with the given scope and defaults otherwise.
    #[must_use]
    pub fn with_scope(scope: SearchScope) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }

    /// Sets the requested attributes.
    #[must_use]
    pub fn requesting<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the alias handling.
    #[must_use]
    pub const fn dereferencing(mut self, mode: AliasDerefMode) -> Self {
        self.deref_aliases = mode;
        self
    }

    /// Bounds the number of results.
    #[must_use]
    pub const fn limited_to(mut self, size_limit: usize) -> Self {
        self.size_limit = Some(size_limit);
        self
    }

    /// The attribute projection these controls ask for.
    #[must_use]
    pub fn projection(&self) -> Projection {
        Projection::requested(&self.attributes, self.types_only)
    }
}

/// Which attributes of an entry are returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    user: bool,
    operational: bool,
    named: BTreeSet<String>,
    types_only: bool,
}

impl Projection {
    /// Every attribute, user and operational.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            user: true,
            operational: true,
            named: BTreeSet::new(),
            types_only: false,
        }
    }

    /// Projection for a requested attribute list.
    ///
    /// An empty list or `*` selects user attributes, `+` selects operational
    /// ones and `1.1` alone selects nothing. Other entries name attribute
    /// types individually.
    #[must_use]
    pub fn requested(attributes: &[String], types_only: bool) -> Self {
        let mut projection = Self {
            user: attributes.is_empty(),
            operational: false,
            named: BTreeSet::new(),
            types_only,
        };
        for requested in attributes {
            match requested.trim() {
                "*" => projection.user = true,
                "+" => projection.operational = true,
                "1.1" => {}
                other => {
                    projection.named.insert(normalize_attribute_type(other));
                }
            }
        }
        projection
    }

    /// Returns `true` when `attribute` survives this projection.
    #[must_use]
    pub fn includes(&self, attribute: &str, schema: &dyn SchemaLookup) -> bool {
        let normalized = normalize_attribute_type(attribute);
        if self.named.contains(&normalized) {
            return true;
        }
        let canonical = schema
            .canonical_attribute(attribute)
            .map(|canonical| normalize_attribute_type(&canonical));
        if canonical.is_some_and(|name| self.named.contains(&name)) {
            return true;
        }
        match schema.attribute_usage(attribute) {
            AttributeUsage::User => self.user,
            AttributeUsage::Operational => self.operational,
        }
    }

    /// Applies the projection to `entry`.
    #[must_use]
    pub fn apply(&self, mut entry: Entry, schema: &dyn SchemaLookup) -> Entry {
        entry
            .attributes_mut()
            .retain(|attribute| self.includes(attribute.id(), schema));
        if self.types_only {
            for attribute in entry.attributes_mut().iter_mut() {
                attribute.clear();
            }
        }
        entry
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::all()
    }
}

/// Source of stored entries for scans.
pub type EntryLoader<'a> = dyn Fn(EntryId) -> Result<Option<Entry>, PartitionError> + 'a;

/// Evaluates filters against one partition's indices.
///
/// The engine only computes the candidate identifiers. Callers resolve them
/// to entries, which lets results be produced lazily.
pub struct SearchEngine<'a> {
    indices: &'a IndexSet,
    loader: &'a EntryLoader<'a>,
}

impl<'a> SearchEngine<'a> {
    /// Creates an engine over `indices`, loading entries through `loader`
    /// when a filter leaf has no index.
    #[must_use]
    pub fn new(indices: &'a IndexSet, loader: &'a EntryLoader<'a>) -> Self {
        Self { indices, loader }
    }

    /// Identifiers of the entries matching `filter` below `base`, in id
    /// order and truncated to the size limit.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::InvalidFilter`] for a malformed filter,
    /// [`PartitionError::NameNotFound`] when the base (or the target of an
    /// alias base) does not exist, and store errors from scans.
    pub fn candidates(
        &self,
        base: &Name,
        filter: &Filter,
        controls: &SearchControls,
    ) -> Result<Vec<EntryId>, PartitionError> {
        filter.validate()?;
        let named_base = self
            .indices
            .id_of(base)
            .ok_or_else(|| PartitionError::name_not_found(base))?;
        let base_id = if controls.deref_aliases.finding_base() {
            self.dereference(named_base)?
        } else {
            named_base
        };
        let scope = self.scope(base_id, controls);
        let matched = self.evaluate(filter, &scope)?;
        debug!(
            target: LOG_TARGET,
            base = %base,
            %filter,
            scope = scope.len(),
            matched = matched.len(),
            "evaluated search filter"
        );
        let limit = controls.size_limit.unwrap_or(usize::MAX);
        Ok(matched.into_iter().take(limit).collect())
    }

    fn dereference(&self, start: EntryId) -> Result<EntryId, PartitionError> {
        let mut current = start;
        for _ in 0..MAX_ALIAS_HOPS {
            let Some(target) = self.indices.alias_target(current) else {
                return Ok(current);
            };
            current = self
                .indices
                .id_of(target)
                .ok_or_else(|| PartitionError::name_not_found(target))?;
        }
        Err(PartitionError::unsupported(format!(
            "alias chain starting at {start} exceeds {MAX_ALIAS_HOPS} hops"
        )))
    }

    fn scope(&self, base_id: EntryId, controls: &SearchControls) -> BTreeSet<EntryId> {
        let hierarchy = self.indices.hierarchy();
        let mut scope = BTreeSet::new();
        match controls.scope {
            SearchScope::Base => {
                scope.insert(base_id);
                return scope;
            }
            SearchScope::OneLevel => scope.extend(hierarchy.children(base_id)),
            SearchScope::Subtree => {
                scope.insert(base_id);
                scope.extend(hierarchy.descendants(base_id));
            }
        }
        if controls.deref_aliases.in_searching() {
            self.expand_aliases(base_id, controls.scope, &mut scope);
        }
        scope
    }

    fn aliases_below(&self, root: EntryId, scope: SearchScope) -> BTreeSet<EntryId> {
        match scope {
            SearchScope::Base => BTreeSet::new(),
            SearchScope::OneLevel => self.indices.one_level_aliases(root),
            SearchScope::Subtree => {
                let mut found = self.indices.subtree_aliases(root);
                if self.indices.alias_target(root).is_some() {
                    found.insert(root);
                }
                found
            }
        }
    }

    /// Replaces aliases in `scope` with their targets. Under subtree scope
    /// the target's whole subtree joins, and aliases found there are
    /// followed in turn.
    fn expand_aliases(&self, base_id: EntryId, kind: SearchScope, scope: &mut BTreeSet<EntryId>) {
        let mut pending: Vec<EntryId> = self.aliases_below(base_id, kind).into_iter().collect();
        let mut visited = BTreeSet::new();
        while let Some(alias) = pending.pop() {
            if !visited.insert(alias) {
                continue;
            }
            let Some(target_name) = self.indices.alias_target(alias) else {
                continue;
            };
            let Some(target) = self.indices.id_of(target_name) else {
                debug!(target: LOG_TARGET, alias = %alias, target = %target_name, "dangling alias skipped");
                continue;
            };
            scope.insert(target);
            match kind {
                SearchScope::Subtree => {
                    scope.extend(self.indices.hierarchy().descendants(target));
                    pending.extend(self.aliases_below(target, kind));
                }
                SearchScope::OneLevel | SearchScope::Base => {
                    if self.indices.alias_target(target).is_some() {
                        pending.push(target);
                    }
                }
            }
        }
        scope.retain(|id| self.indices.alias_target(*id).is_none());
    }

    fn evaluate(
        &self,
        filter: &Filter,
        scope: &BTreeSet<EntryId>,
    ) -> Result<BTreeSet<EntryId>, PartitionError> {
        match filter {
            Filter::And(filters) => {
                let mut remaining = scope.clone();
                for inner in filters {
                    if remaining.is_empty() {
                        break;
                    }
                    remaining = self.evaluate(inner, &remaining)?;
                }
                Ok(remaining)
            }
            Filter::Or(filters) => {
                let mut union = BTreeSet::new();
                for inner in filters {
                    union.extend(self.evaluate(inner, scope)?);
                }
                Ok(union)
            }
            Filter::Not(inner) => {
                let excluded = self.evaluate(inner, scope)?;
                Ok(scope.difference(&excluded).copied().collect())
            }
            Filter::Present { attribute } => {
                Ok(intersect(&self.indices.with_attribute(attribute), scope))
            }
            leaf => self.evaluate_leaf(leaf, scope),
        }
    }

    fn evaluate_leaf(
        &self,
        leaf: &Filter,
        scope: &BTreeSet<EntryId>,
    ) -> Result<BTreeSet<EntryId>, PartitionError> {
        let index = leaf_attribute(leaf).and_then(|attribute| self.indices.user_index(&attribute));
        if let Some(values) = index {
            let hits = match leaf {
                Filter::Equality { value, .. } => values.get(&normalize_value(value)),
                _ => values.matching(|key| leaf.matches_value(key)),
            };
            return Ok(intersect(&hits, scope));
        }
        let mut hits = BTreeSet::new();
        for id in scope {
            if let Some(entry) = (self.loader)(*id)?
                && leaf.matches(entry.attributes())
            {
                hits.insert(*id);
            }
        }
        Ok(hits)
    }
}

fn intersect(left: &BTreeSet<EntryId>, right: &BTreeSet<EntryId>) -> BTreeSet<EntryId> {
    let (small, large) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    small.iter().filter(|id| large.contains(id)).copied().collect()
}
