use std::collections::BTreeMap;

use crate::server::{InterceptorConfig, PartitionConfig};

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Identifier of the administrative partition.
pub const DEFAULT_SYSTEM_PARTITION_ID: &str = "system";

/// Suffix of the administrative partition.
pub const DEFAULT_SYSTEM_SUFFIX: &str = "ou=system";

/// Principal allowed to write below the protected suffix.
pub const DEFAULT_ADMIN_PRINCIPAL: &str = "uid=admin,ou=system";

/// Subtree that only the administrator may modify.
pub const DEFAULT_PROTECTED_SUFFIX: &str = "ou=system";

/// Owned log filter value used by serde.
pub(crate) fn log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

pub(crate) fn admin_principal() -> String {
    DEFAULT_ADMIN_PRINCIPAL.to_owned()
}

pub(crate) fn protected_suffix() -> String {
    DEFAULT_PROTECTED_SUFFIX.to_owned()
}

pub(crate) fn partition_kind() -> String {
    "memory".to_owned()
}

/// The administrative partition mounted when no partitions are configured.
#[must_use]
pub fn default_partitions() -> Vec<PartitionConfig> {
    let mut context_entry = BTreeMap::new();
    context_entry.insert(
        "objectClass".to_owned(),
        vec!["top".to_owned(), "organizationalUnit".to_owned()],
    );
    context_entry.insert("ou".to_owned(), vec!["system".to_owned()]);
    vec![PartitionConfig {
        id: DEFAULT_SYSTEM_PARTITION_ID.to_owned(),
        suffix: DEFAULT_SYSTEM_SUFFIX.to_owned(),
        kind: partition_kind(),
        indexed_attributes: vec!["objectClass".to_owned(), "ou".to_owned(), "uid".to_owned()],
        context_entry,
    }]
}

/// The standard pipeline order. Each stage is named after its kind.
#[must_use]
pub fn default_interceptors() -> Vec<InterceptorConfig> {
    [
        "normalization",
        "authentication",
        "authorization",
        "exception",
        "operational",
        "schema",
        "event",
    ]
    .into_iter()
    .map(|kind| InterceptorConfig::new(kind, kind))
    .collect()
}
