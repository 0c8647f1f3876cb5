//! Test suites for the directory core.

mod chain;
mod support;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use arbor_config::{PartitionConfig, ServerConfig};
use arbor_name::{Name, Rdn};
use arbor_partition::{
    Attributes, EntryStream, Filter, MemoryPartition, Partition, SearchControls, StaticSchema,
};
use rstest::{fixture, rstest};

use crate::{
    DirectoryError, DirectoryService, Operation, OperationContext, OperationResult,
    PartitionNexus, Principal, ServiceComponents,
};
use support::FixedClock;

pub(super) fn name(text: &str) -> Name {
    Name::parse(text).expect("valid name")
}

pub(super) fn unit(ou: &str) -> Attributes {
    Attributes::new()
        .with("objectClass", ["top", "organizationalUnit"])
        .with("ou", [ou])
}

pub(super) fn person(cn: &str, sn: &str) -> Attributes {
    Attributes::new()
        .with("objectClass", ["top", "person"])
        .with("cn", [cn])
        .with("sn", [sn])
}

pub(super) fn mounted(id: &str, suffix: &str) -> Arc<dyn Partition> {
    let partition = MemoryPartition::new(
        id,
        name(suffix),
        &["objectClass".to_owned(), "cn".to_owned()],
        Arc::new(StaticSchema::core()),
    );
    partition
        .initialize(Attributes::new().with("objectClass", ["top", "organizationalUnit"]))
        .expect("context entry");
    Arc::new(partition)
}

pub(super) fn nexus_with(partitions: &[(&str, &str)]) -> PartitionNexus {
    let nexus = PartitionNexus::new();
    for (id, suffix) in partitions {
        nexus.register(mounted(id, suffix)).expect("register");
    }
    nexus
}

pub(super) fn names(entries: EntryStream) -> Vec<String> {
    entries
        .map(|entry| entry.expect("entry").name().to_string())
        .collect()
}

/// The default `ou=system` partition plus an open `ou=example` partition.
pub(super) fn example_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    let mut context_entry = BTreeMap::new();
    context_entry.insert(
        "objectClass".to_owned(),
        vec!["top".to_owned(), "organizationalUnit".to_owned()],
    );
    config.partitions.push(PartitionConfig {
        id: "example".to_owned(),
        suffix: "ou=example".to_owned(),
        kind: "memory".to_owned(),
        indexed_attributes: vec!["objectClass".to_owned(), "cn".to_owned()],
        context_entry,
    });
    config
}

pub(super) fn components() -> ServiceComponents {
    ServiceComponents {
        clock: Arc::new(FixedClock),
        ..ServiceComponents::default()
    }
}

pub(super) fn service_with(config: &ServerConfig) -> DirectoryService {
    DirectoryService::from_config(config, &components()).expect("service assembles")
}

#[fixture]
pub(super) fn service() -> DirectoryService {
    service_with(&example_config())
}

pub(super) fn admin() -> Principal {
    Principal::Authenticated(name("uid=admin,ou=system"))
}

pub(super) fn alice() -> Principal {
    Principal::Authenticated(name("cn=alice,ou=example"))
}

fn partition_id(nexus: &PartitionNexus, dn: &str) -> String {
    nexus.resolve(&name(dn)).expect("resolves").id().to_owned()
}

#[rstest]
#[case("cn=x,ou=accounts,ou=system", "accounts")]
#[case("ou=accounts,ou=system", "accounts")]
#[case("cn=x,ou=other,ou=system", "system")]
#[case("ou=system", "system")]
#[case("cn=deep,ou=a,ou=b,ou=accounts,ou=system", "accounts")]
fn resolve_prefers_the_longest_suffix(#[case] dn: &str, #[case] expected: &str) {
    let nexus = nexus_with(&[("system", "ou=system"), ("accounts", "ou=accounts,ou=system")]);
    assert_eq!(partition_id(&nexus, dn), expected);
}

#[test]
fn resolve_ignores_registration_order() {
    let nexus = nexus_with(&[("accounts", "ou=accounts,ou=system"), ("system", "ou=system")]);
    assert_eq!(partition_id(&nexus, "cn=x,ou=accounts,ou=system"), "accounts");
    assert_eq!(partition_id(&nexus, "cn=x,ou=other,ou=system"), "system");
}

#[test]
fn resolve_succeeds_once_a_covering_suffix_is_registered() {
    let nexus = nexus_with(&[("system", "ou=system")]);
    let target = name("cn=x,ou=example");
    assert!(matches!(
        nexus.resolve(&target),
        Err(DirectoryError::NameNotFound { .. })
    ));
    nexus.register(mounted("example", "ou=example")).expect("register");
    assert_eq!(nexus.resolve(&target).expect("resolves").id(), "example");
}

#[test]
fn resolve_matches_names_case_insensitively() {
    let nexus = nexus_with(&[("system", "ou=System")]);
    assert_eq!(partition_id(&nexus, "CN=Someone, OU=SYSTEM"), "system");
}

#[test]
fn duplicate_suffix_is_rejected() {
    let nexus = nexus_with(&[("system", "ou=system")]);
    let error = nexus
        .register(mounted("other", "OU=System"))
        .expect_err("suffix taken");
    assert!(matches!(error, DirectoryError::DuplicateSuffix { .. }));
    assert_eq!(nexus.list_suffixes().expect("suffixes").len(), 1);
}

#[test]
fn duplicate_partition_id_is_rejected() {
    let nexus = nexus_with(&[("system", "ou=system")]);
    let error = nexus
        .register(mounted("system", "ou=example"))
        .expect_err("id taken");
    assert!(matches!(error, DirectoryError::DuplicatePartitionId { .. }));
}

#[test]
fn unregister_removes_the_route() {
    let nexus = nexus_with(&[("system", "ou=system"), ("accounts", "ou=accounts,ou=system")]);
    let removed = nexus
        .unregister(&name("ou=accounts,ou=system"))
        .expect("unregister")
        .expect("was mounted");
    assert_eq!(removed.id(), "accounts");
    assert_eq!(partition_id(&nexus, "cn=x,ou=accounts,ou=system"), "system");
    assert!(
        nexus
            .unregister(&name("ou=accounts,ou=system"))
            .expect("unregister")
            .is_none()
    );
}

#[test]
fn suffixes_are_listed_and_recognised() {
    let nexus = nexus_with(&[("system", "ou=system"), ("example", "ou=example")]);
    let suffixes: Vec<String> = nexus
        .list_suffixes()
        .expect("suffixes")
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(suffixes, ["ou=example", "ou=system"]);
    assert!(nexus.is_suffix(&name("OU=Example")).expect("is_suffix"));
    assert!(!nexus.is_suffix(&name("ou=people,ou=example")).expect("is_suffix"));
    assert_eq!(
        nexus
            .suffix_of(&name("cn=x,ou=people,OU=Example"))
            .expect("suffix")
            .to_string(),
        "ou=example"
    );
}

#[test]
fn root_operations_are_unsupported() {
    let nexus = nexus_with(&[("system", "ou=system")]);
    assert!(matches!(
        nexus.lookup(&Name::root()),
        Err(DirectoryError::Unsupported { .. })
    ));
}

#[test]
fn has_entry_outside_every_partition_is_false() {
    let nexus = nexus_with(&[("system", "ou=system")]);
    assert!(!nexus.has_entry(&name("cn=x,ou=elsewhere")).expect("has_entry"));
}

#[test]
fn moves_across_partitions_are_unsupported() {
    let nexus = nexus_with(&[("system", "ou=system"), ("example", "ou=example")]);
    nexus
        .add(&name("cn=test,ou=system"), person("test", "tester"))
        .expect("add");
    let error = nexus
        .move_to(&name("cn=test,ou=system"), &name("ou=example"))
        .expect_err("cross-partition move");
    assert!(matches!(error, DirectoryError::Unsupported { .. }));
    assert!(nexus.has_entry(&name("cn=test,ou=system")).expect("has_entry"));
}

#[test]
fn moves_onto_a_nested_suffix_are_unsupported() {
    let nexus = nexus_with(&[("system", "ou=system"), ("accounts", "ou=accounts,ou=system")]);
    nexus
        .add(&name("ou=other,ou=system"), unit("other"))
        .expect("add");
    let stray = name("ou=accounts,ou=other,ou=system");
    nexus.add(&stray, unit("accounts")).expect("add");

    let error = nexus
        .move_to(&stray, &name("ou=system"))
        .expect_err("destination is another partition's suffix");

    assert!(matches!(error, DirectoryError::Unsupported { .. }));
    assert!(nexus.has_entry(&stray).expect("has_entry"));
    let system = nexus.resolve(&name("ou=system")).expect("resolves");
    assert!(
        system
            .lookup(&name("ou=accounts,ou=system"))
            .expect("lookup")
            .is_none()
    );
    assert_eq!(partition_id(&nexus, "ou=accounts,ou=system"), "accounts");
}

#[rstest]
#[case::covering_source("ou=a,ou=system", "ou=b,ou=system", None)]
#[case::covering_destination("ou=b,ou=system", "ou=system", Some("c"))]
#[case::landing_on_suffix("ou=b,ou=system", "ou=a,ou=system", Some("nested"))]
fn relocations_may_not_straddle_a_nested_suffix(
    #[case] source: &str,
    #[case] new_parent: &str,
    #[case] new_rdn: Option<&str>,
) {
    let nexus = nexus_with(&[
        ("system", "ou=system"),
        ("nested", "ou=nested,ou=a,ou=system"),
        ("deep", "ou=deep,ou=c,ou=system"),
    ]);
    nexus.add(&name("ou=a,ou=system"), unit("a")).expect("add");
    nexus.add(&name("ou=b,ou=system"), unit("b")).expect("add");
    let source = name(source);

    let result = match new_rdn {
        Some(value) => nexus.move_and_rename(
            &source,
            &name(new_parent),
            &Rdn::new("ou", value).expect("rdn"),
            true,
        ),
        None => nexus.move_to(&source, &name(new_parent)),
    };

    assert!(matches!(result, Err(DirectoryError::Unsupported { .. })));
    assert!(nexus.has_entry(&source).expect("has_entry"));
    assert_eq!(partition_id(&nexus, "cn=x,ou=nested,ou=a,ou=system"), "nested");
    assert_eq!(partition_id(&nexus, "cn=x,ou=deep,ou=c,ou=system"), "deep");
}

#[test]
fn resolution_stays_consistent_while_partitions_come_and_go() {
    let nexus = nexus_with(&[("system", "ou=system")]);
    let accounts = mounted("accounts", "ou=accounts,ou=system");
    let target = name("cn=x,ou=accounts,ou=system");
    let suffix = name("ou=accounts,ou=system");

    thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..200 {
                nexus.register(Arc::clone(&accounts)).expect("register");
                nexus.unregister(&suffix).expect("unregister");
            }
        });
        for _ in 0..2 {
            scope.spawn(|| {
                for _ in 0..500 {
                    let owner = nexus.resolve(&target).expect("always covered");
                    assert!(
                        matches!(owner.id(), "system" | "accounts"),
                        "unexpected owner {}",
                        owner.id()
                    );
                    let suffixes = nexus.list_suffixes().expect("suffixes");
                    assert!(matches!(suffixes.len(), 1 | 2));
                }
            });
        }
    });

    assert_eq!(partition_id(&nexus, "cn=x,ou=accounts,ou=system"), "system");
    assert_eq!(nexus.list_suffixes().expect("suffixes").len(), 1);
}

#[test]
fn nexus_delegates_the_entry_lifecycle() {
    let nexus = nexus_with(&[("system", "ou=system")]);
    let dn = name("cn=test,ou=system");
    nexus.add(&dn, person("test", "tester")).expect("add");
    assert!(nexus.has_entry(&dn).expect("has_entry"));
    assert_eq!(
        names(nexus.list(&name("ou=system")).expect("list")),
        ["cn=test,ou=system"]
    );
    let renamed = nexus
        .modify_rn(&dn, &Rdn::new("cn", "renamed").expect("rdn"), true)
        .expect("rename");
    assert_eq!(renamed.to_string(), "cn=renamed,ou=system");
    nexus.delete(&renamed).expect("delete");
    assert!(!nexus.has_entry(&renamed).expect("has_entry"));
}

#[test]
fn nested_partitions_hold_their_own_entries() {
    let nexus = nexus_with(&[("system", "ou=system"), ("accounts", "ou=accounts,ou=system")]);
    nexus
        .add(&name("cn=x,ou=accounts,ou=system"), person("x", "nested"))
        .expect("add");
    let accounts = nexus.resolve(&name("ou=accounts,ou=system")).expect("resolves");
    let system = nexus.resolve(&name("ou=system")).expect("resolves");
    assert!(
        accounts
            .has_entry(&name("cn=x,ou=accounts,ou=system"))
            .expect("has_entry")
    );
    assert!(
        system
            .lookup(&name("cn=x,ou=accounts,ou=system"))
            .expect("lookup")
            .is_none()
    );
}

#[test]
fn execute_dispatches_on_the_operation() {
    let nexus = nexus_with(&[("system", "ou=system")]);
    let context = OperationContext::new(
        Principal::Anonymous,
        Operation::Search {
            name: name("ou=system"),
            filter: Filter::present("objectClass"),
            controls: SearchControls::default(),
        },
    );
    let result = nexus.execute(&context).expect("search");
    let OperationResult::Entries(entries) = result else {
        panic!("expected entries, got {result:?}");
    };
    assert_eq!(names(entries), ["ou=system"]);
}
