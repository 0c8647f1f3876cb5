//! Unit tests for partitions, indices and the search engine.


use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::thread;

use arbor_name::{Name, Rdn};
use mockall::mock;
use rstest::{fixture, rstest};

use crate::{
    Attribute, Attributes, EntryId, EntryStore, Environment, Filter, MemoryEntryStore,
    MemoryPartition, ModOp, Modification, Partition, PartitionError, Relocation, SearchControls,
    StaticSchema, StoreError, StoreOp,
};

pub(super) fn name(text: &str) -> Name {
    Name::parse(text).expect("valid name")
}

pub(super) fn indexed() -> Vec<String> {
    ["objectClass", "cn", "uid", "employeeNumber"]
        .into_iter()
        .map(str::to_owned)
        .collect()
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

pub(super) fn system_partition() -> MemoryPartition {
    let partition = MemoryPartition::new(
        "system",
        name("ou=system"),
        &indexed(),
        Arc::new(StaticSchema::core()),
    );
    partition
        .initialize(Attributes::new().with("objectClass", ["top", "organizationalUnit"]))
        .expect("context entry");
    partition
}

#[fixture]
pub(super) fn partition() -> MemoryPartition {
    system_partition()
}

/// `ou=people` holding alice and bob, plus an empty `ou=groups`.
#[fixture]
pub(super) fn populated() -> MemoryPartition {
    let partition = system_partition();
    add(&partition, "ou=people,ou=system", unit("people"));
    add(
        &partition,
        "cn=alice,ou=people,ou=system",
        person("alice", "Smith").with("employeeNumber", ["10"]),
    );
    add(
        &partition,
        "cn=bob,ou=people,ou=system",
        person("bob", "Jones").with("employeeNumber", ["9"]),
    );
    add(&partition, "ou=groups,ou=system", unit("groups"));
    partition
}

pub(super) fn add(partition: &MemoryPartition, dn: &str, attributes: Attributes) -> EntryId {
    partition.add(&name(dn), attributes).expect("add succeeds")
}

pub(super) fn child_names(partition: &MemoryPartition, dn: &str) -> Vec<String> {
    partition
        .list(&name(dn))
        .expect("list")
        .map(|entry| entry.expect("entry").name().to_string())
        .collect()
}

/// Walks the tree from the suffix and checks every index agrees with it.
pub(super) fn assert_consistent(partition: &MemoryPartition) {
    let mut pending = vec![partition.suffix().clone()];
    let mut seen = 0;
    while let Some(current) = pending.pop() {
        let entry = partition
            .lookup(&current)
            .expect("lookup")
            .expect("listed entry exists");
        seen += 1;
        partition
            .with_indices(|indices| {
                assert_eq!(indices.id_of(entry.name()), Some(entry.id()));
                assert_eq!(
                    indices.user_name(entry.id()),
                    Some(entry.name().user_provided())
                );
                let types: BTreeSet<String> =
                    entry.attributes().types().map(str::to_owned).collect();
                assert_eq!(indices.attribute_types(entry.id()), types);
                if entry.name() != partition.suffix() {
                    let parent = entry.name().parent().expect("non-suffix has parent");
                    let parent_id = indices.id_of(&parent).expect("parent indexed");
                    assert_eq!(indices.hierarchy().parent(entry.id()), Some(parent_id));
                    assert!(indices.hierarchy().children(parent_id).contains(&entry.id()));
                }
            })
            .expect("indices readable");
        for child in partition.list(&current).expect("list") {
            pending.push(child.expect("child").name().clone());
        }
    }
    assert_eq!(partition.entry_count().expect("count"), seen);
}

#[rstest]
fn context_entry_is_created_once(partition: MemoryPartition) {
    let entry = partition
        .lookup(&name("ou=system"))
        .expect("lookup")
        .expect("context entry");
    assert!(entry.attributes().contains_value("ou", "system"));
    assert_eq!(entry.id(), EntryId::FIRST);
    let created = partition
        .initialize(Attributes::new())
        .expect("initialize again");
    assert!(!created);
    assert_eq!(partition.entry_count().expect("count"), 1);
}

#[rstest]
fn add_then_lookup_returns_equal_value_sets(partition: MemoryPartition) {
    let attributes = Attributes::new()
        .with("objectClass", ["top", "person"])
        .with("cn", ["test", "Tester"])
        .with("sn", ["tester"]);
    add(&partition, "cn=test,ou=system", attributes.clone());
    let entry = partition
        .lookup(&name("CN=Test, OU=System"))
        .expect("lookup")
        .expect("entry present");
    let reordered = Attributes::new()
        .with("sn", ["TESTER"])
        .with("cn", ["tester", "test"])
        .with("objectclass", ["person", "top"]);
    assert_eq!(entry.attributes(), &attributes);
    assert_eq!(entry.attributes(), &reordered);
    assert_eq!(entry.name().user_provided(), "cn=test,ou=system");
}

#[rstest]
fn has_entry_tracks_add_and_delete(partition: MemoryPartition) {
    let target = name("cn=test,ou=system");
    assert!(!partition.has_entry(&target).expect("has_entry"));
    partition
        .add(&target, person("test", "tester"))
        .expect("add");
    assert!(partition.has_entry(&target).expect("has_entry"));
    partition.delete(&target).expect("delete");
    assert!(!partition.has_entry(&target).expect("has_entry"));
    assert_consistent(&partition);
}

#[rstest]
fn add_requires_existing_parent(partition: MemoryPartition) {
    let error = partition
        .add(&name("cn=x,ou=missing,ou=system"), person("x", "x"))
        .expect_err("parent is missing");
    assert!(
        matches!(error, PartitionError::NameNotFound { ref name } if name == "ou=missing,ou=system")
    );
}

#[rstest]
fn add_rejects_existing_name(populated: MemoryPartition) {
    let error = populated
        .add(&name("CN=Alice,ou=people,ou=system"), person("alice", "a"))
        .expect_err("already present");
    assert!(matches!(error, PartitionError::EntryAlreadyExists { .. }));
}

#[rstest]
fn add_rejects_names_outside_suffix(partition: MemoryPartition) {
    let error = partition
        .add(&name("cn=x,dc=example"), person("x", "x"))
        .expect_err("outside suffix");
    assert!(matches!(error, PartitionError::OutsideSuffix { .. }));
}

#[rstest]
fn delete_of_container_leaves_state_unchanged(populated: MemoryPartition) {
    let before = populated.entry_count().expect("count");
    let error = populated
        .delete(&name("ou=people,ou=system"))
        .expect_err("has children");
    assert!(matches!(
        error,
        PartitionError::NonEmptyContainer { children: 2, .. }
    ));
    assert_eq!(populated.entry_count().expect("count"), before);
    assert_eq!(
        child_names(&populated, "ou=people,ou=system"),
        vec!["cn=alice,ou=people,ou=system", "cn=bob,ou=people,ou=system"]
    );
    assert_consistent(&populated);
}

#[rstest]
fn delete_of_missing_entry_fails(partition: MemoryPartition) {
    let error = partition
        .delete(&name("cn=ghost,ou=system"))
        .expect_err("missing");
    assert!(matches!(error, PartitionError::NameNotFound { .. }));
}

#[rstest]
fn list_returns_direct_children_only(populated: MemoryPartition) {
    assert_eq!(
        child_names(&populated, "ou=system"),
        vec!["ou=people,ou=system", "ou=groups,ou=system"]
    );
    assert!(child_names(&populated, "ou=groups,ou=system").is_empty());
}

#[rstest]
fn modifications_apply_in_order(populated: MemoryPartition) {
    let alice = name("cn=alice,ou=people,ou=system");
    populated
        .modify_many(
            &alice,
            &[
                Modification::add(Attribute::new("mail", ["alice@example.com"])),
                Modification::replace(Attribute::new("sn", ["Smythe"])),
                Modification::remove(Attribute::new("employeeNumber", Vec::<String>::new())),
            ],
        )
        .expect("modify");
    let entry = populated.lookup(&alice).expect("lookup").expect("present");
    assert_eq!(entry.attributes().values("mail"), ["alice@example.com"]);
    assert_eq!(entry.attributes().values("sn"), ["Smythe"]);
    assert!(!entry.attributes().contains("employeeNumber"));
    assert_consistent(&populated);
}

#[rstest]
fn failed_modification_changes_nothing(populated: MemoryPartition) {
    let alice = name("cn=alice,ou=people,ou=system");
    let before = populated.lookup(&alice).expect("lookup");
    let error = populated
        .modify_many(
            &alice,
            &[
                Modification::replace(Attribute::new("sn", ["Changed"])),
                Modification::remove(Attribute::new("mail", ["nobody@example.com"])),
            ],
        )
        .expect_err("mail is absent");
    assert!(
        matches!(error, PartitionError::NoSuchAttribute { ref attribute, .. } if attribute == "mail")
    );
    assert_eq!(populated.lookup(&alice).expect("lookup"), before);
}

#[rstest]
#[case::add(ModOp::Add, &["alice", "alicia"])]
#[case::replace(ModOp::Replace, &["alicia"])]
fn single_operation_modify_updates_value_index(
    populated: MemoryPartition,
    #[case] op: ModOp,
    #[case] expected: &[&str],
) {
    let alice = name("cn=alice,ou=people,ou=system");
    populated
        .modify(&alice, op, &Attributes::new().with("cn", ["alicia"]))
        .expect("modify");
    let entry = populated.lookup(&alice).expect("lookup").expect("present");
    assert_eq!(entry.attributes().values("cn"), expected);
    populated
        .with_indices(|indices| {
            let cn = indices.user_index("cn").expect("cn is indexed");
            assert!(cn.contains(&"alicia".to_owned(), entry.id()));
            assert_eq!(
                cn.contains(&"alice".to_owned(), entry.id()),
                op == ModOp::Add
            );
        })
        .expect("indices");
}

#[rstest]
#[case::delete_old(true, &["carol"])]
#[case::keep_old(false, &["alice", "carol"])]
fn rename_updates_naming_values(
    populated: MemoryPartition,
    #[case] delete_old: bool,
    #[case] expected: &[&str],
) {
    let alice = name("cn=alice,ou=people,ou=system");
    let id = populated
        .lookup(&alice)
        .expect("lookup")
        .expect("present")
        .id();
    let renamed = populated
        .modify_rn(&alice, &Rdn::new("cn", "carol").expect("rdn"), delete_old)
        .expect("rename");
    assert_eq!(renamed.to_string(), "cn=carol,ou=people,ou=system");
    assert!(!populated.has_entry(&alice).expect("has_entry"));
    let entry = populated.lookup(&renamed).expect("lookup").expect("present");
    assert_eq!(entry.id(), id);
    assert_eq!(entry.attributes().values("cn"), expected);
    assert_consistent(&populated);
}

#[rstest]
fn move_cascades_to_descendants(populated: MemoryPartition) {
    let archive = name("ou=archive,ou=system");
    populated.add(&archive, unit("archive")).expect("add archive");
    let bob_id = populated
        .lookup(&name("cn=bob,ou=people,ou=system"))
        .expect("lookup")
        .expect("present")
        .id();
    let moved = populated
        .move_to(&name("ou=people,ou=system"), &archive)
        .expect("move");
    assert_eq!(moved.to_string(), "ou=people,ou=archive,ou=system");
    let bob = populated
        .lookup(&name("cn=bob,ou=people,ou=archive,ou=system"))
        .expect("lookup")
        .expect("bob moved with his parent");
    assert_eq!(bob.id(), bob_id);
    assert!(
        !populated
            .has_entry(&name("cn=bob,ou=people,ou=system"))
            .expect("has_entry")
    );
    assert_consistent(&populated);
}

#[rstest]
fn move_and_rename_in_one_step(populated: MemoryPartition) {
    let moved = populated
        .move_and_rename(
            &name("cn=bob,ou=people,ou=system"),
            &name("ou=groups,ou=system"),
            &Rdn::new("cn", "robert").expect("rdn"),
            true,
        )
        .expect("move and rename");
    assert_eq!(moved.to_string(), "cn=robert,ou=groups,ou=system");
    let entry = populated.lookup(&moved).expect("lookup").expect("present");
    assert_eq!(entry.attributes().values("cn"), ["robert"]);
    assert_consistent(&populated);
}

#[rstest]
#[case::below_itself("ou=people,ou=system", "cn=alice,ou=people,ou=system")]
#[case::outside_partition("ou=people,ou=system", "dc=example,dc=com")]
#[case::context_entry("ou=system", "ou=groups,ou=system")]
fn unsupported_moves_are_refused(
    populated: MemoryPartition,
    #[case] source: &str,
    #[case] destination: &str,
) {
    let error = populated
        .move_to(&name(source), &name(destination))
        .expect_err("move is refused");
    assert!(matches!(error, PartitionError::Unsupported { .. }));
    assert_consistent(&populated);
}

#[rstest]
fn relocation_commits_its_modifications_with_the_move(populated: MemoryPartition) {
    let relocation = Relocation::move_to(name("ou=groups,ou=system")).with_modifications(vec![
        Modification::replace(Attribute::new("description", ["moved"])),
    ]);

    let moved = populated
        .relocate(&name("cn=bob,ou=people,ou=system"), &relocation)
        .expect("relocate");

    let entry = populated.lookup(&moved).expect("lookup").expect("present");
    assert_eq!(moved.to_string(), "cn=bob,ou=groups,ou=system");
    assert_eq!(entry.attributes().values("description"), ["moved"]);
    assert_consistent(&populated);
}

#[rstest]
fn failed_relocation_modification_leaves_the_entry_in_place(populated: MemoryPartition) {
    let bob = name("cn=bob,ou=people,ou=system");
    let relocation = Relocation::rename(&bob, Rdn::new("cn", "robert").expect("rdn"), true)
        .expect("relocation")
        .with_modifications(vec![Modification::remove(Attribute::new(
            "description",
            Vec::<String>::new(),
        ))]);

    let error = populated
        .relocate(&bob, &relocation)
        .expect_err("description is absent");

    assert!(matches!(error, PartitionError::NoSuchAttribute { .. }));
    assert!(populated.has_entry(&bob).expect("has_entry"));
    assert!(
        !populated
            .has_entry(&name("cn=robert,ou=people,ou=system"))
            .expect("has_entry")
    );
    assert_consistent(&populated);
}

#[rstest]
fn rename_onto_existing_name_fails(populated: MemoryPartition) {
    let error = populated
        .modify_rn(
            &name("cn=bob,ou=people,ou=system"),
            &Rdn::new("cn", "Alice").expect("rdn"),
            true,
        )
        .expect_err("occupied");
    assert!(matches!(error, PartitionError::EntryAlreadyExists { .. }));
}

#[rstest]
fn random_mutation_sequence_keeps_indices_consistent(populated: MemoryPartition) {
    add(&populated, "ou=staff,ou=people,ou=system", unit("staff"));
    add(
        &populated,
        "cn=carol,ou=staff,ou=people,ou=system",
        person("carol", "Carter"),
    );
    assert_consistent(&populated);
    populated
        .modify_rn(
            &name("ou=people,ou=system"),
            &Rdn::new("ou", "persons").expect("rdn"),
            false,
        )
        .expect("rename people");
    assert_consistent(&populated);
    populated
        .move_to(
            &name("ou=staff,ou=persons,ou=system"),
            &name("ou=groups,ou=system"),
        )
        .expect("move staff");
    assert_consistent(&populated);
    populated
        .delete(&name("cn=carol,ou=staff,ou=groups,ou=system"))
        .expect("delete carol");
    populated
        .modify(
            &name("cn=alice,ou=persons,ou=system"),
            ModOp::Remove,
            &Attributes::new().with("sn", ["smith"]),
        )
        .expect("remove sn");
    assert_consistent(&populated);
    assert_eq!(
        child_names(&populated, "ou=groups,ou=system"),
        vec!["ou=staff,ou=groups,ou=system"]
    );
}

#[derive(Clone, Default)]
struct SharedStore(Arc<Mutex<MemoryEntryStore>>);

impl EntryStore for SharedStore {
    fn get(&self, id: EntryId) -> Result<Option<Vec<u8>>, StoreError> {
        self.0.lock().expect("store lock").get(id)
    }

    fn ids(&self) -> Result<Vec<EntryId>, StoreError> {
        self.0.lock().expect("store lock").ids()
    }

    fn apply(&mut self, batch: Vec<StoreOp>) -> Result<(), StoreError> {
        self.0.lock().expect("store lock").apply(batch)
    }
}

#[test]
fn reopening_a_store_rebuilds_indices() {
    let store = SharedStore::default();
    let open = || {
        MemoryPartition::open(
            "system",
            name("ou=system"),
            &indexed(),
            Arc::new(StaticSchema::core()),
            Box::new(store.clone()),
        )
        .expect("open")
    };
    let first = open();
    first.initialize(unit("system")).expect("initialize");
    add(&first, "ou=people,ou=system", unit("people"));
    let alice_id = add(&first, "cn=alice,ou=people,ou=system", person("alice", "Smith"));

    let reopened = open();
    assert_eq!(reopened.entry_count().expect("count"), 3);
    assert_consistent(&reopened);
    reopened
        .with_indices(|indices| {
            let cn = indices.user_index("cn").expect("cn is indexed");
            assert!(cn.contains(&"alice".to_owned(), alice_id));
        })
        .expect("indices");
    let bob_id = add(&reopened, "cn=bob,ou=people,ou=system", person("bob", "Jones"));
    assert!(bob_id > alice_id);
}

const ROUNDS: usize = 40;

fn paired(value: &str) -> Vec<Modification> {
    vec![
        Modification::replace(Attribute::new("sn", [value])),
        Modification::replace(Attribute::new("description", [value])),
    ]
}

#[rstest]
fn concurrent_readers_never_see_half_applied_writes(populated: MemoryPartition) {
    let alice = name("cn=alice,ou=people,ou=system");
    populated
        .modify_many(&alice, &paired("start"))
        .expect("seed description");

    thread::scope(|scope| {
        for writer in 0..3 {
            let partition = &populated;
            scope.spawn(move || {
                let team = format!("ou=team{writer},ou=system");
                add(partition, &team, unit(&format!("team{writer}")));
                for round in 0..ROUNDS {
                    add(
                        partition,
                        &format!("cn=member{round},{team}"),
                        person(&format!("member{round}"), "Member"),
                    );
                }
            });
        }
        scope.spawn(|| {
            for round in 0..ROUNDS {
                populated
                    .modify_many(&alice, &paired(&format!("v{round}")))
                    .expect("modify alice");
            }
        });
        for _ in 0..2 {
            scope.spawn(|| {
                for _ in 0..ROUNDS {
                    assert!(populated.has_entry(&alice).expect("has_entry"));
                    let entry = populated
                        .lookup(&alice)
                        .expect("lookup")
                        .expect("alice present");
                    assert_eq!(
                        entry.attributes().values("sn"),
                        entry.attributes().values("description")
                    );
                }
            });
        }
    });

    assert_eq!(populated.entry_count().expect("count"), 5 + 3 * (ROUNDS + 1));
    assert_eq!(child_names(&populated, "ou=team0,ou=system").len(), ROUNDS);
    assert_consistent(&populated);
}

#[rstest]
fn concurrent_moves_keep_subtrees_whole(populated: MemoryPartition) {
    add(&populated, "ou=archive,ou=system", unit("archive"));
    let people = name("ou=people,ou=system");
    let archived = name("ou=people,ou=archive,ou=system");

    thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..ROUNDS {
                populated
                    .move_to(&people, &name("ou=archive,ou=system"))
                    .expect("archive people");
                populated
                    .move_to(&archived, &name("ou=system"))
                    .expect("restore people");
            }
        });
        scope.spawn(|| {
            for _ in 0..ROUNDS {
                let found = populated
                    .search(
                        &name("ou=system"),
                        &Environment::new(),
                        &Filter::equality("objectClass", "person"),
                        &SearchControls::default(),
                    )
                    .expect("search")
                    .map(|entry| entry.expect("entry").name().parent().expect("parent"))
                    .collect::<Vec<_>>();
                assert_eq!(found.len(), 2);
                assert!(found.windows(2).all(|pair| pair.first() == pair.last()));
            }
        });
    });

    assert!(populated.has_entry(&people).expect("has_entry"));
    assert_consistent(&populated);
}

mock! {
    Store {}

    impl EntryStore for Store {
        fn get(&self, id: EntryId) -> Result<Option<Vec<u8>>, StoreError>;
        fn ids(&self) -> Result<Vec<EntryId>, StoreError>;
        fn apply(&mut self, batch: Vec<StoreOp>) -> Result<(), StoreError>;
    }
}

#[test]
fn store_failure_leaves_indices_untouched() {
    let mut store = MockStore::new();
    store.expect_ids().returning(|| Ok(Vec::new()));
    store
        .expect_apply()
        .times(1)
        .returning(|_| Err(StoreError::backend("disk full")));
    let partition = MemoryPartition::open(
        "broken",
        name("ou=broken"),
        &[],
        Arc::new(StaticSchema::core()),
        Box::new(store),
    )
    .expect("open empty store");

    let error = partition
        .add(&name("ou=broken"), unit("broken"))
        .expect_err("store rejects the write");
    assert!(matches!(error, PartitionError::Store(StoreError::Backend { .. })));
    assert!(!partition.has_entry(&name("ou=broken")).expect("has_entry"));
    assert_eq!(partition.entry_count().expect("count"), 0);
}

#[test]
fn attribute_values_compare_as_case_insensitive_sets() {
    let mut attribute = Attribute::new("cn", ["Alice", "alice", "ALICE ", "Bob"]);
    assert_eq!(attribute.values(), ["Alice", "Bob"]);
    assert!(!attribute.add("bob"));
    assert!(attribute.remove("BOB"));
    assert_eq!(attribute, Attribute::new("CN", ["alice"]));
}

#[test]
fn remove_value_drops_empty_attribute() {
    let mut attributes = Attributes::new().with("mail", ["a@example.com"]);
    assert!(attributes.remove_value("MAIL", "A@example.com"));
    assert!(!attributes.contains("mail"));
    assert!(!attributes.remove_value("mail", "a@example.com"));
}
