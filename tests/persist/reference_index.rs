//! Integration tests for reference tracking through the storage manager
//!
//! Tests re-staging semantics, destroy notification ordering, and the
//! garbage-collection invariant under random operation sequences.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use worldkeep_foundation::{EntityId, PartitionKey, Value};
use worldkeep_persist::{MemoryBlobStore, SaveConfig, StorageManager};
use worldkeep_storage::{EntityRecord, EntityStore};

use crate::e;

fn memory_manager() -> StorageManager<MemoryBlobStore> {
    StorageManager::with_blobs(SaveConfig::new("save"), MemoryBlobStore::new())
}

fn stage_player(manager: &mut StorageManager<MemoryBlobStore>, player: &str, refs: &[EntityId]) {
    let mut store = manager.create_player_store_for_save(player);
    let list = refs.iter().map(|&id| Value::from(id)).collect();
    store.add_entity(EntityRecord::new(e(1_000)).with_field("bag", "items", Value::List(list)));
    manager.store_player(store).unwrap();
}

fn table_of(manager: &mut StorageManager<MemoryBlobStore>, player: &str) -> Option<Vec<EntityId>> {
    manager
        .reference_index()
        .reference_set(&PartitionKey::player(player))
        .map(|set| set.into_iter().collect())
}

// =============================================================================
// Re-staging
// =============================================================================

#[test]
fn restaging_replaces_reference_table() {
    let mut manager = memory_manager();
    stage_player(&mut manager, "alice", &[e(1), e(2)]);
    stage_player(&mut manager, "alice", &[e(3)]);

    assert_eq!(table_of(&mut manager, "alice"), Some(vec![e(3)]));
    assert!(manager.reference_index().holders(e(1)).next().is_none());
}

#[test]
fn restaging_without_external_references_retracts_table() {
    let mut manager = memory_manager();
    stage_player(&mut manager, "alice", &[e(1)]);
    stage_player(&mut manager, "alice", &[]);

    assert_eq!(table_of(&mut manager, "alice"), None);
    assert!(manager.reference_index().is_empty());
}

// =============================================================================
// Destroy Notifications
// =============================================================================

#[test]
fn destroying_last_reference_drops_table() {
    let mut manager = memory_manager();
    stage_player(&mut manager, "alice", &[e(42)]);
    stage_player(&mut manager, "bob", &[e(42), e(43)]);

    manager.on_entity_destroyed(e(42));

    assert_eq!(table_of(&mut manager, "alice"), None);
    assert_eq!(table_of(&mut manager, "bob"), Some(vec![e(43)]));
}

#[test]
fn runtime_destroy_is_applied_before_load() {
    let mut manager = memory_manager();
    let mut runtime = EntityStore::with_notifier(manager.destroy_notifier());
    let target = runtime.spawn();
    stage_player(&mut manager, "alice", &[target]);

    runtime.destroy(target).unwrap();

    let loaded = manager.load_player_store("alice").unwrap();
    assert!(loaded.valid_references().is_none());
}

#[test]
fn destroying_unreferenced_entity_changes_nothing() {
    let mut manager = memory_manager();
    stage_player(&mut manager, "alice", &[e(1)]);
    manager.on_entity_destroyed(e(99));
    assert_eq!(table_of(&mut manager, "alice"), Some(vec![e(1)]));
}

// =============================================================================
// Invariant
// =============================================================================

#[derive(Clone, Debug)]
enum Op {
    Stage(u8, Vec<u8>),
    Destroy(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4, prop::collection::vec(0u8..12, 0..5)).prop_map(|(p, refs)| Op::Stage(p, refs)),
        (0u8..12).prop_map(Op::Destroy),
    ]
}

proptest! {
    /// Every table equals the player's staged references minus destroyed
    /// entities, and empty tables never linger.
    #[test]
    fn tables_track_staged_minus_destroyed(ops in prop::collection::vec(op(), 1..40)) {
        let mut manager = memory_manager();
        let mut model: BTreeMap<String, BTreeSet<EntityId>> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Stage(p, refs) => {
                    let player = format!("p{p}");
                    let refs: Vec<EntityId> = refs.into_iter().map(|r| e(u64::from(r))).collect();
                    stage_player(&mut manager, &player, &refs);
                    model.insert(player, refs.into_iter().collect());
                }
                Op::Destroy(r) => {
                    let id = e(u64::from(r));
                    manager.on_entity_destroyed(id);
                    for set in model.values_mut() {
                        set.remove(&id);
                    }
                }
            }
        }

        for p in 0u8..4 {
            let player = format!("p{p}");
            let expected = model
                .get(&player)
                .filter(|set| !set.is_empty())
                .map(|set| set.iter().copied().collect::<Vec<_>>());
            prop_assert_eq!(table_of(&mut manager, &player), expected);
        }
        prop_assert!(manager.reference_index().is_consistent());
    }
}
