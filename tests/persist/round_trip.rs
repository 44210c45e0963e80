//! Integration tests for save and load round trips
//!
//! Tests staging, flushing, and restoring partitions across a restart.

use worldkeep_foundation::{ChunkPos, PartitionKey, Value};
use worldkeep_persist::codec::from_bytes;
use worldkeep_persist::{ChunkPersistence, GlobalSnapshot, SaveConfig, StorageManager};
use worldkeep_storage::{EntityRuntime, EntityStore};

use crate::{e, open_save, reopen};

// =============================================================================
// Player Round Trip
// =============================================================================

#[test]
fn player_round_trip_preserves_external_references() {
    let (dir, mut manager, mut runtime) = open_save();
    let guild = runtime.spawn();
    let sword = runtime.spawn();
    let avatar = runtime.spawn();
    runtime.set(avatar, "member", "guild", guild).unwrap();
    runtime.set(avatar, "hand", "holds", sword).unwrap();

    let mut store = manager.create_player_store_for_save("alice");
    store.unload_from(&mut runtime, avatar).unwrap();
    store.set_character(avatar);
    manager.store_player(store).unwrap();

    let report = manager.flush(&runtime).unwrap();
    assert_eq!(report.players_written, 1);
    assert_eq!(report.global_entities, 2);
    assert_eq!(report.ref_tables, 1);

    let (mut manager, mut runtime) = reopen(&dir);
    manager.load_global_entities(&mut runtime).unwrap();
    assert!(runtime.exists(guild));
    assert!(runtime.exists(sword));

    let loaded = manager.load_player_store("alice").unwrap();
    assert_eq!(loaded.character(), Some(avatar));
    let valid: Vec<_> = loaded.valid_references().unwrap().iter().copied().collect();
    assert_eq!(valid, vec![guild, sword]);

    let restored = loaded.restore(&mut runtime, manager.codec()).unwrap();
    assert_eq!(restored.restored, vec![avatar]);
    assert_eq!(restored.broken_references, 0);
    let record = runtime.get(avatar).unwrap();
    assert_eq!(record.get("hand", "holds"), Some(&Value::from(sword)));
}

#[test]
fn ids_are_not_reused_after_restart() {
    let (dir, mut manager, mut runtime) = open_save();
    let kept = runtime.spawn();
    let gone = runtime.spawn();
    let stored = runtime.spawn();
    runtime.destroy(gone).unwrap();

    let mut store = manager.create_player_store_for_save("alice");
    store.unload_from(&mut runtime, stored).unwrap();
    manager.store_player(store).unwrap();
    manager.flush(&runtime).unwrap();

    let (mut manager, mut runtime) = reopen(&dir);
    manager.load_global_entities(&mut runtime).unwrap();
    assert!(runtime.exists(kept));
    assert_eq!(runtime.spawn(), e(3));
}

#[test]
fn staged_player_is_served_from_memory() {
    let (_dir, mut manager, mut runtime) = open_save();
    let avatar = runtime.spawn();

    let mut store = manager.create_player_store_for_save("bob");
    store.unload_from(&mut runtime, avatar).unwrap();
    manager.store_player(store).unwrap();

    let loaded = manager.load_player_store("bob").unwrap();
    assert_eq!(loaded.entity_ids().collect::<Vec<_>>(), vec![avatar]);
    assert!(manager.is_staged(&PartitionKey::player("bob")));
}

#[test]
fn unknown_player_loads_as_none() {
    let (_dir, mut manager, _runtime) = open_save();
    assert!(manager.load_player_store("nobody").is_none());
}

#[test]
fn load_global_on_fresh_save_is_a_no_op() {
    let (_dir, mut manager, mut runtime) = open_save();
    manager.load_global_entities(&mut runtime).unwrap();
    assert!(runtime.is_empty());
    assert!(manager.reference_index().is_empty());
}

// =============================================================================
// Destruction Before Flush
// =============================================================================

#[test]
fn destroyed_reference_is_broken_after_restart() {
    let (dir, mut manager, mut runtime) = open_save();
    runtime.reserve_ids(e(42));
    let target = runtime.spawn();
    let avatar = runtime.spawn();
    assert_eq!(target, e(42));
    runtime.set(avatar, "quest", "target", target).unwrap();

    let mut store = manager.create_player_store_for_save("alice");
    store.unload_from(&mut runtime, avatar).unwrap();
    manager.store_player(store).unwrap();

    runtime.destroy(target).unwrap();
    manager.flush(&runtime).unwrap();

    let bytes = std::fs::read(manager.config().global_path()).unwrap();
    let global: GlobalSnapshot = from_bytes(&bytes).unwrap();
    assert!(global.ref_tables.is_empty());

    let (mut manager, mut runtime) = reopen(&dir);
    manager.load_global_entities(&mut runtime).unwrap();
    let loaded = manager.load_player_store("alice").unwrap();
    assert!(loaded.valid_references().is_none());

    let report = loaded.restore(&mut runtime, manager.codec()).unwrap();
    assert_eq!(report.broken_references, 1);
    assert_eq!(
        runtime.get(avatar).unwrap().get("quest", "target"),
        Some(&Value::Nil)
    );
}

#[test]
fn partially_destroyed_references_shrink_the_valid_set() {
    let (dir, mut manager, mut runtime) = open_save();
    let a = runtime.spawn();
    let b = runtime.spawn();
    let avatar = runtime.spawn();
    runtime
        .set(avatar, "bag", "items", Value::List(vec![a.into(), b.into()]))
        .unwrap();

    let mut store = manager.create_player_store_for_save("alice");
    store.unload_from(&mut runtime, avatar).unwrap();
    manager.store_player(store).unwrap();
    manager.flush(&runtime).unwrap();

    // Destroyed after the player was written: only the global snapshot knows.
    runtime.destroy(a).unwrap();
    manager.flush(&runtime).unwrap();

    let (mut manager, mut runtime) = reopen(&dir);
    manager.load_global_entities(&mut runtime).unwrap();
    let loaded = manager.load_player_store("alice").unwrap();
    let valid: Vec<_> = loaded.valid_references().unwrap().iter().copied().collect();
    assert_eq!(valid, vec![b]);
}

// =============================================================================
// Chunks
// =============================================================================

#[test]
fn memory_only_chunks_do_not_survive_restart() {
    let (dir, mut manager, mut runtime) = open_save();
    let pos = ChunkPos::new(0, 0, 0);
    let rock = runtime.spawn();

    let mut store = manager.create_chunk_store_for_save(pos);
    store.unload_from(&mut runtime, rock).unwrap();
    manager.store_chunk(store).unwrap();
    manager.flush(&runtime).unwrap();
    assert!(manager.load_chunk_store(pos).is_some());

    let (mut manager, _runtime) = reopen(&dir);
    assert!(manager.load_chunk_store(pos).is_none());
}

#[test]
fn durable_chunks_survive_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let config =
        SaveConfig::new(dir.path()).with_chunk_persistence(ChunkPersistence::Durable);
    let mut manager = StorageManager::open(config.clone());
    let mut runtime = EntityStore::with_notifier(manager.destroy_notifier());
    let pos = ChunkPos::new(1, -2, 3);
    let owner = runtime.spawn();
    let chest = runtime.spawn();
    runtime.set(chest, "owner", "player", owner).unwrap();

    let mut store = manager.create_chunk_store_for_save(pos);
    store.unload_from(&mut runtime, chest).unwrap();
    manager.store_chunk(store).unwrap();
    let report = manager.flush(&runtime).unwrap();
    assert_eq!(report.chunks_written, 1);
    assert!(config.chunk_path(pos).exists());

    let mut manager = StorageManager::open(config);
    let mut runtime = EntityStore::new();
    manager.load_global_entities(&mut runtime).unwrap();
    let loaded = manager.load_chunk_store(pos).unwrap();
    let valid: Vec<_> = loaded.valid_references().unwrap().iter().copied().collect();
    assert_eq!(valid, vec![owner]);
}
