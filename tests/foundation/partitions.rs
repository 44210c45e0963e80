//! Integration tests for partition keys
//!
//! Tests chunk coordinates, key ordering, and display forms.

use worldkeep_foundation::{ChunkPos, PartitionKey};

// =============================================================================
// Chunk Positions
// =============================================================================

#[test]
fn chunk_pos_display_and_parse() {
    let pos = ChunkPos::new(-3, 0, 12);
    assert_eq!(pos.to_string(), "-3.0.12");
    assert_eq!("-3.0.12".parse::<ChunkPos>().unwrap(), pos);
}

#[test]
fn chunk_pos_rejects_malformed_input() {
    assert!("1.2".parse::<ChunkPos>().is_err());
    assert!("1.2.3.4".parse::<ChunkPos>().is_err());
    assert!("a.b.c".parse::<ChunkPos>().is_err());
}

// =============================================================================
// Partition Keys
// =============================================================================

#[test]
fn player_and_chunk_keys_never_collide() {
    let player = PartitionKey::player("1.2.3");
    let chunk = PartitionKey::chunk(ChunkPos::new(1, 2, 3));

    assert_ne!(player, chunk);
    assert_eq!(player.as_player(), Some("1.2.3"));
    assert_eq!(chunk.as_chunk(), Some(ChunkPos::new(1, 2, 3)));
    assert_eq!(player.as_chunk(), None);
}

#[test]
fn keys_display_with_kind_prefix() {
    assert_eq!(PartitionKey::player("alice").to_string(), "player:alice");
    assert_eq!(
        PartitionKey::chunk(ChunkPos::new(0, 1, 2)).to_string(),
        "chunk:0.1.2"
    );
}

#[test]
fn chunk_pos_converts_to_key() {
    let key: PartitionKey = ChunkPos::new(4, 5, 6).into();
    assert_eq!(key, PartitionKey::Chunk(ChunkPos::new(4, 5, 6)));
}
