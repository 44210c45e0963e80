//! Partition stores, reference index, and save orchestration for Worldkeep.
//!
//! World state is saved in independent partitions: one global store, one
//! store per player, and one store per chunk. An entity saved inside one
//! partition may be referenced from another, so this crate keeps a
//! [`ReferenceIndex`] of which partitions depend on which external entities
//! and garbage-collects it as entities are destroyed.
//!
//! This crate provides:
//! - [`ReferenceIndex`] and [`RefTable`] - Cross-partition reference tracking
//! - [`PlayerStore`] and [`ChunkStore`] - Partition stores staged for save
//! - [`LoadedPartition`] - A partition read back, with its valid reference set
//! - [`GlobalStoreSaver`] and [`GlobalStoreLoader`] - The world-level snapshot
//! - [`StorageManager`] - Flush/load orchestration
//! - [`BlobStore`] - Byte-blob storage primitives
//! - [`EntityCodec`] - Entity encoding with external reference discovery

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod blob;
pub mod chunk;
pub mod codec;
pub mod config;
pub mod global;
pub mod manager;
pub mod partition;
pub mod player;
pub mod reference;

pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use chunk::ChunkStore;
pub use codec::{DecodedEntity, EntityCodec, MessagePackCodec};
pub use config::{BrokenReferencePolicy, ChunkPersistence, SaveConfig, validate_player_id};
pub use global::{GlobalSnapshot, GlobalStoreLoader, GlobalStoreSaver};
pub use manager::{FlushReport, StorageManager};
pub use partition::{LoadedPartition, PartitionSnapshot, PartitionStore, RestoreReport};
pub use player::PlayerStore;
pub use reference::{RefTable, ReferenceIndex};
