//! Chunk partition stores.

use std::ops::{Deref, DerefMut};

use worldkeep_foundation::{ChunkPos, PartitionKey};

use crate::partition::PartitionStore;

/// A chunk's entities, staged for save.
///
/// Whether chunk stores outlive the process is decided by
/// [`ChunkPersistence`](crate::config::ChunkPersistence).
#[derive(Clone, Debug)]
pub struct ChunkStore {
    position: ChunkPos,
    store: PartitionStore,
}

impl ChunkStore {
    /// Creates an empty store for the chunk at `position`.
    #[must_use]
    pub fn new(position: ChunkPos) -> Self {
        Self {
            position,
            store: PartitionStore::new(PartitionKey::chunk(position)),
        }
    }

    /// The chunk this store belongs to.
    #[must_use]
    pub fn position(&self) -> ChunkPos {
        self.position
    }

    /// Unwraps the underlying partition store.
    #[must_use]
    pub fn into_partition(self) -> PartitionStore {
        self.store
    }
}

impl Deref for ChunkStore {
    type Target = PartitionStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl DerefMut for ChunkStore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}
