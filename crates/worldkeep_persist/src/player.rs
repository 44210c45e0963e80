//! Player partition stores.

use std::ops::{Deref, DerefMut};

use worldkeep_foundation::{EntityId, PartitionKey};

use crate::partition::PartitionStore;

/// A player's entities, staged for save.
///
/// Created through `StorageManager::create_player_store_for_save`, populated by
/// the caller, and handed back with `StorageManager::store_player`.
#[derive(Clone, Debug)]
pub struct PlayerStore {
    player_id: String,
    store: PartitionStore,
}

impl PlayerStore {
    /// Creates an empty store for `player_id`.
    #[must_use]
    pub fn new(player_id: impl Into<String>) -> Self {
        let player_id = player_id.into();
        Self {
            store: PartitionStore::new(PartitionKey::player(player_id.clone())),
            player_id,
        }
    }

    /// The player this store belongs to.
    #[must_use]
    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Records the player's avatar entity.
    pub fn set_character(&mut self, character: EntityId) {
        self.store.character = Some(character);
    }

    /// The player's avatar entity, if recorded.
    #[must_use]
    pub fn character(&self) -> Option<EntityId> {
        self.store.character
    }

    /// Unwraps the underlying partition store.
    #[must_use]
    pub fn into_partition(self) -> PartitionStore {
        self.store
    }
}

impl Deref for PlayerStore {
    type Target = PartitionStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl DerefMut for PlayerStore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}
