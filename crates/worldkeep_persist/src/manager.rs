//! Save orchestration.
//!
//! The `StorageManager` stages partition stores in memory, flushes them
//! together with the global snapshot, loads them back, and keeps the
//! [`ReferenceIndex`] in step with entity destruction.
//!
//! # Partition lifecycle
//!
//! ```text
//! Unstaged --store_*--> Staged --flush--> Flushed (written, unstaged)
//!              ^           |
//!              +-----------+  re-staging replaces contents and reference table
//! ```
//!
//! Destroy notifications arrive over the channel handed out by
//! [`destroy_notifier`](StorageManager::destroy_notifier). Every operation
//! drains that channel before touching reference state, so a destroy that
//! happened before a flush or load is always visible to it.

use std::collections::BTreeMap;
use std::path::Path;

use worldkeep_foundation::{ChunkPos, EntityId, ErrorContext, PartitionKey, Result};
use worldkeep_storage::{DestroyEvents, DestroyNotifier, EntityRuntime, destroy_channel};

use crate::blob::{BlobStore, FileBlobStore};
use crate::chunk::ChunkStore;
use crate::codec::{EntityCodec, MessagePackCodec, from_bytes, to_bytes};
use crate::config::{SaveConfig, validate_player_id};
use crate::global::{GlobalStoreLoader, GlobalStoreSaver};
use crate::partition::{
    LoadedPartition, PARTITION_FORMAT_VERSION, PartitionSnapshot, PartitionStore,
};
use crate::player::PlayerStore;
use crate::reference::{RefTable, ReferenceIndex};

/// What a flush wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Player blobs written.
    pub players_written: usize,
    /// Chunk blobs written.
    pub chunks_written: usize,
    /// Entities in the global snapshot.
    pub global_entities: usize,
    /// Reference tables in the global snapshot.
    pub ref_tables: usize,
}

/// Coordinates partition stores, the global store, and the reference index.
pub struct StorageManager<B: BlobStore = FileBlobStore, C: EntityCodec = MessagePackCodec> {
    config: SaveConfig,
    blobs: B,
    codec: C,
    index: ReferenceIndex,
    staged_players: BTreeMap<String, PartitionSnapshot>,
    staged_chunks: BTreeMap<ChunkPos, PartitionSnapshot>,
    notifier: DestroyNotifier,
    destroy_events: DestroyEvents,
}

impl StorageManager {
    /// Opens a filesystem-backed save.
    #[must_use]
    pub fn open(config: SaveConfig) -> Self {
        let codec = MessagePackCodec::new(config.broken_references);
        Self::with_parts(config, FileBlobStore::new(), codec)
    }
}

impl<B: BlobStore> StorageManager<B, MessagePackCodec> {
    /// Creates a manager over `blobs` with the default codec.
    #[must_use]
    pub fn with_blobs(config: SaveConfig, blobs: B) -> Self {
        let codec = MessagePackCodec::new(config.broken_references);
        Self::with_parts(config, blobs, codec)
    }
}

impl<B: BlobStore, C: EntityCodec> StorageManager<B, C> {
    /// Creates a manager from explicit storage and codec.
    #[must_use]
    pub fn with_parts(config: SaveConfig, blobs: B, codec: C) -> Self {
        let (notifier, destroy_events) = destroy_channel();
        Self {
            config,
            blobs,
            codec,
            index: ReferenceIndex::new(),
            staged_players: BTreeMap::new(),
            staged_chunks: BTreeMap::new(),
            notifier,
            destroy_events,
        }
    }

    /// The save configuration.
    #[must_use]
    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    /// The entity codec.
    #[must_use]
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// The blob storage.
    #[must_use]
    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Mutable access to the blob storage.
    pub fn blobs_mut(&mut self) -> &mut B {
        &mut self.blobs
    }

    /// A notifier to hand to the entity runtime.
    #[must_use]
    pub fn destroy_notifier(&self) -> DestroyNotifier {
        self.notifier.clone()
    }

    /// Applies every pending destroy notification to the index.
    pub fn apply_destroy_notifications(&mut self) {
        let pending: Vec<EntityId> = self.destroy_events.drain().collect();
        for id in pending {
            self.index.on_entity_destroyed(id);
        }
    }

    /// Strikes a destroyed entity from every reference table.
    pub fn on_entity_destroyed(&mut self, id: EntityId) {
        self.apply_destroy_notifications();
        self.index.on_entity_destroyed(id);
    }

    /// The reference index, with pending destroys applied.
    pub fn reference_index(&mut self) -> &ReferenceIndex {
        self.apply_destroy_notifications();
        &self.index
    }

    /// Creates an empty player store to populate for save.
    #[must_use]
    pub fn create_player_store_for_save(&self, player_id: &str) -> PlayerStore {
        PlayerStore::new(player_id)
    }

    /// Creates an empty chunk store to populate for save.
    #[must_use]
    pub fn create_chunk_store_for_save(&self, position: ChunkPos) -> ChunkStore {
        ChunkStore::new(position)
    }

    /// Stages a populated player store until the next flush.
    ///
    /// Replaces anything staged for the same player, including its reference table.
    ///
    /// # Errors
    ///
    /// Returns an error if the player id cannot name a file in the players
    /// directory or an entity fails to encode; nothing is staged then.
    pub fn store_player(&mut self, store: PlayerStore) -> Result<()> {
        validate_player_id(store.player_id())?;
        let player_id = store.player_id().to_string();
        let snapshot = self.stage(&store.into_partition())?;
        self.staged_players.insert(player_id, snapshot);
        Ok(())
    }

    /// Stages a populated chunk store.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity fails to encode; nothing is staged then.
    pub fn store_chunk(&mut self, store: ChunkStore) -> Result<()> {
        let position = store.position();
        let snapshot = self.stage(&store.into_partition())?;
        self.staged_chunks.insert(position, snapshot);
        Ok(())
    }

    fn stage(&mut self, store: &PartitionStore) -> Result<PartitionSnapshot> {
        self.apply_destroy_notifications();
        let (snapshot, external) = store.encode(&self.codec)?;
        self.index.index(RefTable::new(store.key().clone(), external));
        Ok(snapshot)
    }

    /// Returns true if a partition is staged and not yet flushed.
    #[must_use]
    pub fn is_staged(&self, key: &PartitionKey) -> bool {
        match key {
            PartitionKey::Player(id) => self.staged_players.contains_key(id),
            PartitionKey::Chunk(pos) => self.staged_chunks.contains_key(pos),
        }
    }

    /// Iterates over staged player ids.
    pub fn staged_players(&self) -> impl Iterator<Item = &str> + '_ {
        self.staged_players.keys().map(String::as_str)
    }

    /// Writes every staged partition and the global snapshot.
    ///
    /// Player blobs are written before the global snapshot, which is the
    /// authoritative record of reference tables on the next load.
    ///
    /// # Errors
    ///
    /// Returns the first write or encode error. Blobs written before the
    /// failure stay written; a partition kind whose writes did not all
    /// complete stays staged.
    pub fn flush<R: EntityRuntime + ?Sized>(&mut self, runtime: &R) -> Result<FlushReport> {
        self.apply_destroy_notifications();
        let mut report = FlushReport::default();

        let players_path = self.config.players_path();
        self.blobs.create_dir_all(&players_path)?;
        for (player_id, snapshot) in &self.staged_players {
            let path = self.config.player_path(player_id)?;
            self.blobs.write(&path, &to_bytes(snapshot)?)?;
            report.players_written += 1;
        }
        self.staged_players.clear();

        if self.config.chunks_are_durable() {
            let chunks_path = self.config.chunks_path();
            self.blobs.create_dir_all(&chunks_path)?;
            for (position, snapshot) in &self.staged_chunks {
                let path = self.config.chunk_path(*position);
                self.blobs.write(&path, &to_bytes(snapshot)?)?;
                report.chunks_written += 1;
            }
            self.staged_chunks.clear();
        }

        let mut saver = GlobalStoreSaver::new(&self.codec);
        for record in runtime.live_entities() {
            saver.store(record)?;
            report.global_entities += 1;
        }
        for table in self.index.tables() {
            if table.key().as_chunk().is_some() && !self.config.chunks_are_durable() {
                continue;
            }
            saver.add_ref_table(table);
            report.ref_tables += 1;
        }
        saver.set_next_entity_id(runtime.next_id());
        let global = saver.save();

        let global_path = self.config.global_path();
        self.blobs.create_dir_all(&self.config.save_dir)?;
        self.blobs.write(&global_path, &to_bytes(&global)?)?;

        log::info!(
            "flushed {} player(s), {} chunk(s), {} global entities, {} reference table(s)",
            report.players_written,
            report.chunks_written,
            report.global_entities,
            report.ref_tables
        );
        Ok(report)
    }

    /// Loads the global snapshot into `runtime` and indexes its reference tables.
    ///
    /// A save with no global snapshot yet is not an error. This is a startup
    /// step: `runtime` must not already hold any of the snapshot's entities.
    /// If it does, nothing is restored or indexed and an error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be read, decoded,
    /// or restored.
    pub fn load_global_entities<R: EntityRuntime + ?Sized>(&mut self, runtime: &mut R) -> Result<()> {
        self.apply_destroy_notifications();
        let path = self.config.global_path();
        let Some(bytes) = self.blobs.read(&path)? else {
            log::info!("no global snapshot at {}", path.display());
            return Ok(());
        };

        let mut loader = GlobalStoreLoader::new(&self.codec);
        let count = loader
            .load_bytes(&bytes, runtime)
            .map_err(|e| e.with_context(ErrorContext::new().with_path(&path)))?;
        let tables = loader.into_ref_tables();
        let table_count = tables.len();
        for table in tables {
            self.index.index(table);
        }

        log::info!("loaded {count} global entities and {table_count} reference table(s)");
        Ok(())
    }

    /// Loads a player's store, from staging if present, else from storage.
    ///
    /// Returns `None` if the player has no saved data. An id that cannot name
    /// a player blob, or a blob that cannot be read or decoded, is logged and
    /// treated as absent.
    pub fn load_player_store(&mut self, player_id: &str) -> Option<LoadedPartition> {
        self.apply_destroy_notifications();
        let key = PartitionKey::player(player_id);
        let snapshot = match self.staged_players.get(player_id) {
            Some(staged) => staged.clone(),
            None => {
                let path = match self.config.player_path(player_id) {
                    Ok(path) => path,
                    Err(e) => {
                        log::error!("refusing to load {key}: {e}");
                        return None;
                    }
                };
                self.read_partition(&key, &path)?
            }
        };
        Some(self.attach_references(snapshot))
    }

    /// Loads a chunk's store.
    ///
    /// Staged chunk stores are always served from memory. With durable chunk
    /// persistence, storage is consulted as a fallback.
    pub fn load_chunk_store(&mut self, position: ChunkPos) -> Option<LoadedPartition> {
        self.apply_destroy_notifications();
        let snapshot = match self.staged_chunks.get(&position) {
            Some(staged) => staged.clone(),
            None if self.config.chunks_are_durable() => {
                let key = PartitionKey::chunk(position);
                self.read_partition(&key, &self.config.chunk_path(position))?
            }
            None => return None,
        };
        Some(self.attach_references(snapshot))
    }

    fn read_partition(&self, key: &PartitionKey, path: &Path) -> Option<PartitionSnapshot> {
        let bytes = match self.blobs.read(path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                log::error!("failed to read {key} from {}: {e}", path.display());
                return None;
            }
        };
        match from_bytes::<PartitionSnapshot>(&bytes) {
            Ok(snapshot) if snapshot.version != PARTITION_FORMAT_VERSION => {
                log::error!(
                    "unsupported partition version {} in {}",
                    snapshot.version,
                    path.display()
                );
                None
            }
            Ok(snapshot) if &snapshot.key == key => Some(snapshot),
            Ok(snapshot) => {
                log::error!(
                    "{} holds data for {}, expected {key}",
                    path.display(),
                    snapshot.key
                );
                None
            }
            Err(e) => {
                log::error!("failed to load {key} from {}: {e}", path.display());
                None
            }
        }
    }

    fn attach_references(&self, snapshot: PartitionSnapshot) -> LoadedPartition {
        let valid = self.index.reference_set(&snapshot.key);
        LoadedPartition::new(snapshot, valid)
    }
}
