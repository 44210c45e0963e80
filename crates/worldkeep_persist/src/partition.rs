//! Partition stores: one partition's entities, staged for save or read back.
//!
//! Saving goes through [`PartitionStore`]: the caller adds the partition's
//! entities, and encoding discovers which references leave the partition.
//! Loading yields a [`LoadedPartition`] carrying the valid reference set
//! taken from the index at load time.

use std::collections::{BTreeMap, BTreeSet};

use im::OrdSet;
use serde::{Deserialize, Serialize};
use worldkeep_foundation::{EntityId, PartitionKey, Result};
use worldkeep_storage::{EntityRecord, EntityRuntime};

use crate::codec::EntityCodec;

/// Current partition blob format version.
pub const PARTITION_FORMAT_VERSION: u32 = 1;

/// One encoded entity inside a partition blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedEntity {
    /// The entity's identifier.
    pub id: EntityId,
    /// Codec output.
    pub bytes: Vec<u8>,
}

/// Serialized form of one partition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSnapshot {
    /// Blob format version.
    pub version: u32,
    /// The partition this snapshot belongs to.
    pub key: PartitionKey,
    /// The player's avatar entity, for player partitions.
    pub character: Option<EntityId>,
    /// Encoded entities, ordered by id.
    pub entities: Vec<EncodedEntity>,
}

impl PartitionSnapshot {
    /// Identifiers of every entity the partition owns.
    #[must_use]
    pub fn owned(&self) -> BTreeSet<EntityId> {
        self.entities.iter().map(|e| e.id).collect()
    }
}

/// A partition being populated for save.
#[derive(Clone, Debug)]
pub struct PartitionStore {
    key: PartitionKey,
    pub(crate) character: Option<EntityId>,
    entities: BTreeMap<EntityId, EntityRecord>,
}

impl PartitionStore {
    /// Creates an empty store for `key`.
    #[must_use]
    pub fn new(key: PartitionKey) -> Self {
        Self {
            key,
            character: None,
            entities: BTreeMap::new(),
        }
    }

    /// The partition this store saves.
    #[must_use]
    pub fn key(&self) -> &PartitionKey {
        &self.key
    }

    /// Adds an entity the partition owns, replacing any earlier copy.
    pub fn add_entity(&mut self, record: EntityRecord) {
        self.entities.insert(record.id, record);
    }

    /// Takes a live entity out of the runtime and adds it to the partition.
    ///
    /// The entity is unloaded, not destroyed, so no destroy notification fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not live.
    pub fn unload_from<R: EntityRuntime + ?Sized>(
        &mut self,
        runtime: &mut R,
        id: EntityId,
    ) -> Result<()> {
        let record = runtime.unload(id)?;
        self.add_entity(record);
        Ok(())
    }

    /// Returns true if the partition owns `id`.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Iterates over the owned entity ids.
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Number of owned entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the partition owns nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Encodes every owned entity.
    ///
    /// Returns the snapshot and the set of referenced entities the partition
    /// does not own.
    ///
    /// # Errors
    ///
    /// Returns an error if any entity fails to encode.
    pub fn encode<C: EntityCodec + ?Sized>(
        &self,
        codec: &C,
    ) -> Result<(PartitionSnapshot, BTreeSet<EntityId>)> {
        let owned: BTreeSet<EntityId> = self.entities.keys().copied().collect();
        let mut external = BTreeSet::new();
        let entities = self
            .entities
            .values()
            .map(|record| {
                Ok(EncodedEntity {
                    id: record.id,
                    bytes: codec.encode(record, &owned, &mut external)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let snapshot = PartitionSnapshot {
            version: PARTITION_FORMAT_VERSION,
            key: self.key.clone(),
            character: self.character,
            entities,
        };
        Ok((snapshot, external))
    }
}

/// Outcome of restoring a partition into the runtime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Entities re-materialized, in id order.
    pub restored: Vec<EntityId>,
    /// References that no longer resolved.
    pub broken_references: usize,
}

/// A partition read back from staging or storage.
#[derive(Clone, Debug)]
pub struct LoadedPartition {
    snapshot: PartitionSnapshot,
    valid_references: Option<OrdSet<EntityId>>,
}

impl LoadedPartition {
    pub(crate) fn new(
        snapshot: PartitionSnapshot,
        valid_references: Option<OrdSet<EntityId>>,
    ) -> Self {
        Self {
            snapshot,
            valid_references,
        }
    }

    /// The partition this was loaded for.
    #[must_use]
    pub fn key(&self) -> &PartitionKey {
        &self.snapshot.key
    }

    /// The player's avatar entity, if recorded.
    #[must_use]
    pub fn character(&self) -> Option<EntityId> {
        self.snapshot.character
    }

    /// Identifiers of every entity in the partition.
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.snapshot.entities.iter().map(|e| e.id)
    }

    /// Number of entities in the partition.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.entities.len()
    }

    /// Returns true if the partition holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.entities.is_empty()
    }

    /// External references still valid when the partition was loaded.
    ///
    /// `None` means no reference table was indexed: every external reference
    /// is broken.
    #[must_use]
    pub fn valid_references(&self) -> Option<&OrdSet<EntityId>> {
        self.valid_references.as_ref()
    }

    /// The underlying snapshot.
    #[must_use]
    pub fn snapshot(&self) -> &PartitionSnapshot {
        &self.snapshot
    }

    /// Decodes every entity and restores it into `runtime`.
    ///
    /// References to entities the partition owns always resolve; external
    /// references resolve only if they are in the valid set.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity fails to decode or cannot be restored.
    pub fn restore<R, C>(self, runtime: &mut R, codec: &C) -> Result<RestoreReport>
    where
        R: EntityRuntime + ?Sized,
        C: EntityCodec + ?Sized,
    {
        let owned = self.snapshot.owned();
        let valid = self.valid_references;
        let resolves = |id: EntityId| {
            owned.contains(&id) || valid.as_ref().is_some_and(|v| v.contains(&id))
        };

        let mut report = RestoreReport::default();
        for encoded in &self.snapshot.entities {
            let decoded = codec.decode(&encoded.bytes, &resolves)?;
            report.broken_references += decoded.broken_references;
            report.restored.push(decoded.record.id);
            runtime.restore(decoded.record)?;
        }

        if report.broken_references > 0 {
            log::warn!(
                "{}: {} broken reference(s) while restoring",
                self.snapshot.key,
                report.broken_references
            );
        }
        Ok(report)
    }
}
