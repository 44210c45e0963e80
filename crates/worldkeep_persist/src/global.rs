//! The global store: world-level entities plus every partition's reference table.
//!
//! Reference tables for partitions that are not staged this cycle survive a
//! restart only by being embedded here, which makes the global snapshot the
//! authoritative source of reference state on load.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use worldkeep_foundation::{EntityId, Error, Result};
use worldkeep_storage::{EntityRecord, EntityRuntime};

use crate::codec::{EntityCodec, from_bytes};
use crate::partition::EncodedEntity;
use crate::reference::RefTable;

/// Current global snapshot format version.
pub const GLOBAL_FORMAT_VERSION: u32 = 1;

/// Serialized form of the global partition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSnapshot {
    /// Snapshot format version.
    pub version: u32,
    /// Entity allocation high-water mark at save time.
    pub next_entity_id: EntityId,
    /// Encoded world-level entities, in id order.
    pub entities: Vec<EncodedEntity>,
    /// Every partition's reference table, ordered by partition key.
    pub ref_tables: Vec<RefTable>,
}

/// Builds a [`GlobalSnapshot`].
pub struct GlobalStoreSaver<'a, C: EntityCodec + ?Sized> {
    codec: &'a C,
    next_entity_id: EntityId,
    entities: Vec<EncodedEntity>,
    ref_tables: Vec<RefTable>,
}

impl<'a, C: EntityCodec + ?Sized> GlobalStoreSaver<'a, C> {
    /// Creates an empty saver.
    pub fn new(codec: &'a C) -> Self {
        Self {
            codec,
            next_entity_id: EntityId::new(0),
            entities: Vec::new(),
            ref_tables: Vec::new(),
        }
    }

    /// Encodes one world-level entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity fails to encode.
    pub fn store(&mut self, record: &EntityRecord) -> Result<()> {
        // Global references are not tracked; everything the global store
        // points at is either global itself or covered by a partition table.
        let mut ignored = BTreeSet::new();
        let bytes = self.codec.encode(record, &BTreeSet::new(), &mut ignored)?;
        self.entities.push(EncodedEntity {
            id: record.id,
            bytes,
        });
        Ok(())
    }

    /// Adds a partition's reference table.
    pub fn add_ref_table(&mut self, table: RefTable) {
        self.ref_tables.push(table);
    }

    /// Records the entity allocation high-water mark.
    pub fn set_next_entity_id(&mut self, next: EntityId) {
        self.next_entity_id = next;
    }

    /// Finishes the snapshot.
    #[must_use]
    pub fn save(mut self) -> GlobalSnapshot {
        self.entities.sort_by_key(|e| e.id);
        self.ref_tables.sort_by(|a, b| a.key().cmp(b.key()));
        GlobalSnapshot {
            version: GLOBAL_FORMAT_VERSION,
            next_entity_id: self.next_entity_id,
            entities: self.entities,
            ref_tables: self.ref_tables,
        }
    }
}

/// Restores a [`GlobalSnapshot`] into the runtime and collects its reference tables.
pub struct GlobalStoreLoader<'a, C: EntityCodec + ?Sized> {
    codec: &'a C,
    ref_tables: Vec<RefTable>,
}

impl<'a, C: EntityCodec + ?Sized> GlobalStoreLoader<'a, C> {
    /// Creates a loader.
    pub fn new(codec: &'a C) -> Self {
        Self {
            codec,
            ref_tables: Vec::new(),
        }
    }

    /// Decodes a snapshot blob and loads it.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is malformed or an entity cannot be restored.
    pub fn load_bytes<R: EntityRuntime + ?Sized>(
        &mut self,
        bytes: &[u8],
        runtime: &mut R,
    ) -> Result<usize> {
        let snapshot: GlobalSnapshot = from_bytes(bytes)?;
        self.load(snapshot, runtime)
    }

    /// Restores every global entity into `runtime`.
    ///
    /// Returns the number of entities restored. The snapshot's reference
    /// tables are kept for [`ref_tables`](Self::ref_tables).
    ///
    /// Every entity is decoded and checked against the runtime before any is
    /// restored, so a failure leaves the runtime and the collected tables
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the format version is unknown, an entity fails to
    /// decode, or one of the snapshot's ids is already live in `runtime`.
    pub fn load<R: EntityRuntime + ?Sized>(
        &mut self,
        snapshot: GlobalSnapshot,
        runtime: &mut R,
    ) -> Result<usize> {
        if snapshot.version != GLOBAL_FORMAT_VERSION {
            return Err(Error::serialization(format!(
                "unsupported global snapshot version {}",
                snapshot.version
            )));
        }

        let records = snapshot
            .entities
            .iter()
            .map(|encoded| {
                self.codec
                    .decode(&encoded.bytes, &|_| true)
                    .map(|decoded| decoded.record)
            })
            .collect::<Result<Vec<_>>>()?;
        if let Some(live) = records.iter().find(|r| runtime.get(r.id).is_some()) {
            return Err(Error::entity_already_live(live.id));
        }

        runtime.reserve_ids(snapshot.next_entity_id);
        let count = records.len();
        for record in records {
            runtime.restore(record)?;
        }
        self.ref_tables.extend(snapshot.ref_tables);
        Ok(count)
    }

    /// Reference tables collected by `load`.
    #[must_use]
    pub fn ref_tables(&self) -> &[RefTable] {
        &self.ref_tables
    }

    /// Takes the collected reference tables.
    #[must_use]
    pub fn into_ref_tables(self) -> Vec<RefTable> {
        self.ref_tables
    }
}
