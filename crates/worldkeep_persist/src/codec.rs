//! Entity encoding using `MessagePack`.
//!
//! The codec turns one entity into bytes and reports, on the side, which
//! entities it references that the saving partition does not own. Decoding
//! is handed the set of references that still resolve, and applies the
//! configured [`BrokenReferencePolicy`] to the rest.

use std::collections::BTreeSet;

use serde::Serialize;
use serde::de::DeserializeOwned;
use worldkeep_foundation::{EntityId, Error, Result};
use worldkeep_storage::EntityRecord;

use crate::config::BrokenReferencePolicy;

/// Serializes a value to bytes using `MessagePack` format.
///
/// Uses named serialization to preserve struct field names.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(value).map_err(Error::serialization)
}

/// Deserializes a value from `MessagePack` bytes.
///
/// # Errors
///
/// Returns an error if deserialization fails.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    rmp_serde::from_slice(bytes).map_err(Error::serialization)
}

/// An entity read back from a partition.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedEntity {
    /// The restored record, with broken references already handled.
    pub record: EntityRecord,
    /// How many references did not resolve.
    pub broken_references: usize,
}

/// Encodes and decodes single entities.
pub trait EntityCodec {
    /// Encodes `record`.
    ///
    /// Every entity the record references that is not in `owned` is added to
    /// `external`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded.
    fn encode(
        &self,
        record: &EntityRecord,
        owned: &BTreeSet<EntityId>,
        external: &mut BTreeSet<EntityId>,
    ) -> Result<Vec<u8>>;

    /// Decodes an entity, treating every reference rejected by `resolves` as broken.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid encoded entity.
    fn decode(&self, bytes: &[u8], resolves: &dyn Fn(EntityId) -> bool) -> Result<DecodedEntity>;
}

/// The default codec: one `MessagePack` map per entity.
#[derive(Clone, Copy, Debug, Default)]
pub struct MessagePackCodec {
    policy: BrokenReferencePolicy,
}

impl MessagePackCodec {
    /// Creates a codec applying `policy` to broken references.
    #[must_use]
    pub fn new(policy: BrokenReferencePolicy) -> Self {
        Self { policy }
    }

    /// Returns the broken reference policy.
    #[must_use]
    pub fn policy(&self) -> BrokenReferencePolicy {
        self.policy
    }
}

impl EntityCodec for MessagePackCodec {
    fn encode(
        &self,
        record: &EntityRecord,
        owned: &BTreeSet<EntityId>,
        external: &mut BTreeSet<EntityId>,
    ) -> Result<Vec<u8>> {
        external.extend(
            record
                .referenced_entities()
                .into_iter()
                .filter(|id| !owned.contains(id)),
        );
        to_bytes(record)
    }

    fn decode(&self, bytes: &[u8], resolves: &dyn Fn(EntityId) -> bool) -> Result<DecodedEntity> {
        let mut record: EntityRecord = from_bytes(bytes)?;
        let own_id = record.id;
        let keep = |id: EntityId| id == own_id || resolves(id);
        let broken_references = match self.policy {
            BrokenReferencePolicy::Nullify => record.nullify_references(&keep),
            BrokenReferencePolicy::DropComponent => record.drop_broken_components(&keep),
        };
        Ok(DecodedEntity {
            record,
            broken_references,
        })
    }
}
