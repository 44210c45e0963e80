//! Entity lifecycle management with dense, never-reused identifiers.
//!
//! The `EntityStore` allocates identifiers from a monotonically increasing
//! counter. Saved partitions may hold references to any identifier ever
//! handed out, so an index is never recycled; the high-water mark is carried
//! across restarts through [`EntityRuntime::reserve_ids`].

use std::collections::BTreeMap;

use worldkeep_foundation::{EntityId, Error, Result, Value};

use crate::events::DestroyNotifier;
use crate::record::{Component, EntityRecord};

/// The entity runtime as seen by the persistence layer.
pub trait EntityRuntime {
    /// Iterates over every live entity.
    fn live_entities(&self) -> Box<dyn Iterator<Item = &EntityRecord> + '_>;

    /// Gets a live entity.
    fn get(&self, id: EntityId) -> Option<&EntityRecord>;

    /// Re-materializes a persisted entity under its original identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity with that identifier is already live.
    fn restore(&mut self, record: EntityRecord) -> Result<()>;

    /// Deactivates an entity for storage.
    ///
    /// Unlike destruction this does not emit a destroy notification: the
    /// entity lives on inside a saved partition.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not live.
    fn unload(&mut self, id: EntityId) -> Result<EntityRecord>;

    /// Returns the next identifier that would be allocated.
    fn next_id(&self) -> EntityId;

    /// Ensures no identifier below `next` is ever allocated.
    fn reserve_ids(&mut self, next: EntityId);
}

/// Manages entity lifecycle and component records.
#[derive(Debug, Default)]
pub struct EntityStore {
    /// Next identifier to hand out.
    next_id: u64,
    /// Live entities by id.
    live: BTreeMap<EntityId, EntityRecord>,
    /// Where destroy notifications go, if anyone is listening.
    notifier: Option<DestroyNotifier>,
}

impl EntityStore {
    /// Creates a new empty entity store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that reports destroyed entities to `notifier`.
    #[must_use]
    pub fn with_notifier(notifier: DestroyNotifier) -> Self {
        Self {
            notifier: Some(notifier),
            ..Self::default()
        }
    }

    /// Spawns a new entity with no components, returns its ID.
    pub fn spawn(&mut self) -> EntityId {
        self.spawn_with(BTreeMap::new())
    }

    /// Spawns a new entity with the given components.
    pub fn spawn_with(&mut self, components: BTreeMap<String, Component>) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        self.live.insert(id, EntityRecord { id, components });
        id
    }

    /// Sets a component field on a live entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not live.
    pub fn set(
        &mut self,
        id: EntityId,
        component: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        let record = self
            .live
            .get_mut(&id)
            .ok_or_else(|| Error::entity_not_found(id))?;
        record.set(component, field, value);
        Ok(())
    }

    /// Destroys an entity and emits a destroy notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not live.
    pub fn destroy(&mut self, id: EntityId) -> Result<()> {
        self.live
            .remove(&id)
            .ok_or_else(|| Error::entity_not_found(id))?;
        if let Some(notifier) = &self.notifier {
            notifier.notify(id);
        }
        Ok(())
    }

    /// Checks if an entity is live.
    #[must_use]
    pub fn exists(&self, id: EntityId) -> bool {
        self.live.contains_key(&id)
    }

    /// Validates that an entity is live.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not live.
    pub fn validate(&self, id: EntityId) -> Result<()> {
        if self.exists(id) {
            Ok(())
        } else {
            Err(Error::entity_not_found(id))
        }
    }

    /// Returns the total number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns true if there are no live entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Iterates over all live entity IDs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.live.keys().copied()
    }
}

impl EntityRuntime for EntityStore {
    fn live_entities(&self) -> Box<dyn Iterator<Item = &EntityRecord> + '_> {
        Box::new(self.live.values())
    }

    fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        self.live.get(&id)
    }

    fn restore(&mut self, record: EntityRecord) -> Result<()> {
        if self.live.contains_key(&record.id) {
            return Err(Error::entity_already_live(record.id));
        }
        self.next_id = self.next_id.max(record.id.index() + 1);
        self.live.insert(record.id, record);
        Ok(())
    }

    fn unload(&mut self, id: EntityId) -> Result<EntityRecord> {
        self.live.remove(&id).ok_or_else(|| Error::entity_not_found(id))
    }

    fn next_id(&self) -> EntityId {
        EntityId::new(self.next_id)
    }

    fn reserve_ids(&mut self, next: EntityId) {
        self.next_id = self.next_id.max(next.index());
    }
}
