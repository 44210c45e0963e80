//! Persistable entity state.

use std::collections::{BTreeMap, BTreeSet};

use worldkeep_foundation::{EntityId, Value};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A component: named fields holding values.
pub type Component = BTreeMap<String, Value>;

/// The complete persistable state of one entity.
///
/// Components are keyed by name and kept ordered so that encoding an entity
/// is deterministic.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityRecord {
    /// The entity's identifier.
    pub id: EntityId,
    /// Components by name.
    pub components: BTreeMap<String, Component>,
}

impl EntityRecord {
    /// Creates a record with no components.
    #[must_use]
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            components: BTreeMap::new(),
        }
    }

    /// Builder method to add a component.
    #[must_use]
    pub fn with_component(mut self, name: impl Into<String>, component: Component) -> Self {
        self.components.insert(name.into(), component);
        self
    }

    /// Builder method to set a single field, creating the component if needed.
    #[must_use]
    pub fn with_field(
        mut self,
        component: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.set(component, field, value);
        self
    }

    /// Sets a single field, creating the component if needed.
    pub fn set(
        &mut self,
        component: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) {
        self.components
            .entry(component.into())
            .or_default()
            .insert(field.into(), value.into());
    }

    /// Gets a single field.
    #[must_use]
    pub fn get(&self, component: &str, field: &str) -> Option<&Value> {
        self.components.get(component)?.get(field)
    }

    /// Returns true if the entity has the named component.
    #[must_use]
    pub fn has_component(&self, component: &str) -> bool {
        self.components.contains_key(component)
    }

    /// Returns every entity this record references, excluding itself.
    #[must_use]
    pub fn referenced_entities(&self) -> BTreeSet<EntityId> {
        let mut out = BTreeSet::new();
        for component in self.components.values() {
            for value in component.values() {
                value.collect_references(&mut out);
            }
        }
        out.remove(&self.id);
        out
    }

    /// Replaces every reference rejected by `keep` with `Nil`.
    ///
    /// Returns the number of references broken.
    pub fn nullify_references<F>(&mut self, keep: &F) -> usize
    where
        F: Fn(EntityId) -> bool,
    {
        self.components
            .values_mut()
            .flat_map(BTreeMap::values_mut)
            .map(|v| v.retain_references(keep))
            .sum()
    }

    /// Removes every component holding a reference rejected by `keep`.
    ///
    /// Returns the number of references broken.
    pub fn drop_broken_components<F>(&mut self, keep: &F) -> usize
    where
        F: Fn(EntityId) -> bool,
    {
        let mut broken = 0;
        self.components.retain(|_, component| {
            let count = component
                .values()
                .flat_map(Value::referenced_entities)
                .filter(|id| !keep(*id))
                .count();
            broken += count;
            count == 0
        });
        broken
    }
}
