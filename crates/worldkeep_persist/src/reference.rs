//! Cross-partition reference tracking.
//!
//! A [`RefTable`] records which entities outside a partition that partition
//! depends on. The [`ReferenceIndex`] keeps every table by partition key plus
//! a reverse lookup from each referenced entity to the partitions naming it,
//! so a destroyed entity can be struck from every table in one step.
//!
//! Invariant: entity `x` has partition `p` in its reverse bucket iff `x` is in
//! the table indexed under `p`. Tables are never kept empty.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use im::OrdSet;
use serde::{Deserialize, Serialize};
use worldkeep_foundation::{EntityId, PartitionKey};

/// The external references held by one partition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefTable {
    key: PartitionKey,
    references: OrdSet<EntityId>,
}

impl RefTable {
    /// Creates a table for `key`.
    pub fn new(key: PartitionKey, references: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            key,
            references: references.into_iter().collect(),
        }
    }

    /// The partition this table belongs to.
    #[must_use]
    pub fn key(&self) -> &PartitionKey {
        &self.key
    }

    /// The referenced entities.
    #[must_use]
    pub fn references(&self) -> &OrdSet<EntityId> {
        &self.references
    }

    /// Returns true if the table names no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Number of referenced entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// Returns true if the table names `id`.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.references.contains(&id)
    }
}

/// Reverse index from referenced entities to the partitions that hold them.
///
/// Tables are addressed by partition key rather than by handle, so there is
/// no shared ownership between tables and buckets.
#[derive(Clone, Debug, Default)]
pub struct ReferenceIndex {
    /// Forward: partition -> referenced entities.
    tables: BTreeMap<PartitionKey, OrdSet<EntityId>>,
    /// Reverse: referenced entity -> partitions naming it.
    holders: HashMap<EntityId, BTreeSet<PartitionKey>>,
}

impl ReferenceIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `table`, replacing any table previously indexed under its key.
    ///
    /// An empty table only retracts the previous one.
    pub fn index(&mut self, table: RefTable) {
        self.deindex(&table.key);
        if table.references.is_empty() {
            return;
        }
        for id in &table.references {
            self.holders
                .entry(*id)
                .or_default()
                .insert(table.key.clone());
        }
        self.tables.insert(table.key, table.references);
    }

    /// Removes the table indexed under `key`, returning it.
    pub fn deindex(&mut self, key: &PartitionKey) -> Option<RefTable> {
        let references = self.tables.remove(key)?;
        for id in &references {
            self.release(*id, key);
        }
        Some(RefTable {
            key: key.clone(),
            references,
        })
    }

    /// Strikes a destroyed entity from every table naming it.
    ///
    /// Tables left empty are deindexed; their keys are returned. An entity
    /// that was never referenced is a no-op.
    pub fn on_entity_destroyed(&mut self, id: EntityId) -> Vec<PartitionKey> {
        let Some(keys) = self.holders.remove(&id) else {
            return Vec::new();
        };
        let mut dropped = Vec::new();
        for key in keys {
            let now_empty = match self.tables.get_mut(&key) {
                Some(references) => {
                    references.remove(&id);
                    references.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.tables.remove(&key);
                dropped.push(key);
            }
        }
        if !dropped.is_empty() {
            log::debug!("{id} destroyed; dropped reference tables {dropped:?}");
        }
        dropped
    }

    /// Returns the current valid external references of a partition.
    ///
    /// The returned set is a cheap structural-sharing snapshot.
    #[must_use]
    pub fn reference_set(&self, key: &PartitionKey) -> Option<OrdSet<EntityId>> {
        self.tables.get(key).cloned()
    }

    /// Returns the table indexed under `key`.
    #[must_use]
    pub fn table(&self, key: &PartitionKey) -> Option<RefTable> {
        self.reference_set(key).map(|references| RefTable {
            key: key.clone(),
            references,
        })
    }

    /// Returns true if a table is indexed under `key`.
    #[must_use]
    pub fn contains_table(&self, key: &PartitionKey) -> bool {
        self.tables.contains_key(key)
    }

    /// Iterates over the partitions referencing `id`.
    pub fn holders(&self, id: EntityId) -> impl Iterator<Item = &PartitionKey> + '_ {
        self.holders.get(&id).into_iter().flatten()
    }

    /// Returns every indexed table, ordered by partition key.
    #[must_use]
    pub fn tables(&self) -> Vec<RefTable> {
        self.tables
            .iter()
            .map(|(key, references)| RefTable {
                key: key.clone(),
                references: references.clone(),
            })
            .collect()
    }

    /// Number of indexed tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if no tables are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Number of distinct entities referenced from any partition.
    #[must_use]
    pub fn referenced_count(&self) -> usize {
        self.holders.len()
    }

    /// Removes every table.
    pub fn clear(&mut self) {
        self.tables.clear();
        self.holders.clear();
    }

    /// Checks the forward and reverse maps agree and no table is empty.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let forward_ok = self.tables.iter().all(|(key, references)| {
            !references.is_empty()
                && references
                    .iter()
                    .all(|id| self.holders.get(id).is_some_and(|keys| keys.contains(key)))
        });
        let reverse_ok = self.holders.iter().all(|(id, keys)| {
            !keys.is_empty()
                && keys
                    .iter()
                    .all(|key| self.tables.get(key).is_some_and(|refs| refs.contains(id)))
        });
        forward_ok && reverse_ok
    }

    fn release(&mut self, id: EntityId, key: &PartitionKey) {
        if let Some(keys) = self.holders.get_mut(&id) {
            keys.remove(key);
            if keys.is_empty() {
                self.holders.remove(&id);
            }
        }
    }
}
