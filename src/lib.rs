//! Worldkeep - Partitioned world-save persistence
//!
//! This crate re-exports all layers of the Worldkeep system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: worldkeep_persist    - Reference index, partition stores, storage manager
//! Layer 1: worldkeep_storage    - Entity runtime, destroy notifications
//! Layer 0: worldkeep_foundation - Core types (EntityId, PartitionKey, Value, Error)
//! ```

pub use worldkeep_foundation as foundation;
pub use worldkeep_persist as persist;
pub use worldkeep_storage as storage;
