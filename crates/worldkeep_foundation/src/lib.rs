//! Core identifiers, values, and errors for Worldkeep.
//!
//! This crate provides:
//! - [`EntityId`] - Dense process-scoped entity identifiers
//! - [`ChunkPos`] and [`PartitionKey`] - Names for independently saved partitions
//! - [`Value`] - Component field values, including entity references
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod entity;
pub mod error;
pub mod partition;
pub mod value;

pub use entity::EntityId;
pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use partition::{ChunkPos, PartitionKey};
pub use value::Value;
