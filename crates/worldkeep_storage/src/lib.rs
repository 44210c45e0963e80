//! Entity runtime and destroy notifications for Worldkeep.
//!
//! This crate provides:
//! - [`EntityRecord`] - The persistable state of one entity
//! - [`EntityRuntime`] - The interface the persistence layer consumes
//! - [`EntityStore`] - A dense, non-reusing entity runtime
//! - [`destroy_channel`] - Explicit destroy-notification wiring

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod entity;
pub mod events;
pub mod record;

pub use entity::{EntityRuntime, EntityStore};
pub use events::{DestroyEvents, DestroyNotifier, destroy_channel};
pub use record::{Component, EntityRecord};
