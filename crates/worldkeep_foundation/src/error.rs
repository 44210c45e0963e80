//! Error types for the Worldkeep system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::entity::EntityId;
use crate::partition::PartitionKey;

/// Result type alias using the Worldkeep [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Worldkeep operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates an entity not found error.
    #[must_use]
    pub fn entity_not_found(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityNotFound(id))
    }

    /// Creates an error for restoring an entity whose id is already live.
    #[must_use]
    pub fn entity_already_live(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityAlreadyLive(id))
    }

    /// Creates an I/O error that names the file involved.
    #[must_use]
    pub fn io(action: &str, path: &Path, err: &std::io::Error) -> Self {
        Self::new(ErrorKind::IoError(format!(
            "failed to {action} '{}': {err}",
            path.display()
        )))
        .with_context(ErrorContext::new().with_path(path))
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::SerializationError(message.to_string()))
    }

    /// Returns true if this error came from the filesystem.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self.kind, ErrorKind::IoError(_))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Entity was not live in the runtime.
    #[error("entity not found: {0:?}")]
    EntityNotFound(EntityId),

    /// Entity could not be restored because its id is already live.
    #[error("entity already live: {0:?}")]
    EntityAlreadyLive(EntityId),

    /// Reading or writing a save artifact failed.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Encoding or decoding a save artifact failed.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// A partition key or partition blob was malformed.
    #[error("invalid partition: {0}")]
    InvalidPartition(String),
}

/// Context about which save artifact an error relates to.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// File the operation touched.
    pub path: Option<PathBuf>,
    /// Partition the operation was working on.
    pub partition: Option<PartitionKey>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the file path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the partition.
    #[must_use]
    pub fn with_partition(mut self, partition: PartitionKey) -> Self {
        self.partition = Some(partition);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(partition) = &self.partition {
            write!(f, "in {partition}")?;
        }
        if let Some(path) = &self.path {
            if self.partition.is_some() {
                write!(f, " ")?;
            }
            write!(f, "at {}", path.display())?;
        }
        Ok(())
    }
}
