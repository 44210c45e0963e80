//! Integration tests for error types
//!
//! Tests error kinds, context attachment, and display.

use std::path::Path;

use worldkeep_foundation::{EntityId, Error, ErrorContext, ErrorKind, PartitionKey};

// =============================================================================
// Error Kinds
// =============================================================================

#[test]
fn entity_errors_carry_id() {
    let err = Error::entity_not_found(EntityId::new(8));
    assert!(matches!(err.kind, ErrorKind::EntityNotFound(id) if id == EntityId::new(8)));

    let err = Error::entity_already_live(EntityId::new(2));
    assert!(matches!(err.kind, ErrorKind::EntityAlreadyLive(_)));
}

#[test]
fn io_error_records_path() {
    let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err = Error::io("write", Path::new("saves/global.dat"), &source);

    assert!(err.is_io());
    let context = err.context.unwrap();
    assert_eq!(context.path.as_deref(), Some(Path::new("saves/global.dat")));
}

#[test]
fn serialization_error_is_not_io() {
    let err = Error::serialization("truncated");
    assert!(!err.is_io());
    assert!(err.to_string().contains("truncated"));
}

// =============================================================================
// Context
// =============================================================================

#[test]
fn context_is_attached() {
    let err = Error::serialization("bad blob").with_context(
        ErrorContext::new()
            .with_partition(PartitionKey::player("alice"))
            .with_path("saves/players/alice.player"),
    );
    assert!(err.to_string().contains("bad blob"));

    let context = err.context.unwrap();
    assert_eq!(context.partition, Some(PartitionKey::player("alice")));
    assert_eq!(
        context.to_string(),
        "in player:alice at saves/players/alice.player"
    );
}

#[test]
fn empty_context_displays_nothing() {
    assert_eq!(ErrorContext::new().to_string(), "");
}
