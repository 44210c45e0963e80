//! Integration tests for destroy notifications
//!
//! Tests that destruction, and only destruction, reaches the receiver.

use worldkeep_storage::{EntityRuntime, EntityStore, destroy_channel};

// =============================================================================
// Notifications
// =============================================================================

#[test]
fn destroy_notifies() {
    let (notifier, events) = destroy_channel();
    let mut store = EntityStore::with_notifier(notifier);
    let a = store.spawn();
    let b = store.spawn();

    store.destroy(b).unwrap();
    store.destroy(a).unwrap();

    assert_eq!(events.drain().collect::<Vec<_>>(), vec![b, a]);
}

#[test]
fn unload_does_not_notify() {
    let (notifier, events) = destroy_channel();
    let mut store = EntityStore::with_notifier(notifier);
    let a = store.spawn();

    store.unload(a).unwrap();
    assert_eq!(events.drain().count(), 0);
}

#[test]
fn dropped_receiver_is_harmless() {
    let (notifier, events) = destroy_channel();
    drop(events);
    let mut store = EntityStore::with_notifier(notifier);
    let a = store.spawn();
    assert!(store.destroy(a).is_ok());
}
