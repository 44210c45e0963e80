//! Destroy notifications.
//!
//! The entity runtime reports destroyed entities over an explicit channel
//! rather than through a registry of subscribers. Whoever owns the
//! [`DestroyEvents`] end decides when pending notifications are applied.

use std::sync::mpsc::{self, Receiver, Sender};

use worldkeep_foundation::EntityId;

/// Creates a connected notifier/receiver pair.
#[must_use]
pub fn destroy_channel() -> (DestroyNotifier, DestroyEvents) {
    let (tx, rx) = mpsc::channel();
    (DestroyNotifier { tx }, DestroyEvents { rx })
}

/// Sending half, held by the entity runtime.
#[derive(Clone, Debug)]
pub struct DestroyNotifier {
    tx: Sender<EntityId>,
}

impl DestroyNotifier {
    /// Reports that an entity was destroyed.
    ///
    /// A disconnected receiver is not an error: nobody is tracking references.
    pub fn notify(&self, id: EntityId) {
        if self.tx.send(id).is_err() {
            log::trace!("destroy notification for {id} dropped: no receiver");
        }
    }
}

/// Receiving half, held by whoever maintains reference state.
#[derive(Debug)]
pub struct DestroyEvents {
    rx: Receiver<EntityId>,
}

impl DestroyEvents {
    /// Takes every notification sent so far, in send order.
    pub fn drain(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.rx.try_iter()
    }
}
