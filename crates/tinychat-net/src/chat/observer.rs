//! Observer contract for chat client notifications.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::error::ChatClientError;

/// Receiver of chat client notifications.
///
/// The client only holds a [`Weak`] reference to its observer. Once the
/// observer is dropped, notifications are silently discarded.
///
/// Callbacks run on whichever thread performed the poll cycle, so they
/// should hand work off rather than block.
pub trait ChatClientObserver: Send + Sync {
    /// Called once after a successful `connect`.
    fn on_connect(&self) {}

    /// Called for each poll cycle that read data, in arrival order.
    fn on_data(&self, bytes: &[u8]);

    /// Called when the peer closes the connection or a read fails.
    #[allow(unused_variables)]
    fn on_fault(&self, error: &ChatClientError) {}
}

/// Holds the non-owning observer reference.
#[derive(Default)]
pub(crate) struct ObserverSlot {
    observer: RwLock<Option<Weak<dyn ChatClientObserver>>>,
}

impl ObserverSlot {
    pub(crate) fn set(&self, observer: Weak<dyn ChatClientObserver>) {
        *self.observer.write() = Some(observer);
    }

    pub(crate) fn clear(&self) {
        *self.observer.write() = None;
    }

    /// Upgrade the observer, if one is registered and still alive.
    pub(crate) fn get(&self) -> Option<Arc<dyn ChatClientObserver>> {
        self.observer.read().as_ref().and_then(Weak::upgrade)
    }
}
