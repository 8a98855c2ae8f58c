//! Device discovery events
//!
//! SDK discovery callbacks run on a native thread. They only push events
//! into a channel; the manager drains it on its own tick.

use crossbeam_channel::{unbounded, Receiver, Sender};
use deckflow_core::DeviceTypes;
use tracing::debug;

/// A device appeared or disappeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A logical device became available
    Arrived {
        /// Logical device name
        name: String,
        /// Directions it supports
        types: DeviceTypes,
    },
    /// A logical device went away
    Removed {
        /// Logical device name
        name: String,
        /// Directions it supported
        types: DeviceTypes,
    },
}

/// Sending half, handed to the SDK.
#[derive(Debug, Clone)]
pub struct DiscoverySender {
    tx: Sender<DiscoveryEvent>,
}

impl DiscoverySender {
    /// Reports an arrival.
    pub fn device_arrived(&self, name: impl Into<String>, types: DeviceTypes) {
        self.send(DiscoveryEvent::Arrived {
            name: name.into(),
            types,
        });
    }

    /// Reports a removal.
    pub fn device_removed(&self, name: impl Into<String>, types: DeviceTypes) {
        self.send(DiscoveryEvent::Removed {
            name: name.into(),
            types,
        });
    }

    fn send(&self, event: DiscoveryEvent) {
        if self.tx.send(event).is_err() {
            debug!("Discovery event dropped, the manager is gone");
        }
    }
}

/// Receiving half, drained on the control thread.
#[derive(Debug)]
pub struct DiscoveryQueue {
    rx: Receiver<DiscoveryEvent>,
}

impl DiscoveryQueue {
    /// Takes every pending event in arrival order.
    pub fn drain(&self) -> Vec<DiscoveryEvent> {
        self.rx.try_iter().collect()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// No pending events.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Creates a connected sender/queue pair.
pub fn discovery_channel() -> (DiscoverySender, DiscoveryQueue) {
    let (tx, rx) = unbounded();
    (DiscoverySender { tx }, DiscoveryQueue { rx })
}
