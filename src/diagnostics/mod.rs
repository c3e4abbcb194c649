// SPDX-License-Identifier: MPL-2.0
//! Status collection for pipeline diagnostics.
//!
//! Processors narrate their degradations through the [`StatusReporter`] port;
//! this module provides the default implementation: a cheap-to-clone
//! [`StatusHandle`] feeding a bounded channel, drained by the host through the
//! [`StatusHub`]. Reporting is non-blocking and lossy under backpressure:
//! when the channel is full, events are dropped rather than stalling a worker.
//!
//! [`StatusReporter`]: crate::application::port::StatusReporter

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::application::port::StatusReporter;

/// Default bound for the status channel.
const DEFAULT_CAPACITY: usize = 256;

/// One status message with its origin and capture time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusEvent {
    /// Human-readable status text.
    pub message: String,
    /// Identity token of the reporting processor.
    pub identity: String,
    /// Capture timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Handle for sending status events to the hub.
///
/// This handle is cheap to clone and can be shared across threads.
#[derive(Clone, Debug)]
pub struct StatusHandle {
    event_tx: Sender<StatusEvent>,
}

impl StatusReporter for StatusHandle {
    fn report(&self, message: &str, identity: &str) {
        let event = StatusEvent {
            message: message.to_string(),
            identity: identity.to_string(),
            timestamp: Utc::now(),
        };
        // Non-blocking send - drop if channel is full
        let _ = self.event_tx.try_send(event);
    }
}

/// Receiving side of the status channel.
pub struct StatusHub {
    event_rx: Receiver<StatusEvent>,
}

impl StatusHub {
    /// Creates a hub with the default capacity and its sending handle.
    #[must_use]
    pub fn new() -> (Self, StatusHandle) {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a hub with an explicit channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, StatusHandle) {
        let (event_tx, event_rx) = bounded(capacity);
        (Self { event_rx }, StatusHandle { event_tx })
    }

    /// Drains all currently buffered events without blocking.
    pub fn drain(&self) -> Vec<StatusEvent> {
        self.event_rx.try_iter().collect()
    }
}
