// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out of connection events to dashboards and other observers.
//!
//! Publishing never blocks and never fails: with no subscribers the event is
//! dropped, and a subscriber that falls behind sees `Lagged` and skips ahead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiffin_core::ConnectionState;
use tokio::sync::broadcast;
use tracing::{info, trace};

/// Default number of buffered events per subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

/// One discrete observer event. Serialized as `{"type": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionEvent {
    /// Emitted on every state transition.
    Status {
        status: ConnectionState,
        /// True when automatic retries are exhausted.
        #[serde(default)]
        halted: bool,
    },
    /// Human-readable trace line.
    Log { message: String },
    /// Renderable pairing image, or `None` to clear it.
    PairingPayload { image: Option<String> },
    SessionInfo {
        last_authenticated_at: Option<DateTime<Utc>>,
    },
}

impl ConnectionEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Broadcast bus for [`ConnectionEvent`]s. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ConnectionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn publish(&self, event: ConnectionEvent) {
        if self.sender.send(event).is_err() {
            trace!("no bus subscribers, event dropped");
        }
    }

    /// Publishes a log line and mirrors it to tracing.
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "tiffin_bus::log", "{message}");
        self.publish(ConnectionEvent::Log { message });
    }

    pub fn status(&self, status: ConnectionState, halted: bool) {
        self.publish(ConnectionEvent::Status { status, halted });
    }

    pub fn pairing_payload(&self, image: Option<String>) {
        self.publish(ConnectionEvent::PairingPayload { image });
    }

    pub fn session_info(&self, last_authenticated_at: Option<DateTime<Utc>>) {
        self.publish(ConnectionEvent::SessionInfo {
            last_authenticated_at,
        });
    }
}
