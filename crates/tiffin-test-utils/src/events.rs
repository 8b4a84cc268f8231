// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for asserting on bus traffic.

use tiffin_bus::ConnectionEvent;
use tiffin_core::ConnectionState;
use tokio::sync::broadcast;

/// Collects every event currently buffered on `rx` without waiting.
pub fn drain_events(rx: &mut broadcast::Receiver<ConnectionEvent>) -> Vec<ConnectionEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                panic!("event receiver lagged by {skipped} events, raise the bus capacity")
            }
            Err(_) => return events,
        }
    }
}

/// The status sequence carried by `events`, as `(status, halted)` pairs.
pub fn statuses(events: &[ConnectionEvent]) -> Vec<(ConnectionState, bool)> {
    events
        .iter()
        .filter_map(|e| match e {
            ConnectionEvent::Status { status, halted } => Some((*status, *halted)),
            _ => None,
        })
        .collect()
}

/// Pairing payload emissions in order; `true` for an image, `false` for a clear.
pub fn pairing_payloads(events: &[ConnectionEvent]) -> Vec<bool> {
    events
        .iter()
        .filter_map(|e| match e {
            ConnectionEvent::PairingPayload { image } => Some(image.is_some()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use tiffin_bus::EventBus;

    use super::*;

    #[test]
    fn drains_and_filters() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        bus.status(ConnectionState::Initializing, false);
        bus.log("hello");
        bus.pairing_payload(Some("data:image/svg+xml;base64,AA".into()));
        bus.pairing_payload(None);

        let events = drain_events(&mut rx);
        assert_eq!(events.len(), 4);
        assert_eq!(statuses(&events), vec![(ConnectionState::Initializing, false)]);
        assert_eq!(pairing_payloads(&events), vec![true, false]);
        assert!(drain_events(&mut rx).is_empty());
    }
}
