// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dashboard WebSocket: a live feed of connection events.
//!
//! Server -> Client (JSON), one event per frame:
//! ```json
//! {"type": "status", "status": "pairing_required", "halted": false}
//! {"type": "log", "message": "QR code received. Please scan..."}
//! {"type": "pairing_payload", "image": "data:image/svg+xml;base64,..."}
//! {"type": "session_info", "last_authenticated_at": null}
//! ```
//!
//! A new client first receives the current status, session info, and the
//! live pairing image (if any), then every bus event as it happens.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tiffin_bus::ConnectionEvent;
use tokio::sync::broadcast::error::RecvError;

use crate::server::GatewayState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Frames a new observer receives before the live stream.
pub fn initial_events(state: &GatewayState) -> Vec<ConnectionEvent> {
    let snapshot = state.controller.snapshot();
    let mut events = vec![
        ConnectionEvent::Status {
            status: snapshot.state,
            halted: snapshot.halted,
        },
        ConnectionEvent::SessionInfo {
            last_authenticated_at: snapshot.last_authenticated_at,
        },
    ];
    if let Some(image) = snapshot.pairing_image {
        events.push(ConnectionEvent::PairingPayload { image: Some(image) });
    }
    events
}

async fn handle_socket(socket: WebSocket, state: GatewayState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    // Subscribe before the snapshot so nothing between the two is lost.
    let mut events = state.bus.subscribe();
    tracing::debug!(observers = state.bus.subscriber_count(), "dashboard observer connected");

    for event in initial_events(&state) {
        if ws_sender
            .send(Message::Text(event.to_json().into()))
            .await
            .is_err()
        {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if ws_sender.send(Message::Text(event.to_json().into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "dashboard observer lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!("dashboard observer disconnected");
}
