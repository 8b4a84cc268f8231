// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket bridge transport.
//!
//! The WhatsApp Web client runs in a sidecar process that speaks JSON frames
//! over a WebSocket. Each connection attempt opens a fresh socket, sends an
//! `init` frame naming the session, and then turns incoming frames into
//! [`TransportEvent`]s. Outgoing messages are correlated with their
//! `send_result` acknowledgement by request id.
//!
//! Frames, tagged by `type`:
//!
//! | direction | type | fields |
//! |-----------|------|--------|
//! | out | `init` | `client_id`, `session_dir` |
//! | out | `send` | `request_id`, `to`, `body` |
//! | out | `shutdown` | |
//! | in | `qr` | `data` |
//! | in | `authenticated`, `ready` | |
//! | in | `auth_failure` | `message` |
//! | in | `disconnected` | `reason` |
//! | in | `message` | `from`, `body`, `notify_name?`, `location?` |
//! | in | `send_result` | `request_id`, `ok`, `error?` |

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tiffin_core::{
    ConnectRequest, DisconnectReason, InboundMessage, Location, TiffinError, TransportConnector,
    TransportEvent, TransportHandle,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Reason reported when the bridge socket closes on its own.
pub const BRIDGE_CLOSED: &str = "BRIDGE_CLOSED";

const SEND_TIMEOUT: Duration = Duration::from_secs(30);
const OUTBOUND_BUFFER: usize = 32;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutboundFrame {
    Init {
        client_id: String,
        session_dir: String,
    },
    Send {
        request_id: u64,
        to: String,
        body: String,
    },
    Shutdown,
}

impl OutboundFrame {
    fn to_message(&self) -> Result<Message, TiffinError> {
        let json = serde_json::to_string(self)
            .map_err(|e| TiffinError::Internal(format!("failed to encode bridge frame: {e}")))?;
        Ok(Message::Text(json.into()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InboundFrame {
    Qr {
        data: String,
    },
    Authenticated,
    Ready,
    AuthFailure {
        #[serde(default)]
        message: String,
    },
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    Message {
        from: String,
        #[serde(default)]
        body: String,
        #[serde(default)]
        notify_name: Option<String>,
        #[serde(default)]
        location: Option<Location>,
    },
    SendResult {
        request_id: u64,
        ok: bool,
        #[serde(default)]
        error: Option<String>,
    },
}

type PendingSends = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<(), String>>>>>;

fn lock_pending(
    pending: &PendingSends,
) -> std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<Result<(), String>>>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Opens bridge sessions at a fixed WebSocket URL.
#[derive(Debug, Clone)]
pub struct BridgeConnector {
    url: String,
}

impl BridgeConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl TransportConnector for BridgeConnector {
    async fn connect(
        &self,
        request: ConnectRequest,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn TransportHandle>, TiffinError> {
        let (socket, _) =
            connect_async(self.url.as_str())
                .await
                .map_err(|e| TiffinError::Transport {
                    message: format!("cannot reach bridge at {}", self.url),
                    source: Some(Box::new(e)),
                })?;
        let (mut sink, mut stream) = socket.split();

        let init = OutboundFrame::Init {
            client_id: request.client_id,
            session_dir: request.session_dir.display().to_string(),
        };
        sink.send(init.to_message()?)
            .await
            .map_err(|e| TiffinError::Transport {
                message: "failed to send init frame".to_string(),
                source: Some(Box::new(e)),
            })?;
        debug!(url = %self.url, "bridge session initialized");

        let (outbound, mut outbound_rx) = mpsc::channel::<OutboundFrame>(OUTBOUND_BUFFER);
        let writer = tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let closing = matches!(frame, OutboundFrame::Shutdown);
                let message = match frame.to_message() {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(error = %e, "dropping bridge frame");
                        continue;
                    }
                };
                if sink.send(message).await.is_err() {
                    break;
                }
                if closing {
                    let _ = sink.close().await;
                    break;
                }
            }
        });

        let pending: PendingSends = Arc::new(Mutex::new(HashMap::new()));
        let reader_pending = pending.clone();
        let reader = tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                let text = match message {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "bridge socket error");
                        break;
                    }
                };
                let frame = match serde_json::from_str::<InboundFrame>(text.as_str()) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(error = %e, "ignoring malformed bridge frame");
                        continue;
                    }
                };
                let event = match frame {
                    InboundFrame::SendResult {
                        request_id,
                        ok,
                        error,
                    } => {
                        if let Some(tx) = lock_pending(&reader_pending).remove(&request_id) {
                            let _ = tx.send(if ok { Ok(()) } else { Err(error.unwrap_or_default()) });
                        }
                        continue;
                    }
                    InboundFrame::Qr { data } => TransportEvent::PairingCode(data),
                    InboundFrame::Authenticated => TransportEvent::Authenticated,
                    InboundFrame::Ready => TransportEvent::Ready,
                    InboundFrame::AuthFailure { message } => TransportEvent::AuthFailure(message),
                    InboundFrame::Disconnected { reason } => {
                        TransportEvent::Disconnected(DisconnectReason::parse(&reason))
                    }
                    InboundFrame::Message {
                        from,
                        body,
                        notify_name,
                        location,
                    } => TransportEvent::Message(InboundMessage {
                        sender_id: from,
                        body,
                        notify_name,
                        location,
                        received_at: Utc::now(),
                    }),
                };
                if events.send(event).await.is_err() {
                    return;
                }
            }
            lock_pending(&reader_pending).clear();
            let _ = events
                .send(TransportEvent::Disconnected(DisconnectReason::Other(
                    BRIDGE_CLOSED.to_string(),
                )))
                .await;
        });

        Ok(Box::new(BridgeHandle {
            outbound,
            pending,
            next_request: AtomicU64::new(1),
            reader,
            writer: Mutex::new(Some(writer)),
        }))
    }
}

/// Live bridge session.
pub struct BridgeHandle {
    outbound: mpsc::Sender<OutboundFrame>,
    pending: PendingSends,
    next_request: AtomicU64,
    reader: JoinHandle<()>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl TransportHandle for BridgeHandle {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), TiffinError> {
        let request_id = self.next_request.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        lock_pending(&self.pending).insert(request_id, tx);

        let frame = OutboundFrame::Send {
            request_id,
            to: to.to_string(),
            body: body.to_string(),
        };
        if self.outbound.send(frame).await.is_err() {
            lock_pending(&self.pending).remove(&request_id);
            return Err(TiffinError::transport("bridge connection closed"));
        }

        match tokio::time::timeout(SEND_TIMEOUT, rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(reason))) => Err(TiffinError::transport(format!(
                "bridge rejected message: {reason}"
            ))),
            Ok(Err(_)) => Err(TiffinError::transport(
                "bridge closed before confirming the message",
            )),
            Err(_) => {
                lock_pending(&self.pending).remove(&request_id);
                Err(TiffinError::Timeout {
                    duration: SEND_TIMEOUT,
                })
            }
        }
    }

    async fn shutdown(&self) -> Result<(), TiffinError> {
        self.reader.abort();
        lock_pending(&self.pending).clear();
        let writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if self.outbound.send(OutboundFrame::Shutdown).await.is_err() {
            return Err(TiffinError::transport("bridge connection already closed"));
        }
        if let Some(writer) = writer {
            let _ = writer.await;
        }
        Ok(())
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        self.reader.abort();
        if let Ok(mut writer) = self.writer.lock() {
            if let Some(writer) = writer.take() {
                writer.abort();
            }
        }
    }
}
