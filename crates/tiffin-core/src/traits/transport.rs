// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport traits for the remote messaging network.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TiffinError;
use crate::types::TransportEvent;

/// Parameters for one connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Fixed identity key the session blob is stored under.
    pub client_id: String,
    /// Directory holding the session blob.
    pub session_dir: PathBuf,
}

/// Opens connections to the messaging network.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Starts a connection attempt.
    ///
    /// Returns once the remote client has been initialized; lifecycle events
    /// (pairing codes, authentication, readiness, disconnects, messages) are
    /// delivered on `events` for as long as the handle lives.
    async fn connect(
        &self,
        request: ConnectRequest,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn TransportHandle>, TiffinError>;
}

/// A live connection to the messaging network.
#[async_trait]
pub trait TransportHandle: Send + Sync {
    /// Sends a text message to a chat id.
    async fn send_text(&self, to: &str, body: &str) -> Result<(), TiffinError>;

    /// Requests a graceful shutdown of the remote client.
    async fn shutdown(&self) -> Result<(), TiffinError>;
}
