// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tiffin ordering bot.

use thiserror::Error;

/// The primary error type used across all Tiffin traits and core operations.
#[derive(Debug, Error)]
pub enum TiffinError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging transport errors (connect failure, bridge protocol, send failure).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The messaging connection is not ready to send.
    #[error("messaging connection is not ready")]
    NotReady,

    /// Pairing code could not be rendered.
    #[error("pairing error: {0}")]
    Pairing(String),

    /// Inbound message router failed to produce a reply.
    #[error("router error: {message}")]
    Router { message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TiffinError {
    /// Shorthand for a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        TiffinError::Transport {
            message: message.into(),
            source: None,
        }
    }
}
