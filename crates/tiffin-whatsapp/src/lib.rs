// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp connection lifecycle for the Tiffin ordering bot.
//!
//! [`ConnectionController`] owns the connection to the messaging network:
//! pairing, authentication, readiness, disconnect classification, bounded
//! automatic reconnection, and pairing-code expiry. Inbound chat messages
//! are handed to an [`InboundDispatcher`], which routes them through a
//! [`MessageRouter`](tiffin_core::MessageRouter) such as [`KeywordRouter`].

pub mod bridge;
pub mod controller;
pub mod inbound;
pub mod metrics;
pub mod pairing;
pub mod router;
pub mod scheduler;
pub mod session_blob;

pub use bridge::BridgeConnector;
pub use controller::{
    ConnectionController, ControllerDeps, ControllerSettings, ControllerSnapshot, StartOutcome,
};
pub use inbound::InboundDispatcher;
pub use router::{KeywordRouter, ShopProfile};
pub use session_blob::SessionBlob;
