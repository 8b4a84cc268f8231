// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tiffin ordering bot.
//!
//! This crate provides the error type, the shared domain types, and the seam
//! traits between the messaging connection controller and its collaborators
//! (storage, transport, message routing, notification).

pub mod error;
pub mod traits;
pub mod types;

pub use error::TiffinError;
pub use types::{
    ConnectionRecord, ConnectionState, Customer, DisconnectReason, InboundMessage, Location,
    PairingToken, RouterAction, RouterReply, TransportEvent,
};

pub use traits::{
    ConnectRequest, CustomerStore, MessageRouter, MessageSender, SessionStore, TransportConnector,
    TransportHandle,
};
