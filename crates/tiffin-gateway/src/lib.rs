// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dashboard gateway for the Tiffin ordering bot.
//!
//! Exposes the connection status, a WebSocket feed of connection events, and
//! the administrative start triggers over HTTP.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod ws;

pub use auth::AuthConfig;
pub use server::{GatewayState, ServerConfig, router, start_server};
