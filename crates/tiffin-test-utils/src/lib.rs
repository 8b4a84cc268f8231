// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tiffin integration tests.
//!
//! Provides in-memory and scripted stand-ins for the seam traits so the
//! connection controller, dispatcher, and scheduler can be exercised
//! deterministically without a bridge process or a database.
//!
//! # Components
//!
//! - [`MockConnector`] - Scripted transport with event injection and captured sends
//! - [`InMemorySessionStore`] / [`InMemoryCustomerStore`] - Store fakes with write tracking
//! - [`MockSender`] - Recording [`MessageSender`](tiffin_core::MessageSender)
//! - [`MockRouter`] - Router with a fixed reply, error, or hang

pub mod events;
pub mod memory_store;
pub mod mock_sender;
pub mod mock_transport;

pub use events::{drain_events, pairing_payloads, statuses};
pub use memory_store::{InMemoryCustomerStore, InMemorySessionStore};
pub use mock_sender::{MockRouter, MockSender, RouterBehavior};
pub use mock_transport::{ConnectOutcome, MockConnector};
