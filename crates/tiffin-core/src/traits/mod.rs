// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seam traits between the connection controller and its collaborators.
//!
//! All traits use `#[async_trait]` so they can be held as trait objects.

pub mod router;
pub mod sender;
pub mod storage;
pub mod transport;

pub use router::MessageRouter;
pub use sender::MessageSender;
pub use storage::{CustomerStore, SessionStore};
pub use transport::{ConnectRequest, TransportConnector, TransportHandle};
