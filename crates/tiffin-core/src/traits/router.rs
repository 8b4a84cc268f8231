// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message router trait.

use async_trait::async_trait;

use crate::error::TiffinError;
use crate::types::{InboundMessage, RouterReply};

/// Turns one inbound chat message into at most one reply plus side effects.
///
/// Implementations are called under a timeout and must not rely on being
/// awaited to completion.
#[async_trait]
pub trait MessageRouter: Send + Sync {
    async fn route(&self, message: &InboundMessage) -> Result<RouterReply, TiffinError>;
}
