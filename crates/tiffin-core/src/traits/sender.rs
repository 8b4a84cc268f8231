// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only view of the controller used by concurrent collaborators.

use async_trait::async_trait;

use crate::error::TiffinError;

/// Readiness check and send operation exposed to the scheduler and router.
///
/// Holders never mutate connection state through this trait.
#[async_trait]
pub trait MessageSender: Send + Sync {
    fn is_ready(&self) -> bool;

    /// Sends `body` to `to`. Fails with [`TiffinError::NotReady`] when the
    /// connection is not ready.
    async fn send_text(&self, to: &str, body: &str) -> Result<(), TiffinError>;
}
