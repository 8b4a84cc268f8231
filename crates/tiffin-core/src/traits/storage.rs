// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence traits for the connection record and the customer table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::TiffinError;
use crate::types::{ConnectionRecord, Customer, Location};

/// Durable store for the single connection status record.
///
/// The record survives process restarts so the last-known state can be
/// reported before a new connection attempt completes.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the record, or `None` if the process has never persisted one.
    async fn load(&self) -> Result<Option<ConnectionRecord>, TiffinError>;

    /// Upserts the record.
    async fn save(&self, record: &ConnectionRecord) -> Result<(), TiffinError>;
}

/// Customer persistence used by message intake and the notification scheduler.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Creates the customer if unknown, refreshing the display name when one is given.
    async fn record_contact(&self, phone: &str, name: Option<&str>)
    -> Result<Customer, TiffinError>;

    async fn update_location(&self, phone: &str, location: &Location) -> Result<(), TiffinError>;

    /// Records a completed order: bumps the order count and last order time.
    ///
    /// Called by the order intake of the web shop, which lives outside this
    /// workspace. The reminder selection depends on the fields it maintains.
    async fn record_order(&self, phone: &str, at: DateTime<Utc>) -> Result<(), TiffinError>;

    async fn get(&self, phone: &str) -> Result<Option<Customer>, TiffinError>;

    /// Customers selected by [`Customer::is_due_for_reorder`] at `now`.
    async fn due_for_reorder(
        &self,
        now: DateTime<Utc>,
        notify_gap: chrono::Duration,
        order_gap: chrono::Duration,
    ) -> Result<Vec<Customer>, TiffinError>;

    async fn mark_notified(&self, phone: &str, at: DateTime<Utc>) -> Result<(), TiffinError>;
}
