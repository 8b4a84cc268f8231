// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cron-driven re-order reminders.
//!
//! On every tick the scheduler selects customers who ordered before but have
//! gone quiet, and sends each one a reminder through the messaging
//! connection. A run is skipped outright while the connection is not ready.
//! One customer's failure never stops the rest of the batch.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use croner::Cron;
use tiffin_bus::EventBus;
use tiffin_config::model::{NotifyConfig, ShopConfig};
use tiffin_core::{CustomerStore, MessageSender, TiffinError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::messages;

/// Resolved scheduler settings.
#[derive(Debug, Clone)]
pub struct NotifySettings {
    pub schedule: Cron,
    /// Offset the schedule is evaluated in.
    pub offset: FixedOffset,
    pub notify_gap: chrono::Duration,
    pub order_gap: chrono::Duration,
    pub menu_url: String,
}

impl NotifySettings {
    pub fn from_config(notify: &NotifyConfig, shop: &ShopConfig) -> Result<Self, TiffinError> {
        let schedule = notify.schedule.parse::<Cron>().map_err(|e| {
            TiffinError::Config(format!("invalid notify schedule {:?}: {e}", notify.schedule))
        })?;
        let offset = FixedOffset::east_opt(notify.utc_offset_minutes * 60).ok_or_else(|| {
            TiffinError::Config(format!(
                "utc offset out of range: {} minutes",
                notify.utc_offset_minutes
            ))
        })?;
        Ok(Self {
            schedule,
            offset,
            notify_gap: chrono::Duration::hours(i64::from(notify.notify_gap_hours)),
            order_gap: chrono::Duration::hours(i64::from(notify.order_gap_hours)),
            menu_url: shop.menu_url.clone(),
        })
    }
}

/// Outcome of one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// The connection was not ready; nothing was selected or sent.
    pub skipped: bool,
    pub selected: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct NotificationScheduler {
    settings: NotifySettings,
    customers: Arc<dyn CustomerStore>,
    sender: Arc<dyn MessageSender>,
    bus: EventBus,
}

impl NotificationScheduler {
    pub fn new(
        settings: NotifySettings,
        customers: Arc<dyn CustomerStore>,
        sender: Arc<dyn MessageSender>,
        bus: EventBus,
    ) -> Self {
        Self {
            settings,
            customers,
            sender,
            bus,
        }
    }

    /// Next scheduled tick strictly after `now`.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, TiffinError> {
        let local = now.with_timezone(&self.settings.offset);
        self.settings
            .schedule
            .find_next_occurrence(&local, false)
            .map(|next| next.with_timezone(&Utc))
            .map_err(|e| TiffinError::Internal(format!("cannot compute next notify run: {e}")))
    }

    /// Runs on schedule until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(schedule = %self.settings.schedule.pattern, "reorder notification scheduler started");
        loop {
            let now = Utc::now();
            let next = match self.next_run_after(now) {
                Ok(next) => next,
                Err(e) => {
                    warn!(error = %e, "notification scheduler stopped");
                    return;
                }
            };
            let wait = (next - now).to_std().unwrap_or_default();
            debug!(next = %next, "next reorder notification run");

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("notification scheduler cancelled");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            match self.run_once(Utc::now()).await {
                Ok(report) if report.skipped => {}
                Ok(report) => info!(
                    selected = report.selected,
                    sent = report.sent,
                    failed = report.failed,
                    "reorder notification run complete"
                ),
                Err(e) => warn!(error = %e, "reorder notification run failed"),
            }
        }
    }

    /// Selects due customers and sends each a reminder.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RunReport, TiffinError> {
        if !self.sender.is_ready() {
            self.bus
                .log("WhatsApp client not ready. Skipping reorder notifications.");
            crate::record_run("skipped");
            return Ok(RunReport {
                skipped: true,
                ..RunReport::default()
            });
        }

        let due = self
            .customers
            .due_for_reorder(now, self.settings.notify_gap, self.settings.order_gap)
            .await?;
        let mut report = RunReport {
            selected: due.len(),
            ..RunReport::default()
        };
        crate::record_run("completed");
        self.bus.log(format!(
            "Found {} customers for reorder notifications.",
            report.selected
        ));

        for customer in due {
            let body = messages::random_message(&self.settings.menu_url);
            if let Err(e) = self.sender.send_text(&customer.chat_id(), &body).await {
                warn!(phone = %customer.phone, error = %e, "failed to send reorder reminder");
                self.bus.log(format!(
                    "Failed to send notification to {}: {e}",
                    customer.phone
                ));
                report.failed += 1;
                crate::record_notification("failed");
                continue;
            }
            report.sent += 1;
            crate::record_notification("sent");
            self.bus
                .log(format!("Sent reorder notification to {}.", customer.phone));
            if let Err(e) = self.customers.mark_notified(&customer.phone, now).await {
                warn!(phone = %customer.phone, error = %e, "failed to record reminder time");
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn settings(schedule: &str, offset_minutes: i32) -> NotifySettings {
        let notify = NotifyConfig {
            schedule: schedule.into(),
            utc_offset_minutes: offset_minutes,
            ..NotifyConfig::default()
        };
        NotifySettings::from_config(&notify, &ShopConfig::default()).unwrap()
    }

    #[test]
    fn defaults_resolve() {
        let s = settings("0 9 * * *", 330);
        assert_eq!(s.notify_gap, chrono::Duration::hours(24));
        assert_eq!(s.order_gap, chrono::Duration::hours(48));
        assert_eq!(s.offset.local_minus_utc(), 330 * 60);
    }

    #[test]
    fn bad_schedule_is_a_config_error() {
        let notify = NotifyConfig {
            schedule: "every morning".into(),
            ..NotifyConfig::default()
        };
        assert!(matches!(
            NotifySettings::from_config(&notify, &ShopConfig::default()),
            Err(TiffinError::Config(_))
        ));
    }
}
