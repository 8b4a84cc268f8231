// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Re-order reminders for the Tiffin ordering bot.

pub mod messages;
pub mod scheduler;

pub use scheduler::{NotificationScheduler, NotifySettings, RunReport};

use metrics::describe_counter;

/// Registers metric descriptions. Call once after a recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "tiffin_notify_runs_total",
        "Scheduler runs, by outcome (completed or skipped)"
    );
    describe_counter!(
        "tiffin_notifications_total",
        "Reorder reminders, by outcome (sent or failed)"
    );
}

fn record_run(outcome: &'static str) {
    metrics::counter!("tiffin_notify_runs_total", "outcome" => outcome).increment(1);
}

fn record_notification(outcome: &'static str) {
    metrics::counter!("tiffin_notifications_total", "outcome" => outcome).increment(1);
}
