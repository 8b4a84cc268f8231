// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection metrics, recorded through the metrics-rs facade.

use metrics::describe_counter;
use tiffin_core::ConnectionState;

/// Registers metric descriptions. Call once after a recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "tiffin_connection_transitions_total",
        "Connection state transitions, by target state"
    );
    describe_counter!(
        "tiffin_connection_retries_total",
        "Automatic reconnection attempts scheduled"
    );
}

pub(crate) fn record_transition(state: ConnectionState) {
    metrics::counter!("tiffin_connection_transitions_total", "state" => state.as_str())
        .increment(1);
}

pub(crate) fn record_retry() {
    metrics::counter!("tiffin_connection_retries_total").increment(1);
}
