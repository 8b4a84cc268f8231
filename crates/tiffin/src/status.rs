// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tiffin status` command implementation.
//!
//! Reads the persisted connection record straight from the database, so it
//! works whether or not `tiffin serve` is running.

use tiffin_config::TiffinConfig;
use tiffin_core::{ConnectionRecord, SessionStore, TiffinError};
use tiffin_storage::SqliteStorage;

pub async fn run_status(config: &TiffinConfig, json: bool) -> Result<(), TiffinError> {
    let record = load_record(config).await?;
    if json {
        let out = serde_json::to_string_pretty(&record)
            .map_err(|e| TiffinError::Internal(format!("failed to serialize status: {e}")))?;
        println!("{out}");
    } else {
        println!("{}", render(record.as_ref()));
    }
    Ok(())
}

async fn load_record(config: &TiffinConfig) -> Result<Option<ConnectionRecord>, TiffinError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let record = storage.load().await;
    storage.close().await?;
    record
}

fn render(record: Option<&ConnectionRecord>) -> String {
    let Some(record) = record else {
        return "tiffin: no connection status recorded yet".to_string();
    };
    let mut out = format!("status:             {}", record.status);
    if record.halted {
        out.push_str(" (halted, restart required)");
    }
    let last_auth = record
        .last_authenticated_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());
    out.push_str(&format!("\nlast authenticated: {last_auth}"));
    out.push_str(&format!("\nupdated:            {}", record.updated_at.to_rfc3339()));
    out
}
