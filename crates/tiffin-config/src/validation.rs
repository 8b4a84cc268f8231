// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic validation that serde attributes cannot express.

use crate::diagnostic::ConfigError;
use crate::model::TiffinConfig;

/// Largest real-world UTC offset, in minutes.
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Validates a deserialized configuration, collecting every error.
pub fn validate_config(config: &TiffinConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let wa = &config.whatsapp;
    if wa.session_dir.trim().is_empty() {
        fail("whatsapp.session_dir must not be empty".to_string());
    }
    if wa.client_id.trim().is_empty() {
        fail("whatsapp.client_id must not be empty".to_string());
    }
    if !(wa.bridge_url.starts_with("ws://") || wa.bridge_url.starts_with("wss://")) {
        fail(format!(
            "whatsapp.bridge_url `{}` must start with ws:// or wss://",
            wa.bridge_url
        ));
    }
    if wa.max_attempts < 1 {
        fail("whatsapp.max_attempts must be at least 1".to_string());
    }
    for (name, value) in [
        ("retry_delay_secs", wa.retry_delay_secs),
        ("pairing_ttl_secs", wa.pairing_ttl_secs),
        ("init_timeout_secs", wa.init_timeout_secs),
        ("router_timeout_secs", wa.router_timeout_secs),
    ] {
        if value == 0 {
            fail(format!("whatsapp.{name} must be greater than 0"));
        }
    }

    if let Some(lat) = config.shop.latitude
        && !(-90.0..=90.0).contains(&lat)
    {
        fail(format!("shop.latitude must be within [-90, 90], got {lat}"));
    }
    if let Some(lng) = config.shop.longitude
        && !(-180.0..=180.0).contains(&lng)
    {
        fail(format!("shop.longitude must be within [-180, 180], got {lng}"));
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }
    if let Some(token) = &config.gateway.admin_token
        && token.trim().is_empty()
    {
        fail("gateway.admin_token must not be empty when set".to_string());
    }

    let notify = &config.notify;
    if let Err(e) = notify.schedule.parse::<croner::Cron>() {
        fail(format!(
            "notify.schedule `{}` is not a valid cron pattern: {e}",
            notify.schedule
        ));
    }
    if notify.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
        fail(format!(
            "notify.utc_offset_minutes must be within ±{MAX_OFFSET_MINUTES}, got {}",
            notify.utc_offset_minutes
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
