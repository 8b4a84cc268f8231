// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a typo in `tiffin.toml`
//! is reported at startup instead of silently falling back to a default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Tiffin configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TiffinConfig {
    #[serde(default)]
    pub shop: ShopConfig,

    /// Messaging network connection settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Dashboard gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Re-engagement notification settings.
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Shop identity shown to customers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShopConfig {
    #[serde(default = "default_shop_name")]
    pub name: String,

    /// Public web menu link appended to bot replies and notifications.
    #[serde(default = "default_menu_url")]
    pub menu_url: String,

    /// Shop coordinates. Either missing disables the location reply.
    #[serde(default = "default_latitude")]
    pub latitude: Option<f64>,

    #[serde(default = "default_longitude")]
    pub longitude: Option<f64>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            name: default_shop_name(),
            menu_url: default_menu_url(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            log_level: default_log_level(),
        }
    }
}

fn default_shop_name() -> String {
    "Delicious Bites".to_string()
}

fn default_menu_url() -> String {
    "http://localhost:3000/menu".to_string()
}

fn default_latitude() -> Option<f64> {
    Some(17.4399)
}

fn default_longitude() -> Option<f64> {
    Some(78.4983)
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Connection lifecycle settings for the messaging network.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// WebSocket URL of the bridge process that drives the web client.
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,

    /// Directory the session blob is stored in.
    #[serde(default = "default_session_dir")]
    pub session_dir: String,

    /// Fixed identity key of the session blob.
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Consecutive failures tolerated before automatic retries halt.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Lifetime of a pairing code before a fresh one is requested.
    #[serde(default = "default_pairing_ttl_secs")]
    pub pairing_ttl_secs: u64,

    /// Upper bound on a single connect call.
    #[serde(default = "default_init_timeout_secs")]
    pub init_timeout_secs: u64,

    /// Upper bound on routing one inbound message.
    #[serde(default = "default_router_timeout_secs")]
    pub router_timeout_secs: u64,
}

impl WhatsAppConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn pairing_ttl(&self) -> Duration {
        Duration::from_secs(self.pairing_ttl_secs)
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }

    pub fn router_timeout(&self) -> Duration {
        Duration::from_secs(self.router_timeout_secs)
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            session_dir: default_session_dir(),
            client_id: default_client_id(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            pairing_ttl_secs: default_pairing_ttl_secs(),
            init_timeout_secs: default_init_timeout_secs(),
            router_timeout_secs: default_router_timeout_secs(),
        }
    }
}

fn default_bridge_url() -> String {
    "ws://127.0.0.1:8765".to_string()
}

fn default_session_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("tiffin").join("session"))
        .unwrap_or_else(|| std::path::PathBuf::from("session"))
        .to_string_lossy()
        .to_string()
}

fn default_client_id() -> String {
    "admin".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay_secs() -> u64 {
    10
}

fn default_pairing_ttl_secs() -> u64 {
    300
}

fn default_init_timeout_secs() -> u64 {
    120
}

fn default_router_timeout_secs() -> u64 {
    15
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tiffin").join("tiffin.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("tiffin.db"))
        .to_string_lossy()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Dashboard gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token for admin endpoints. `None` disables them.
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_gateway_host(),
            port: default_gateway_port(),
            admin_token: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

/// Re-engagement notification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Five-field cron pattern evaluated in the local offset below.
    #[serde(default = "default_schedule")]
    pub schedule: String,

    /// Shop-local offset from UTC in minutes (330 = UTC+05:30).
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,

    /// Minimum time since the last notification.
    #[serde(default = "default_notify_gap_hours")]
    pub notify_gap_hours: u32,

    /// Minimum time since the last order.
    #[serde(default = "default_order_gap_hours")]
    pub order_gap_hours: u32,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: default_schedule(),
            utc_offset_minutes: default_utc_offset_minutes(),
            notify_gap_hours: default_notify_gap_hours(),
            order_gap_hours: default_order_gap_hours(),
        }
    }
}

fn default_schedule() -> String {
    "0 9 * * *".to_string()
}

fn default_utc_offset_minutes() -> i32 {
    330
}

fn default_notify_gap_hours() -> u32 {
    24
}

fn default_order_gap_hours() -> u32 {
    48
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shop_behaviour() {
        let config = TiffinConfig::default();
        assert_eq!(config.shop.name, "Delicious Bites");
        assert_eq!(config.whatsapp.client_id, "admin");
        assert_eq!(config.whatsapp.max_attempts, 5);
        assert_eq!(config.whatsapp.retry_delay(), Duration::from_secs(10));
        assert_eq!(config.whatsapp.pairing_ttl(), Duration::from_secs(300));
        assert_eq!(config.notify.schedule, "0 9 * * *");
        assert_eq!(config.notify.utc_offset_minutes, 330);
        assert!(config.gateway.admin_token.is_none());
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config: TiffinConfig = toml::from_str("").unwrap();
        assert_eq!(config.gateway.port, 3000);
        assert!(config.storage.wal_mode);
    }

    #[test]
    fn unknown_section_field_is_rejected() {
        let result = toml::from_str::<TiffinConfig>("[whatsapp]\nmax_atempts = 3\n");
        assert!(result.is_err());
    }
}
