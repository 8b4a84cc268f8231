// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Tiffin configuration system.

use tiffin_config::diagnostic::ConfigError;
use tiffin_config::{load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[shop]
name = "Spice Route"
menu_url = "https://spice.example/menu"
latitude = 12.97
longitude = 77.59
log_level = "debug"

[whatsapp]
bridge_url = "ws://10.0.0.2:9000"
session_dir = "/var/lib/tiffin/session"
client_id = "shop-1"
max_attempts = 3
retry_delay_secs = 5
pairing_ttl_secs = 120
init_timeout_secs = 60
router_timeout_secs = 10

[storage]
database_path = "/tmp/tiffin.db"
wal_mode = false

[gateway]
enabled = false
host = "0.0.0.0"
port = 8080
admin_token = "secret"

[notify]
enabled = false
schedule = "30 10 * * *"
utc_offset_minutes = 0
notify_gap_hours = 12
order_gap_hours = 72
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.shop.name, "Spice Route");
    assert_eq!(config.shop.latitude, Some(12.97));
    assert_eq!(config.whatsapp.client_id, "shop-1");
    assert_eq!(config.whatsapp.max_attempts, 3);
    assert_eq!(config.whatsapp.router_timeout_secs, 10);
    assert!(!config.storage.wal_mode);
    assert!(!config.gateway.enabled);
    assert_eq!(config.gateway.admin_token.as_deref(), Some("secret"));
    assert_eq!(config.notify.schedule, "30 10 * * *");
    assert_eq!(config.notify.order_gap_hours, 72);
}

#[test]
fn partial_section_keeps_other_defaults() {
    let config = load_config_from_str("[whatsapp]\nmax_attempts = 2\n").unwrap();
    assert_eq!(config.whatsapp.max_attempts, 2);
    assert_eq!(config.whatsapp.retry_delay_secs, 10);
    assert_eq!(config.whatsapp.client_id, "admin");
}

#[test]
fn unknown_key_gets_suggestion() {
    let errors = load_and_validate_str("[notify]\nshedule = \"0 9 * * *\"\n").unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "shedule");
            assert_eq!(suggestion.as_deref(), Some("schedule"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[gateway]\nport = \"eighty\"\n").unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("port")))
    );
}

#[test]
fn validation_errors_are_collected() {
    let toml = r#"
[whatsapp]
max_attempts = 0

[notify]
schedule = "not a cron"
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(errors.len() >= 2);
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
}
