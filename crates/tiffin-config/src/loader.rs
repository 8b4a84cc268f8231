// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Merge order (later overrides earlier):
//! 1. Compiled defaults
//! 2. `/etc/tiffin/tiffin.toml`
//! 3. `~/.config/tiffin/tiffin.toml`
//! 4. `./tiffin.toml`
//! 5. `TIFFIN_*` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use tracing::{debug, trace};

use crate::model::TiffinConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/tiffin/tiffin.toml";
pub(crate) const LOCAL_CONFIG: &str = "tiffin.toml";

/// Sections addressable from the environment, e.g. `TIFFIN_NOTIFY_SCHEDULE`.
const ENV_SECTIONS: &[&str] = &["shop", "whatsapp", "storage", "gateway", "notify"];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tiffin").join("tiffin.toml"))
}

/// Builds the full layered Figment without extracting it.
pub fn build_figment() -> Figment {
    let user = user_config_path();
    log_source(Path::new(SYSTEM_CONFIG));
    if let Some(user) = &user {
        log_source(user);
    }
    log_source(Path::new(LOCAL_CONFIG));

    Figment::new()
        .merge(Serialized::defaults(TiffinConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user.unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Loads configuration from the standard hierarchy with env overrides.
pub fn load_config() -> Result<TiffinConfig, figment::Error> {
    build_figment().extract()
}

/// Loads configuration from a TOML string on top of the defaults only.
pub fn load_config_from_str(toml_content: &str) -> Result<TiffinConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TiffinConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Loads configuration from an explicit file with env overrides.
pub fn load_config_from_path(path: &Path) -> Result<TiffinConfig, figment::Error> {
    log_source(path);
    Figment::new()
        .merge(Serialized::defaults(TiffinConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

fn log_source(path: &Path) {
    if path.is_file() {
        debug!(path = %path.display(), "merging config file");
    } else {
        trace!(path = %path.display(), "config file not present");
    }
}

/// Maps `TIFFIN_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Only the section prefix is split, so `TIFFIN_WHATSAPP_BRIDGE_URL` becomes
/// `whatsapp.bridge_url` rather than `whatsapp.bridge.url`.
fn env_provider() -> Env {
    Env::prefixed("TIFFIN_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_only_at_section() {
        assert_eq!(map_env_key("whatsapp_bridge_url"), "whatsapp.bridge_url");
        assert_eq!(map_env_key("notify_utc_offset_minutes"), "notify.utc_offset_minutes");
        assert_eq!(map_env_key("gateway_admin_token"), "gateway.admin_token");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("tiffin.toml", "[whatsapp]\nmax_attempts = 3\n")?;
            jail.set_env("TIFFIN_WHATSAPP_MAX_ATTEMPTS", "7");
            jail.set_env("TIFFIN_SHOP_NAME", "Spice Route");

            let config = load_config_from_path(Path::new("tiffin.toml"))?;
            assert_eq!(config.whatsapp.max_attempts, 7);
            assert_eq!(config.shop.name, "Spice Route");
            Ok(())
        });
    }

    #[test]
    #[tracing_test::traced_test]
    fn merged_config_files_are_logged() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("tiffin.toml", "[shop]\nname = \"Spice Route\"\n")?;

            let config = build_figment().extract::<TiffinConfig>()?;
            assert_eq!(config.shop.name, "Spice Route");
            Ok(())
        });
        assert!(logs_contain("merging config file"));
        assert!(logs_contain("tiffin.toml"));
    }
}
