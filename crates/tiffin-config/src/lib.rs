// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Tiffin ordering bot.
//!
//! TOML files are merged with `TIFFIN_*` environment overrides, every
//! section rejects unknown keys, and failures are reported as miette
//! diagnostics with typo suggestions.
//!
//! ```no_run
//! use tiffin_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Shop: {}", config.shop.name);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::TiffinConfig;

/// Loads configuration from the standard hierarchy and validates it.
pub fn load_and_validate() -> Result<TiffinConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &collect_toml_sources(),
        )),
    }
}

/// Loads configuration from an explicit file and validates it.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<TiffinConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = std::fs::read_to_string(path)
                .map(|content| vec![(path.display().to_string(), content)])
                .unwrap_or_default();
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Loads configuration from a TOML string and validates it.
pub fn load_and_validate_str(toml_content: &str) -> Result<TiffinConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Reads the hierarchy's TOML files so errors can point into them.
fn collect_toml_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|d| d.join(loader::LOCAL_CONFIG))
        .unwrap_or_else(|_| loader::LOCAL_CONFIG.into());
    [
        Some(local),
        loader::user_config_path(),
        Some(loader::SYSTEM_CONFIG.into()),
    ]
    .into_iter()
    .flatten()
    .filter_map(|path| {
        std::fs::read_to_string(&path)
            .ok()
            .map(|content| (path.display().to_string(), content))
    })
    .collect()
}
