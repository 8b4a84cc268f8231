// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tiffin - a WhatsApp ordering bot for small food shops.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tiffin_config::{ConfigError, TiffinConfig};

/// Tiffin - a WhatsApp ordering bot for small food shops.
#[derive(Parser, Debug)]
#[command(name = "tiffin", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Run the bot: messaging connection, dashboard, and reminders.
    Serve,
    /// Print the persisted connection status.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: Option<&std::path::Path>) -> Result<TiffinConfig, Vec<ConfigError>> {
    match path {
        Some(path) => tiffin_config::load_and_validate_path(path),
        None => tiffin_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            tiffin_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Status { json } => status::run_status(&config, json).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["tiffin"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn status_accepts_json_and_a_config_path() {
        let cli =
            Cli::try_parse_from(["tiffin", "status", "--json", "--config", "/tmp/t.toml"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Status { json: true }));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/t.toml")));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["tiffin", "shell"]).is_err());
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = tiffin_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.shop.name, "Delicious Bites");
    }
}
