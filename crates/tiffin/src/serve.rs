// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tiffin serve` command implementation.
//!
//! Wires storage, the event bus, the messaging connection, the dashboard
//! gateway, and the reminder scheduler, then runs until a shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use tiffin_bus::EventBus;
use tiffin_config::TiffinConfig;
use tiffin_core::TiffinError;
use tiffin_storage::SqliteStorage;
use tiffin_whatsapp::{
    BridgeConnector, ConnectionController, ControllerDeps, ControllerSettings, InboundDispatcher,
    KeywordRouter, ShopProfile, StartOutcome,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::shutdown;

/// Upper bound on waiting for background tasks after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Runs the bot until SIGINT or SIGTERM.
pub async fn run_serve(config: TiffinConfig) -> Result<(), TiffinError> {
    init_tracing(&config.shop.log_level);
    info!(shop = %config.shop.name, "starting tiffin");

    tiffin_whatsapp::metrics::register_metrics();
    #[cfg(feature = "notify")]
    tiffin_notify::register_metrics();

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    info!(path = %config.storage.database_path, "storage ready");

    let cancel = shutdown::install_signal_handler();
    let bus = EventBus::default();

    let router = Arc::new(KeywordRouter::new(ShopProfile::from_config(&config.shop)));
    let inbound = Arc::new(InboundDispatcher::new(
        router,
        storage.clone(),
        bus.clone(),
        config.whatsapp.router_timeout(),
    ));
    let deps = ControllerDeps {
        connector: Arc::new(BridgeConnector::new(config.whatsapp.bridge_url.clone())),
        store: storage.clone(),
        bus: bus.clone(),
        inbound: Some(inbound),
    };
    let (controller, controller_task) = ConnectionController::spawn(
        ControllerSettings::from_config(&config.whatsapp),
        deps,
        cancel.clone(),
    );
    info!(bridge = %config.whatsapp.bridge_url, "connection controller started");

    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    #[cfg(feature = "notify")]
    {
        if let Some(task) = spawn_notify(&config, &storage, &controller, &bus, &cancel)? {
            tasks.push(task);
        }
    }

    #[cfg(feature = "gateway")]
    {
        if let Some(task) = spawn_gateway(&config, &controller, &bus, &cancel) {
            tasks.push(task);
        }
    }

    match controller.resume().await? {
        StartOutcome::Started => debug!("initial connection cycle started"),
        StartOutcome::AlreadyInProgress => debug!("connection cycle already running"),
    }

    cancel.cancelled().await;
    info!("shutting down");

    controller.shutdown().await;
    if tokio::time::timeout(DRAIN_TIMEOUT, controller_task)
        .await
        .is_err()
    {
        warn!("connection controller did not stop in time");
    }
    for task in tasks {
        if tokio::time::timeout(DRAIN_TIMEOUT, task).await.is_err() {
            warn!("background task did not stop in time");
        }
    }

    if let Err(e) = storage.close().await {
        warn!(error = %e, "failed to close storage cleanly");
    }

    info!("tiffin serve shutdown complete");
    Ok(())
}

#[cfg(feature = "notify")]
fn spawn_notify(
    config: &TiffinConfig,
    storage: &Arc<SqliteStorage>,
    controller: &ConnectionController,
    bus: &EventBus,
    cancel: &CancellationToken,
) -> Result<Option<JoinHandle<()>>, TiffinError> {
    if !config.notify.enabled {
        info!("reorder notifications disabled");
        return Ok(None);
    }
    let settings = tiffin_notify::NotifySettings::from_config(&config.notify, &config.shop)?;
    let scheduler = tiffin_notify::NotificationScheduler::new(
        settings,
        storage.clone(),
        Arc::new(controller.clone()),
        bus.clone(),
    );
    Ok(Some(tokio::spawn(scheduler.run(cancel.clone()))))
}

#[cfg(feature = "gateway")]
fn spawn_gateway(
    config: &TiffinConfig,
    controller: &ConnectionController,
    bus: &EventBus,
    cancel: &CancellationToken,
) -> Option<JoinHandle<()>> {
    if !config.gateway.enabled {
        info!("dashboard gateway disabled");
        return None;
    }
    if config.gateway.admin_token.is_none() {
        warn!("no gateway.admin_token configured, admin routes will reject every request");
    }
    let server_config = tiffin_gateway::ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };
    let state = tiffin_gateway::GatewayState {
        controller: controller.clone(),
        bus: bus.clone(),
        auth: tiffin_gateway::AuthConfig {
            bearer_token: config.gateway.admin_token.clone(),
        },
        start_time: std::time::Instant::now(),
    };
    let cancel = cancel.clone();
    Some(tokio::spawn(async move {
        if let Err(e) = tiffin_gateway::start_server(&server_config, state, cancel).await {
            error!(error = %e, "dashboard gateway stopped");
        }
    }))
}

/// Targets are prefix-matched, so `tiffin` also covers the `tiffin_*` crates.
fn default_filter(log_level: &str) -> String {
    format!("tiffin={log_level},warn")
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        let filter = default_filter("debug");
        assert_eq!(filter, "tiffin=debug,warn");
        assert!(tracing_subscriber::EnvFilter::try_new(filter).is_ok());
    }
}
