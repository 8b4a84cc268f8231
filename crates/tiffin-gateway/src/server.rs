// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tiffin_bus::EventBus;
use tiffin_core::TiffinError;
use tiffin_whatsapp::ConnectionController;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub controller: ConnectionController,
    pub bus: EventBus,
    pub auth: AuthConfig,
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

/// Gateway server configuration (mirrors GatewayConfig from tiffin-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Builds the route table:
/// - GET /health, GET /api/status, POST /api/public/request-pairing
/// - POST /api/admin/load-session (bearer auth)
/// - GET /ws
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/api/status", get(handlers::get_status))
        .route(
            "/api/public/request-pairing",
            post(handlers::post_request_pairing),
        )
        .route("/ws", get(ws::ws_handler))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/api/admin/load-session", post(handlers::post_load_session))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
}

/// Serves the gateway until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), TiffinError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TiffinError::Transport {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| TiffinError::Transport {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
