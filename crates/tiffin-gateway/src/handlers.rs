// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the dashboard REST API.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tiffin_core::ConnectionState;
use tiffin_whatsapp::StartOutcome;

use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Response body for GET /api/status.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: ConnectionState,
    pub halted: bool,
    pub last_authenticated_at: Option<DateTime<Utc>>,
    /// A pairing code is waiting to be scanned.
    pub pairing_available: bool,
}

/// Response body for the start triggers.
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub started: bool,
    pub message: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /api/status
pub async fn get_status(State(state): State<GatewayState>) -> Json<StatusResponse> {
    let snapshot = state.controller.snapshot();
    Json(StatusResponse {
        status: snapshot.state,
        halted: snapshot.halted,
        last_authenticated_at: snapshot.last_authenticated_at,
        pairing_available: snapshot.pairing_image.is_some(),
    })
}

/// POST /api/admin/load-session
///
/// Discards the stored session and starts a fresh pairing cycle.
pub async fn post_load_session(State(state): State<GatewayState>) -> Response {
    tracing::info!("operator requested a new session");
    state.bus.log("Admin requested session re-initialization.");
    start_fresh(&state).await
}

/// POST /api/public/request-pairing
///
/// Same as the admin trigger, but refused while already connected.
pub async fn post_request_pairing(State(state): State<GatewayState>) -> Response {
    if state.controller.state() == ConnectionState::Ready {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "WhatsApp is already connected".to_string(),
            }),
        )
            .into_response();
    }
    tracing::info!("public pairing request received");
    state
        .bus
        .log("Public QR request received. Initializing new session...");
    start_fresh(&state).await
}

async fn start_fresh(state: &GatewayState) -> Response {
    match state.controller.start(true).await {
        Ok(StartOutcome::Started) => (
            StatusCode::ACCEPTED,
            Json(StartResponse {
                started: true,
                message: "Initializing a new WhatsApp session".to_string(),
            }),
        )
            .into_response(),
        Ok(StartOutcome::AlreadyInProgress) => (
            StatusCode::CONFLICT,
            Json(StartResponse {
                started: false,
                message: "Initialization already in progress".to_string(),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}
