// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pairing code channel: turns the raw payload issued by the network into
//! something a dashboard can display.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use qrcode::QrCode;
use qrcode::render::svg;
use tiffin_core::{PairingToken, TiffinError};

/// Side length, in pixels, of the rendered code.
const QR_SIZE: u32 = 256;

/// Renders a payload as an SVG QR code wrapped in a `data:` URL.
pub fn render_data_url(payload: &str) -> Result<String, TiffinError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| TiffinError::Pairing(format!("cannot encode pairing payload: {e}")))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(QR_SIZE, QR_SIZE)
        .build();
    Ok(format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(image.as_bytes())
    ))
}

/// Issues pairing tokens with monotonically increasing ids.
#[derive(Debug, Default)]
pub struct PairingChannel {
    last_id: u64,
    ttl: Duration,
}

impl PairingChannel {
    pub fn new(ttl: Duration) -> Self {
        Self { last_id: 0, ttl }
    }

    /// Creates a token for `payload`. Any previously issued token is stale.
    pub fn issue(&mut self, payload: String) -> PairingToken {
        self.last_id += 1;
        PairingToken {
            id: self.last_id,
            payload,
            created_at: Utc::now(),
            ttl: self.ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
