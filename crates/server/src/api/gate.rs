//! Gate scan handler.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use turnstile_core::gate::{ScanMode, ScanResult};
use turnstile_core::Operation;

use crate::metrics::GATE_SCANS_TOTAL;
use crate::state::AppState;

use super::error::ApiError;
use super::middleware::{require, Actor};

/// Request body for a gate scan
#[derive(Debug, Deserialize)]
pub struct ScanBody {
    /// Raw QR payload: a bare code or a full magic link
    pub payload: String,
    #[serde(default = "default_mode")]
    pub mode: ScanMode,
}

fn default_mode() -> ScanMode {
    ScanMode::Entry
}

/// Process one scan.
///
/// Denied scans answer 409 so a dumb scanner can color its light off the
/// status code alone; the body always carries the full decision.
pub async fn scan(
    State(state): State<Arc<AppState>>,
    Actor(identity): Actor,
    Json(body): Json<ScanBody>,
) -> Result<Response, ApiError> {
    require(&identity, Operation::ScanTickets)?;

    let result = state
        .gate()
        .scan(&body.payload, body.mode, &identity.user_id)?;

    GATE_SCANS_TOTAL
        .with_label_values(&[result.mode.as_str(), result.outcome.as_str()])
        .inc();

    Ok(scan_response(result))
}

fn scan_response(result: ScanResult) -> Response {
    let status = if result.allowed {
        StatusCode::OK
    } else {
        StatusCode::CONFLICT
    };
    (status, Json(result)).into_response()
}
