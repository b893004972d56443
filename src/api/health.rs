// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Credential signing secret: "ok" or "missing".
    pub signing_secret: String,
    /// Response encryption: "disabled", "ok" or "invalid_key".
    pub encryption: String,
    /// Live handshake sessions.
    pub handshakes: usize,
}

/// Health check endpoint handler.
///
/// Returns 200 if the gate can serve authenticated traffic, 503 otherwise.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is misconfigured", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let secret_ok = state.config.signing_secret.is_some();
    let encryption = if !state.wrapper.encryption_enabled() {
        "disabled"
    } else if state.config.master_key().is_ok() {
        "ok"
    } else {
        "invalid_key"
    };
    let all_ok = secret_ok && encryption != "invalid_key";

    let response = HealthResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            signing_secret: if secret_ok { "ok" } else { "missing" }.to_string(),
            encryption: encryption.to_string(),
            handshakes: state.handshakes.len(),
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
