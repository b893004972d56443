// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Handshake session endpoints.
//!
//! The client opens a handshake by sending its own opaque id in
//! `x-handshake-id`. The gate derives a session key for that id from the
//! configured master key and returns it in clear (the bootstrap response is
//! never sealed). The client keeps sending the same header and decrypts `enc`
//! bodies with the key, using `[handshake_id, origin]` as associated data.
//! Opening an id that is already live replaces its key.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::audit::{AuditAction, AuditEvent, AuditStatus};
use crate::auth::Auth;
use crate::crypto::ALGORITHM;
use crate::error::ApiError;
use crate::session::{EncryptionDirective, WrapContext, HANDSHAKE_HEADER};
use crate::state::AppState;

/// Longest handshake id a client may choose.
pub const MAX_HANDSHAKE_ID_LEN: usize = 128;

/// Response for POST /v1/session/handshake
#[derive(Debug, Serialize, ToSchema)]
pub struct HandshakeResponse {
    /// Echo of the client's `x-handshake-id`
    pub handshake_id: String,
    /// Base64 session key
    pub key: String,
    pub key_id: String,
    /// Always `A256GCM`
    pub alg: String,
    pub expires_at: DateTime<Utc>,
}

/// Open a handshake session.
#[utoipa::path(
    post,
    path = "/v1/session/handshake",
    tag = "Session",
    security(("bearer" = [])),
    params(("x-handshake-id" = String, Header, description = "Client-chosen handshake id")),
    responses(
        (status = 201, description = "Handshake opened", body = HandshakeResponse),
        (status = 400, description = "Missing, blank or oversized x-handshake-id header"),
        (status = 401, description = "Unauthorized - invalid or missing credential"),
        (status = 500, description = "Encryption key not configured"),
    )
)]
pub async fn open_handshake(
    State(state): State<AppState>,
    Auth(user): Auth,
    headers: HeaderMap,
) -> Response {
    let handshake_id = match client_handshake_id(&headers) {
        Ok(id) => id,
        Err(error) => return plain(error),
    };

    let master = match state.config.master_key() {
        Ok(key) => key,
        Err(e) => {
            tracing::error!(error = %e, "Cannot open handshake");
            return plain(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Encryption is not configured",
            ));
        }
    };

    let key = match master.derive(&handshake_id) {
        Ok(key) => key,
        Err(e) => {
            tracing::error!(error = %e, "Session key derivation failed");
            return plain(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Handshake could not be opened",
            ));
        }
    };

    let session = state
        .handshakes
        .issue(handshake_id, key, state.config.default_key_id.clone());

    state.audit.record(
        AuditEvent::new(AuditAction::HandshakeOpened, AuditStatus::Success)
            .with_resource("/v1/session/handshake")
            .with_actor(user.email.clone(), user.claimed_role)
            .with_details(serde_json::json!({ "handshake_id": session.handshake_id })),
    );

    let body = HandshakeResponse {
        key: session.key.to_base64(),
        key_id: session.key_id,
        alg: ALGORITHM.to_string(),
        expires_at: session.expires_at,
        handshake_id: session.handshake_id,
    };

    (
        StatusCode::CREATED,
        Extension(EncryptionDirective::Skip),
        Json(body),
    )
        .into_response()
}

/// Close the handshake named by `x-handshake-id`.
#[utoipa::path(
    delete,
    path = "/v1/session/handshake",
    tag = "Session",
    security(("bearer" = [])),
    params(("x-handshake-id" = String, Header, description = "Handshake to close")),
    responses(
        (status = 204, description = "Handshake closed (or already gone)"),
        (status = 400, description = "Missing, blank or oversized x-handshake-id header"),
        (status = 401, description = "Unauthorized - invalid or missing credential"),
    )
)]
pub async fn close_handshake(
    State(state): State<AppState>,
    Auth(user): Auth,
    headers: HeaderMap,
) -> Response {
    let handshake_id = match client_handshake_id(&headers) {
        Ok(id) => id,
        Err(error) => return plain(error),
    };

    let existed = state.handshakes.invalidate(&handshake_id);
    state.audit.record(
        AuditEvent::new(AuditAction::HandshakeClosed, AuditStatus::Success)
            .with_resource("/v1/session/handshake")
            .with_actor(user.email, user.claimed_role)
            .with_details(serde_json::json!({
                "handshake_id": handshake_id,
                "existed": existed,
            })),
    );

    StatusCode::NO_CONTENT.into_response()
}

/// The trimmed, non-blank handshake id the client sent.
fn client_handshake_id(headers: &HeaderMap) -> Result<String, ApiError> {
    if headers.get(HANDSHAKE_HEADER).is_some_and(|v| v.to_str().is_err()) {
        return Err(ApiError::bad_request("Invalid x-handshake-id header"));
    }
    let id = WrapContext::from_headers(headers)
        .handshake_id
        .ok_or_else(|| ApiError::bad_request("Missing x-handshake-id header"))?;
    if id.len() > MAX_HANDSHAKE_ID_LEN {
        return Err(ApiError::bad_request("x-handshake-id header is too long"));
    }
    Ok(id)
}

/// Error responses from these endpoints are never sealed.
fn plain(error: ApiError) -> Response {
    (Extension(EncryptionDirective::Skip), error).into_response()
}
