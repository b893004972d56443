// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound response encryption.
//!
//! The identity gate captures a [`WrapContext`] from the request and, once the
//! handler has produced its response, hands both to
//! [`ResponseWrapper::wrap`]. The decision is made exactly once per response:
//!
//! 1. `EncryptionDirective::Skip` on the response: sent as is.
//! 2. Feature flag off and no `EncryptionDirective::Force`: sent as is.
//! 3. Not a JSON response, or already carrying the `enc` marker: sent as is.
//! 4. No live handshake for the `x-handshake-id` header: the body is dropped
//!    and the client gets `426 {"error":"Handshake required"}`.
//! 5. Otherwise the body becomes `{"enc": <bundle>}`, sealed under the
//!    session key with `[handshake_id, origin]` as associated data.
//!
//! A body that cannot be sealed is never sent in clear.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE, ORIGIN},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use super::handshake::HandshakeStore;
use crate::crypto::{self, Bundle};
use crate::error::ApiError;

/// Request header naming the client's handshake.
pub const HANDSHAKE_HEADER: &str = "x-handshake-id";

/// Top-level key marking a body as already encrypted.
pub const ENCRYPTED_MARKER: &str = "enc";

/// Largest handler body the wrapper will buffer.
const MAX_WRAPPED_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Per-response override, set as a response extension by handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionDirective {
    /// Never encrypt this response (handshake bootstrap, gate rejections).
    Skip,
    /// Encrypt even when the feature flag is off.
    Force,
}

/// Request-side inputs to the encryption decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrapContext {
    pub handshake_id: Option<String>,
    pub origin: String,
}

impl WrapContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let handshake_id = headers
            .get(HANDSHAKE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let origin = headers
            .get(ORIGIN)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Self {
            handshake_id,
            origin,
        }
    }
}

#[derive(Serialize)]
struct EncryptedBody {
    enc: Bundle,
}

/// Seals handler output under the request's handshake key.
#[derive(Clone)]
pub struct ResponseWrapper {
    handshakes: Arc<HandshakeStore>,
    encryption_enabled: bool,
}

impl ResponseWrapper {
    pub fn new(handshakes: Arc<HandshakeStore>, encryption_enabled: bool) -> Self {
        Self {
            handshakes,
            encryption_enabled,
        }
    }

    pub fn encryption_enabled(&self) -> bool {
        self.encryption_enabled
    }

    /// Apply the encryption decision to one response.
    pub async fn wrap(&self, ctx: &WrapContext, response: Response) -> Response {
        let directive = response.extensions().get::<EncryptionDirective>().copied();
        match directive {
            Some(EncryptionDirective::Skip) => return response,
            Some(EncryptionDirective::Force) => {}
            None if !self.encryption_enabled => return response,
            None => {}
        }

        if !is_json(response.headers()) {
            return response;
        }

        let (mut parts, body) = response.into_parts();
        let bytes = match to_bytes(body, MAX_WRAPPED_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to buffer response body for encryption");
                return encryption_failed();
            }
        };

        let document: Value = match serde_json::from_slice(&bytes) {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(error = %e, "Handler emitted invalid JSON; refusing to send it");
                return encryption_failed();
            }
        };

        if is_already_encrypted(&document) {
            return Response::from_parts(parts, Body::from(bytes));
        }

        let Some(session) = ctx
            .handshake_id
            .as_deref()
            .and_then(|id| self.handshakes.resolve(id))
        else {
            tracing::debug!(
                handshake_id = ?ctx.handshake_id,
                "No live handshake; discarding response body"
            );
            return handshake_required();
        };

        let aad = [session.handshake_id.as_str(), ctx.origin.as_str()];
        let sealed = crypto::encrypt(&document, session.key.as_bytes(), &session.key_id, &aad)
            .map_err(|e| e.to_string())
            .and_then(|enc| {
                serde_json::to_vec(&EncryptedBody { enc }).map_err(|e| e.to_string())
            });

        match sealed {
            Ok(body) => {
                parts.headers.remove(CONTENT_LENGTH);
                Response::from_parts(parts, Body::from(body))
            }
            Err(e) => {
                tracing::error!(error = %e, "Response encryption failed");
                encryption_failed()
            }
        }
    }
}

/// `426 Upgrade Required` sent in place of a body that needs a handshake.
pub fn handshake_required() -> Response {
    ApiError::new(StatusCode::UPGRADE_REQUIRED, "Handshake required").into_response()
}

fn encryption_failed() -> Response {
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Response could not be encrypted",
    )
    .into_response()
}

/// `application/json` or any `application/*+json`, parameters ignored.
fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.split_once('/') {
        Some(("application", "json")) => true,
        Some(("application", subtype)) => subtype.ends_with("+json"),
        _ => false,
    }
}

fn is_already_encrypted(document: &Value) -> bool {
    document
        .as_object()
        .is_some_and(|object| object.contains_key(ENCRYPTED_MARKER))
}
