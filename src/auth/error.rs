// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;

use crate::session::EncryptionDirective;

/// Gate rejection.
///
/// Messages are deliberately coarse: an invalid credential reads the same
/// whether the signature, the expiry or the encoding was wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No bearer header and no credential cookie
    MissingCredential,
    /// Signature, expiry or format check failed, or the account lookup failed
    InvalidCredential,
    /// Signing secret not configured
    ServerMisconfigured,
    /// Account disabled in the identity store
    AccountDisabled,
    /// Role gate reached without an authenticated identity
    Unauthorized,
    /// Authoritative role missing or not allowed on this route
    Forbidden,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::InvalidCredential => "invalid_credential",
            AuthError::ServerMisconfigured => "server_misconfigured",
            AuthError::AccountDisabled => "account_disabled",
            AuthError::Unauthorized => "unauthorized",
            AuthError::Forbidden => "forbidden",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential
            | AuthError::InvalidCredential
            | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::AccountDisabled | AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::ServerMisconfigured => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredential => write!(f, "Authentication required"),
            AuthError::InvalidCredential => write!(f, "Invalid or expired credential"),
            AuthError::ServerMisconfigured => write!(f, "Server authentication is not configured"),
            AuthError::AccountDisabled => write!(f, "Account is disabled"),
            AuthError::Unauthorized => write!(f, "Not authenticated"),
            AuthError::Forbidden => write!(f, "Insufficient permissions for this operation"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        // Rejections are never sealed; they would otherwise turn into 426s.
        (status, Extension(EncryptionDirective::Skip), body).into_response()
    }
}
