// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for gated handlers.
//!
//! The gates do the work; these only read what they left in the request
//! extensions.
//!
//! ```rust,ignore
//! async fn me(Auth(user): Auth) -> impl IntoResponse { /* AuthenticatedUser */ }
//! async fn access(Authorized(user): Authorized) -> impl IntoResponse { /* AuthorizedUser */ }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthenticatedUser, AuthorizedUser};

/// Identity established by `require_authenticated`.
pub struct Auth(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::Unauthorized)
    }
}

/// Identity plus role of record, established by `require_role`.
///
/// A handler using this on a route without a role gate always rejects.
pub struct Authorized(pub AuthorizedUser);

impl<S: Send + Sync> FromRequestParts<S> for Authorized {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthorizedUser>()
            .cloned()
            .map(Authorized)
            .ok_or(AuthError::Unauthorized)
    }
}
