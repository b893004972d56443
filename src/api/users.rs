// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, AuthenticatedUser, Role};

/// Response for GET /v1/users/me
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMeResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    /// Role as stated by the credential, not the role of record
    pub claimed_role: Role,
}

impl From<AuthenticatedUser> for UserMeResponse {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            claimed_role: user.claimed_role,
        }
    }
}

/// Get the current authenticated user's information.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = UserMeResponse),
        (status = 401, description = "Unauthorized - invalid or missing credential"),
        (status = 403, description = "Account disabled"),
        (status = 426, description = "Encryption enabled and no live handshake"),
    )
)]
pub async fn get_current_user(Auth(user): Auth) -> Json<UserMeResponse> {
    Json(user.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_me_response_from_authenticated_user() {
        let user = AuthenticatedUser {
            id: 42,
            email: "ana@example.com".to_string(),
            name: "Ana".to_string(),
            claimed_role: Role::Planner,
        };

        let response: UserMeResponse = user.into();
        assert_eq!(response.id, 42);
        assert_eq!(response.email, "ana@example.com");
        assert_eq!(response.claimed_role, Role::Planner);
    }
}
