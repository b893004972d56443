// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access policy endpoints.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{policy, Authorized, Role};

/// One role's policy entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PolicyEntry {
    pub role: Role,
    /// Section ids, `*` for all
    pub sections: Vec<String>,
    /// Action ids, `*` for all
    pub actions: Vec<String>,
}

impl PolicyEntry {
    fn of(role: Role) -> Self {
        let entry = policy::policy_for(role);
        Self {
            role,
            sections: entry.sections.iter().map(|s| s.to_string()).collect(),
            actions: entry.actions.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Response for GET /v1/access
#[derive(Debug, Serialize, ToSchema)]
pub struct AccessResponse {
    pub email: String,
    /// Role stated by the credential
    pub claimed_role: Role,
    /// Role of record used for every access decision
    pub authoritative_role: Role,
    pub policy: PolicyEntry,
}

/// The caller's role of record and what it grants.
#[utoipa::path(
    get,
    path = "/v1/access",
    tag = "Access",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Effective access", body = AccessResponse),
        (status = 401, description = "Unauthorized - invalid or missing credential"),
        (status = 403, description = "Account unknown or disabled"),
    )
)]
pub async fn get_access(Authorized(user): Authorized) -> Json<AccessResponse> {
    Json(AccessResponse {
        policy: PolicyEntry::of(user.authoritative_role),
        email: user.identity.email,
        claimed_role: user.identity.claimed_role,
        authoritative_role: user.authoritative_role,
    })
}

/// The full role policy table.
#[utoipa::path(
    get,
    path = "/v1/admin/policies",
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Policy table", body = [PolicyEntry]),
        (status = 401, description = "Unauthorized - invalid or missing credential"),
        (status = 403, description = "Forbidden - requires owner-admin or admin"),
    )
)]
pub async fn list_policies(Authorized(user): Authorized) -> Json<Vec<PolicyEntry>> {
    tracing::debug!(email = %user.identity.email, "Listing role policies");
    Json(Role::ALL.iter().copied().map(PolicyEntry::of).collect())
}
