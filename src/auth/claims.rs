// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential claims and the request-scoped identities built from them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{policy, roles::Role};

/// Claims carried by a portal credential (HS256 JWT).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Numeric account id
    pub id: i64,

    pub email: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Role as issued; canonicalized, never trusted for access decisions
    #[serde(default)]
    pub role: String,

    /// Expiration timestamp
    pub exp: i64,

    /// Issued at timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Identity established by the identity gate.
///
/// `claimed_role` is what the credential says. It is informational; the role
/// gate re-resolves the authoritative role before any access decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub claimed_role: Role,
}

impl AuthenticatedUser {
    /// Create from verified claims.
    pub fn from_claims(claims: CredentialClaims) -> Self {
        Self {
            id: claims.id,
            email: claims.email,
            name: claims.name,
            claimed_role: Role::canonicalize(&claims.role),
        }
    }
}

/// Identity after the role gate, carrying the role of record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedUser {
    pub identity: AuthenticatedUser,
    pub authoritative_role: Role,
}

impl AuthorizedUser {
    pub fn can_access_section(&self, section: &str) -> bool {
        policy::can_access_section(self.authoritative_role, section)
    }

    pub fn can_perform(&self, action: &str) -> bool {
        policy::can_perform(self.authoritative_role, action)
    }
}
