// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Portal roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Portal roles.
///
/// Roles are not ranked. What a role may do is decided only by its entry in
/// the policy table (see [`super::policy`]).
///
/// - `OwnerAdmin` - Tenant owner, unrestricted
/// - `Admin` - Portal administration, user management
/// - `Editor` - Authors and publishes content
/// - `Planner` - Plans and approves forms and tickets
/// - `BasicUser` - Everyone else (least privilege)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    OwnerAdmin,
    Admin,
    Editor,
    Planner,
    BasicUser,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 5] = [
        Role::OwnerAdmin,
        Role::Admin,
        Role::Editor,
        Role::Planner,
        Role::BasicUser,
    ];

    /// Map any string onto a known role.
    ///
    /// Matching ignores case, whitespace, underscores and hyphens, so
    /// `"Owner_Admin"`, `"owner admin"` and `"OWNER-ADMIN"` are all
    /// `OwnerAdmin`. Anything unrecognized is `BasicUser`.
    pub fn canonicalize(raw: &str) -> Role {
        let folded: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match folded.as_str() {
            "owneradmin" => Role::OwnerAdmin,
            "admin" => Role::Admin,
            "editor" => Role::Editor,
            "planner" => Role::Planner,
            _ => Role::BasicUser,
        }
    }

    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::OwnerAdmin => "owner-admin",
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Planner => "planner",
            Role::BasicUser => "basic-user",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Role::OwnerAdmin => 1 << 0,
            Role::Admin => 1 << 1,
            Role::Editor => 1 << 2,
            Role::Planner => 1 << 3,
            Role::BasicUser => 1 << 4,
        }
    }
}

impl Default for Role {
    /// Default role is BasicUser (least privilege).
    fn default() -> Self {
        Role::BasicUser
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A route's allowed roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub fn of(roles: &[Role]) -> Self {
        Self(roles.iter().fold(0, |acc, role| acc | role.bit()))
    }

    /// Any authenticated role.
    pub fn all() -> Self {
        Self::of(&Role::ALL)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|role| self.contains(*role))
    }
}
