// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Static role policy table.
//!
//! Each role has exactly one entry listing the portal sections it may open
//! and the actions it may perform. `*` grants everything.

use serde::Serialize;

use super::roles::Role;

/// Wildcard member granting every section or action.
pub const WILDCARD: &str = "*";

/// Sections and actions a role may touch.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RolePolicy {
    pub sections: &'static [&'static str],
    pub actions: &'static [&'static str],
}

impl RolePolicy {
    pub fn allows_section(&self, section: &str) -> bool {
        grants(self.sections, section)
    }

    pub fn allows_action(&self, action: &str) -> bool {
        grants(self.actions, action)
    }
}

fn grants(members: &[&str], wanted: &str) -> bool {
    members
        .iter()
        .any(|member| *member == WILDCARD || member.eq_ignore_ascii_case(wanted))
}

const OWNER_ADMIN: RolePolicy = RolePolicy {
    sections: &[WILDCARD],
    actions: &[WILDCARD],
};

const ADMIN: RolePolicy = RolePolicy {
    sections: &["dashboard", "forms", "policies", "tickets", "guides", "users", "audit"],
    actions: &[
        "view",
        "create",
        "edit",
        "delete",
        "publish",
        "approve",
        "manage_users",
    ],
};

const EDITOR: RolePolicy = RolePolicy {
    sections: &["dashboard", "forms", "policies", "tickets", "guides"],
    actions: &["view", "create", "edit", "publish"],
};

const PLANNER: RolePolicy = RolePolicy {
    sections: &["dashboard", "forms", "tickets", "guides"],
    actions: &["view", "create", "edit", "approve"],
};

const BASIC_USER: RolePolicy = RolePolicy {
    sections: &["dashboard", "forms", "tickets", "guides"],
    actions: &["view", "create"],
};

/// The policy entry for a role.
pub fn policy_for(role: Role) -> &'static RolePolicy {
    match role {
        Role::OwnerAdmin => &OWNER_ADMIN,
        Role::Admin => &ADMIN,
        Role::Editor => &EDITOR,
        Role::Planner => &PLANNER,
        Role::BasicUser => &BASIC_USER,
    }
}

/// Whether `role` may open `section`.
pub fn can_access_section(role: Role, section: &str) -> bool {
    policy_for(role).allows_section(section)
}

/// Whether `role` may perform `action`.
pub fn can_perform(role: Role, action: &str) -> bool {
    policy_for(role).allows_action(action)
}
