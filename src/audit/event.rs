// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit records for gate decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;

/// Auditable gate actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditAction {
    // Identity gate
    #[serde(rename = "auth.missing_token")]
    MissingToken,
    #[serde(rename = "auth.invalid_token")]
    InvalidToken,
    #[serde(rename = "auth.misconfigured")]
    Misconfigured,
    #[serde(rename = "auth.account_disabled")]
    AccountDisabled,
    #[serde(rename = "auth.lookup_failed")]
    IdentityLookupFailed,

    // Role gate
    #[serde(rename = "rbac.unauthorized")]
    Unauthorized,
    #[serde(rename = "rbac.missing_user")]
    MissingUser,
    #[serde(rename = "rbac.lookup_failed")]
    RoleLookupFailed,
    #[serde(rename = "rbac.forbidden")]
    RoleDenied,

    // Handshake lifecycle
    #[serde(rename = "session.handshake_opened")]
    HandshakeOpened,
    #[serde(rename = "session.handshake_closed")]
    HandshakeClosed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::MissingToken => "auth.missing_token",
            AuditAction::InvalidToken => "auth.invalid_token",
            AuditAction::Misconfigured => "auth.misconfigured",
            AuditAction::AccountDisabled => "auth.account_disabled",
            AuditAction::IdentityLookupFailed => "auth.lookup_failed",
            AuditAction::Unauthorized => "rbac.unauthorized",
            AuditAction::MissingUser => "rbac.missing_user",
            AuditAction::RoleLookupFailed => "rbac.lookup_failed",
            AuditAction::RoleDenied => "rbac.forbidden",
            AuditAction::HandshakeOpened => "session.handshake_opened",
            AuditAction::HandshakeClosed => "session.handshake_closed",
        }
    }
}

/// Outcome recorded with an action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Denied,
    Error,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub status: AuditStatus,
    /// Request path the decision was about.
    pub resource: Option<String>,
    pub actor_email: Option<String>,
    pub actor_role: Option<Role>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Additional details as JSON.
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(action: AuditAction, status: AuditStatus) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action,
            status,
            resource: None,
            actor_email: None,
            actor_role: None,
            ip_address: None,
            user_agent: None,
            details: None,
        }
    }

    pub fn denied(action: AuditAction) -> Self {
        Self::new(action, AuditStatus::Denied)
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_actor(mut self, email: impl Into<String>, role: Role) -> Self {
        self.actor_email = Some(email.into());
        self.actor_role = Some(role);
        self
    }

    /// Set client address and user agent, when known.
    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
