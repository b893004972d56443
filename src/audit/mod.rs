// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Audit Module
//!
//! Audit trail for authentication and authorization decisions. Every gate
//! rejection and every handshake open/close is recorded. Recording is
//! fire-and-forget: a failure to audit never changes a request's outcome.

pub mod dispatch;
pub mod event;

pub use dispatch::{AuditDrain, AuditLog, AuditSink, TracingSink, DEFAULT_QUEUE_CAPACITY};
pub use event::{AuditAction, AuditEvent, AuditStatus};
