// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::audit::{AuditEvent, AuditLog};
use crate::auth::directory::{IdentityStore, InMemoryDirectory};
use crate::config::GateConfig;
use crate::session::{Clock, HandshakeStore, ResponseWrapper, SystemClock};

/// Shared state handed to every gate and handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GateConfig>,
    pub handshakes: Arc<HandshakeStore>,
    pub directory: Arc<dyn IdentityStore>,
    pub audit: AuditLog,
    pub wrapper: ResponseWrapper,
}

impl AppState {
    /// Build state on the system clock.
    ///
    /// Returns the audit receiver; the caller spawns an `AuditDrain` on it.
    pub fn new(
        config: GateConfig,
        directory: Arc<dyn IdentityStore>,
    ) -> (Self, mpsc::Receiver<AuditEvent>) {
        Self::with_clock(config, directory, Arc::new(SystemClock))
    }

    /// Build state on the given clock.
    pub fn with_clock(
        config: GateConfig,
        directory: Arc<dyn IdentityStore>,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::Receiver<AuditEvent>) {
        let handshakes = Arc::new(HandshakeStore::with_clock(config.handshake_capacity, clock));
        let (audit, receiver) = AuditLog::bounded(config.audit_queue_capacity);
        let wrapper = ResponseWrapper::new(handshakes.clone(), config.encryption_enabled);

        let state = Self {
            config: Arc::new(config),
            handshakes,
            directory,
            audit,
            wrapper,
        };
        (state, receiver)
    }
}

impl Default for AppState {
    /// Default configuration over an empty in-memory directory. Audit events
    /// are dropped because nothing drains them.
    fn default() -> Self {
        Self::new(GateConfig::default(), Arc::new(InMemoryDirectory::default())).0
    }
}
