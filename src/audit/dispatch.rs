// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Non-blocking audit dispatch.
//!
//! Gates call [`AuditLog::record`], which only ever does a `try_send` into a
//! bounded queue. A full or closed queue drops the event and logs a warning;
//! it never blocks the request and never returns an error to it.
//! [`AuditDrain`] runs as a background task and forwards queued events to an
//! [`AuditSink`].

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::event::AuditEvent;

/// Default queue bound.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Destination for drained audit events.
pub trait AuditSink: Send + Sync {
    fn write(&self, event: &AuditEvent);
}

/// Emits audit events as structured logs on the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn write(&self, event: &AuditEvent) {
        info!(
            target: "audit",
            event_id = %event.event_id,
            timestamp = %event.timestamp,
            action = event.action.as_str(),
            status = ?event.status,
            resource = event.resource.as_deref(),
            actor_email = event.actor_email.as_deref(),
            actor_role = event.actor_role.map(|r| r.as_str()),
            ip_address = event.ip_address.as_deref(),
            user_agent = event.user_agent.as_deref(),
            details = event.details.as_ref().map(|d| d.to_string()),
            "audit event"
        );
    }
}

/// Producer handle shared by every request.
#[derive(Clone, Debug)]
pub struct AuditLog {
    sender: mpsc::Sender<AuditEvent>,
}

impl AuditLog {
    /// Create a log and the receiver its [`AuditDrain`] consumes.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<AuditEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Queue an event. Never blocks, never fails the caller.
    pub fn record(&self, event: AuditEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    action = event.action.as_str(),
                    event_id = %event.event_id,
                    "Audit queue full, event dropped"
                );
            }
            Err(TrySendError::Closed(event)) => {
                warn!(
                    action = event.action.as_str(),
                    event_id = %event.event_id,
                    "Audit drain stopped, event dropped"
                );
            }
        }
    }
}

/// Background task forwarding queued events to a sink.
pub struct AuditDrain {
    receiver: mpsc::Receiver<AuditEvent>,
    sink: Arc<dyn AuditSink>,
}

impl AuditDrain {
    pub fn new(receiver: mpsc::Receiver<AuditEvent>, sink: Arc<dyn AuditSink>) -> Self {
        Self { receiver, sink }
    }

    /// Forward events until cancelled or every producer is gone.
    ///
    /// On cancellation, events already queued are flushed before returning.
    ///
    /// ```rust,ignore
    /// tokio::spawn(drain.run(shutdown.clone()));
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Audit drain starting");

        loop {
            tokio::select! {
                event = self.receiver.recv() => match event {
                    Some(event) => self.sink.write(&event),
                    None => break,
                },
                _ = shutdown.cancelled() => {
                    while let Ok(event) = self.receiver.try_recv() {
                        self.sink.write(&event);
                    }
                    break;
                }
            }
        }

        info!("Audit drain shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::event::{AuditAction, AuditStatus};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySink(Mutex<Vec<AuditEvent>>);

    impl AuditSink for MemorySink {
        fn write(&self, event: &AuditEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn record_queues_event() {
        let (log, mut receiver) = AuditLog::bounded(4);
        log.record(AuditEvent::denied(AuditAction::MissingToken));

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.action, AuditAction::MissingToken);
    }

    #[test]
    fn full_queue_drops_without_failing() {
        let (log, mut receiver) = AuditLog::bounded(1);
        log.record(AuditEvent::denied(AuditAction::MissingToken));
        log.record(AuditEvent::denied(AuditAction::InvalidToken));

        assert_eq!(receiver.try_recv().unwrap().action, AuditAction::MissingToken);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn closed_queue_drops_without_failing() {
        let (log, receiver) = AuditLog::bounded(1);
        drop(receiver);
        log.record(AuditEvent::new(AuditAction::HandshakeOpened, AuditStatus::Success));
    }

    #[tokio::test]
    async fn drain_forwards_and_flushes_on_shutdown() {
        let (log, receiver) = AuditLog::bounded(8);
        let sink = Arc::new(MemorySink::default());
        let shutdown = CancellationToken::new();

        log.record(AuditEvent::denied(AuditAction::RoleDenied));
        log.record(AuditEvent::denied(AuditAction::MissingUser));
        shutdown.cancel();

        AuditDrain::new(receiver, sink.clone()).run(shutdown).await;

        let written = sink.0.lock().unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].action, AuditAction::RoleDenied);
        assert_eq!(written[1].action, AuditAction::MissingUser);
    }

    #[tokio::test]
    async fn drain_stops_when_producers_are_gone() {
        let (log, receiver) = AuditLog::bounded(8);
        let sink = Arc::new(MemorySink::default());

        log.record(AuditEvent::denied(AuditAction::Unauthorized));
        drop(log);

        AuditDrain::new(receiver, sink.clone())
            .run(CancellationToken::new())
            .await;
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }
}
