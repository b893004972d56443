// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-wide handshake session table.
//!
//! Maps a client-chosen handshake id to the symmetric key used to seal that
//! session's responses. Entries live for [`HANDSHAKE_TTL`] and are evicted
//! lazily: an expired entry is removed by the lookup that finds it. The table
//! is bounded; when full, the least recently used session is dropped and the
//! client has to handshake again.
//!
//! Nothing is persisted. A restart empties the table.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;

use super::clock::{Clock, SystemClock};
use crate::crypto::EnvelopeKey;

/// Lifetime of a handshake session.
pub const HANDSHAKE_TTL: Duration = Duration::minutes(10);

/// Default maximum number of live sessions.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// One established handshake.
#[derive(Debug, Clone)]
pub struct HandshakeSession {
    pub handshake_id: String,
    pub key: EnvelopeKey,
    pub key_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Bounded, TTL-expiring handshake table.
pub struct HandshakeStore {
    sessions: Mutex<LruCache<String, HandshakeSession>>,
    clock: Arc<dyn Clock>,
}

impl HandshakeStore {
    /// Create an empty store on the system clock.
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    /// Create an empty store on the given clock.
    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
            clock,
        }
    }

    /// Store a session, replacing any previous one with the same id.
    pub fn issue(
        &self,
        handshake_id: impl Into<String>,
        key: EnvelopeKey,
        key_id: impl Into<String>,
    ) -> HandshakeSession {
        let session = HandshakeSession {
            handshake_id: handshake_id.into(),
            key,
            key_id: key_id.into(),
            expires_at: self.clock.now() + HANDSHAKE_TTL,
        };

        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.put(session.handshake_id.clone(), session.clone());
        }

        tracing::debug!(
            handshake_id = %session.handshake_id,
            key_id = %session.key_id,
            expires_at = %session.expires_at,
            "Handshake issued"
        );
        session
    }

    /// Look up a live session.
    ///
    /// Returns `None` if absent or expired; an expired entry is removed.
    pub fn resolve(&self, handshake_id: &str) -> Option<HandshakeSession> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().ok()?;

        let session = sessions.get(handshake_id)?;
        if session.expires_at > now {
            return Some(session.clone());
        }

        sessions.pop(handshake_id);
        tracing::debug!(handshake_id, "Expired handshake evicted");
        None
    }

    /// Drop a session. Returns whether one was present.
    pub fn invalidate(&self, handshake_id: &str) -> bool {
        match self.sessions.lock() {
            Ok(mut sessions) => sessions.pop(handshake_id).is_some(),
            Err(_) => false,
        }
    }

    /// Number of entries held, expired ones included until looked up.
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
