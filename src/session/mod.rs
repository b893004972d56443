// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Module
//!
//! Handshake sessions and the response wrapper that seals JSON bodies under
//! them.
//!
//! ## Flow
//!
//! 1. An authenticated client opens a handshake (`POST /v1/session/handshake`)
//!    naming its own handshake id and receives a session key.
//! 2. Later requests send `x-handshake-id: <id>`.
//! 3. When encryption is on, responses come back as `{"enc": {...}}`, sealed
//!    under the session key and bound to the handshake id and `Origin`.
//!
//! Sessions expire after ten minutes; clients re-handshake after expiry or a
//! server restart.

pub mod clock;
pub mod handshake;
pub mod wrapper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use handshake::{HandshakeSession, HandshakeStore, DEFAULT_CAPACITY, HANDSHAKE_TTL};
pub use wrapper::{
    handshake_required, EncryptionDirective, ResponseWrapper, WrapContext, ENCRYPTED_MARKER,
    HANDSHAKE_HEADER,
};
