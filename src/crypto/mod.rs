// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Cryptography Module
//!
//! Authenticated encryption for response envelopes (AES-256-GCM via `ring`).
//! Keys are 32 bytes; nonces are drawn fresh from the system CSPRNG for every
//! envelope.

pub mod envelope;

pub use envelope::{decrypt, encrypt, Bundle, EnvelopeError, EnvelopeKey, ALGORITHM, KEY_LEN};
