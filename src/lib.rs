// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Portal Gate - request authentication and response confidentiality
//!
//! This crate verifies portal credentials, enforces per-route role sets
//! against the identity system of record, and optionally seals every JSON
//! response under a short-lived handshake session key.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `audit` - Gate decision audit trail
//! - `auth` - Identity gate, role gate and role policy
//! - `crypto` - AES-256-GCM envelope cipher
//! - `session` - Handshake sessions and the response wrapper

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod session;
pub mod state;
