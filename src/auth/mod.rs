// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Identity and role gates for the portal API.
//!
//! ## Auth Flow
//!
//! 1. The portal frontend signs the user in and receives an HS256 credential
//! 2. Requests carry it as `Authorization: Bearer <credential>` or in the
//!    credential cookie
//! 3. The identity gate:
//!    - verifies signature and expiry against `JWT_SECRET`
//!    - rejects accounts disabled in the identity store
//!    - records the *claimed* role from the credential
//! 4. The role gate, where mounted:
//!    - resolves the *authoritative* role from the identity store
//!    - admits only roles in the route's allowed set
//!
//! ## Security
//!
//! - The claimed role never decides access
//! - Every rejection is audited
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod credential;
pub mod directory;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod policy;
pub mod roles;

pub use claims::{AuthenticatedUser, AuthorizedUser, CredentialClaims};
pub use directory::{IdentityStore, InMemoryDirectory};
pub use error::AuthError;
pub use extractor::{Auth, Authorized};
pub use middleware::{require_authenticated, require_role, RoleGate};
pub use roles::{Role, RoleSet};
