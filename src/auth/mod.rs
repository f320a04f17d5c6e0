// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Token issuance and verification plus the per-method authorization gate.
//!
//! ## Auth Flow
//!
//! 1. `CreateUser` / `Login` return a signed HS256 token
//! 2. Clients send `Authorization: Bearer <token>`
//! 3. For every call the gate:
//!    - skips public methods (signup, login, token validation)
//!    - verifies signature, issuer and expiry via [`ClaimsCodec`]
//!    - allows callers acting on their own records
//!    - otherwise checks the caller's role against the [`AccessPolicy`]
//!
//! ## Security
//!
//! - Only HS256 is accepted; the secret comes from the environment
//! - No session state: a token is re-verified on every call
//! - Passwords are stored as Argon2id digests only

pub mod claims;
pub mod codec;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod ownership;
pub mod password;
pub mod policy;
pub mod roles;

pub use claims::{Claims, Identity};
pub use codec::{ClaimsCodec, JwtConfig};
pub use error::AuthError;
pub use extractor::BearerToken;
pub use gate::AuthorizationGate;
pub use ownership::{OwnedResource, OwnershipEnforcer};
pub use password::{Argon2Hasher, HashError, PasswordHasher};
pub use policy::{AccessPolicy, Method, PolicyError};
pub use roles::Role;
