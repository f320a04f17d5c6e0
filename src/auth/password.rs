// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing behind a small trait.
//!
//! The ledger only ever sees `hash(secret) -> digest` and
//! `verify(digest, secret) -> bool`. The production implementation is
//! Argon2id with PHC-format digests.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Algorithm, Argon2, Params, PasswordHasher as _, PasswordVerifier as _, Version,
};

#[derive(Debug, thiserror::Error)]
#[error("hash password failed: {0}")]
pub struct HashError(String);

pub trait PasswordHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, HashError>;

    /// `false` on mismatch and on malformed digests.
    fn verify(&self, digest: &str, secret: &str) -> bool;
}

/// Argon2id hasher.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Hasher with explicit cost parameters (memory KiB, iterations, lanes).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, HashError> {
        let params =
            Params::new(m_cost, t_cost, p_cost, None).map_err(|e| HashError(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| HashError(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, digest: &str, secret: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed) => self
                .argon2()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "stored password digest is malformed");
                false
            }
        }
    }
}
