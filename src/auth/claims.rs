// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and the authenticated identity built from them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;
use crate::ledger::model::UserId;

/// Claims carried inside a signed access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: UserId,
    pub email: String,
    pub role: Role,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

/// Authenticated caller, reconstructed from a verified token on every call.
///
/// This is the primary type used by the gate and the ledger to represent
/// the caller. It is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    /// Token issue time (Unix seconds)
    pub issued_at: i64,
    /// Token expiration (Unix seconds)
    pub expires_at: i64,
    #[serde(skip)]
    pub issuer: String,
}

impl Identity {
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            issued_at: claims.iat,
            expires_at: claims.exp,
            issuer: claims.iss,
        }
    }

    /// Check if the caller has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    /// Whether the caller is the owner of `user_id`.
    pub fn owns(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}
