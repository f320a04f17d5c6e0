// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the bearer token.
//!
//! The extractor never rejects a missing or blank header: whether a token is
//! required depends on the method being called, which only the gate knows.
//!
//! ```rust,ignore
//! async fn handler(token: BearerToken, State(state): State<AppState>) {
//!     state.gate.dispatch(ctx, token.as_deref(), Method::ListUsers, &req, handler).await
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::AuthError;

/// Token taken from the `Authorization` header.
///
/// - `None`: header absent
/// - `Some("")`: header present but blank (after stripping `Bearer`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Parse a raw header value. Accepts `Bearer <token>` or a bare token.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        let token = match value.get(..7) {
            Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => value[7..].trim(),
            _ if value.eq_ignore_ascii_case("bearer") => "",
            _ => value,
        };
        BearerToken(Some(token.to_string()))
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.headers.get(AUTHORIZATION) {
            None => Ok(BearerToken(None)),
            Some(header) => {
                let raw = header.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
                Ok(BearerToken::parse(raw))
            }
        }
    }
}
