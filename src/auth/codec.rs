// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Issue and verify signed access tokens.
//!
//! Tokens are compact HS256 JWTs carrying the user id (`sub`), email, role,
//! issue time, expiry and issuer. Verification is a pure function of the
//! token, the configured secret/issuer and the clock: no storage access.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, Claims, Identity, Role};
use crate::ledger::model::{User, UserId};

/// The only signing scheme accepted on verification.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Signing configuration, supplied from the environment.
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    /// Token lifetime
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("duration", &self.duration)
            .finish()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

/// Wire shape of the claims; `sub` is a string per RFC 7519.
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    sub: String,
    email: String,
    role: Role,
    iat: i64,
    exp: i64,
    iss: String,
}

pub struct ClaimsCodec {
    issuer: String,
    duration: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl ClaimsCodec {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            duration: config.duration,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issue a token for `user`, valid for the configured duration from now.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        self.issue_at(user, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (Unix seconds).
    pub fn issue_at(&self, user: &User, now: i64) -> Result<String, AuthError> {
        let lifetime = i64::try_from(self.duration.as_secs())
            .map_err(|_| AuthError::TokenGeneration("token lifetime out of range".into()))?;

        let claims = JwtClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now.saturating_add(lifetime),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Verify `token` against the current time.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify `token` as if the current time were `now` (Unix seconds).
    ///
    /// The signature is checked first; expiry is checked afterwards so that a
    /// forged token is always reported as invalid, never as expired.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Identity, AuthError> {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        let token_data = decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AuthError::TokenInvalid("signature mismatch".into())
                }
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => {
                    AuthError::TokenInvalid("unexpected signing method".into())
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    AuthError::TokenInvalid("unexpected issuer".into())
                }
                _ => AuthError::TokenInvalid("malformed token".into()),
            })?;

        let claims = token_data.claims;
        if now > claims.exp {
            return Err(AuthError::TokenExpired);
        }

        let sub: UserId = claims
            .sub
            .parse()
            .map_err(|_| AuthError::TokenInvalid("malformed subject".into()))?;

        Ok(Identity::from_claims(Claims {
            sub,
            email: claims.email,
            role: claims.role,
            iat: claims.iat,
            exp: claims.exp,
            iss: claims.iss,
        }))
    }
}
