// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.

use axum::response::{IntoResponse, Response};

use super::Role;
use crate::error::{ApiError, ErrorKind};
use crate::ledger::model::UserId;

/// Authentication error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Authorization header present but blank
    EmptyAuthHeader,
    /// Authorization header is not valid text
    InvalidAuthHeader,
    /// Signature mismatch, undecodable token, wrong issuer or signing scheme
    TokenInvalid(String),
    /// Token is past its expiry
    TokenExpired,
    /// Signing a new token failed
    TokenGeneration(String),
    /// Authenticated, but the role does not allow the method
    PermissionDenied {
        method: String,
        user_id: UserId,
        email: String,
        role: Role,
    },
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::EmptyAuthHeader => "empty_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::TokenInvalid(_) => "token_invalid",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenGeneration(_) => "token_generation_failed",
            AuthError::PermissionDenied { .. } => "permission_denied",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::EmptyAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::TokenInvalid(_)
            | AuthError::TokenExpired => ErrorKind::Unauthenticated,
            AuthError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            AuthError::TokenGeneration(_) => ErrorKind::Internal,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "missing 'authorization' header"),
            AuthError::EmptyAuthHeader => write!(f, "empty 'authorization' header"),
            AuthError::InvalidAuthHeader => write!(f, "invalid 'authorization' header"),
            AuthError::TokenInvalid(reason) => write!(f, "Token invalid: {reason}"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenGeneration(msg) => write!(f, "Generate token failed: {msg}"),
            AuthError::PermissionDenied {
                method,
                user_id,
                email,
                role,
            } => write!(
                f,
                "permission denied: user {user_id} ({email}) with role {role} cannot call {method}"
            ),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenGeneration(ref msg) => {
                tracing::error!(error = %msg, "token generation failed");
                ApiError::internal()
            }
            AuthError::MissingAuthHeader | AuthError::EmptyAuthHeader => {
                let kind = err.kind();
                let code = err.error_code();
                ApiError::new(kind, code, err.to_string())
                    .with_detail("authorization", "Missing token")
            }
            _ => ApiError::new(err.kind(), err.error_code(), err.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn token_errors_are_unauthenticated() {
        assert_eq!(AuthError::TokenExpired.kind(), ErrorKind::Unauthenticated);
        assert_eq!(
            AuthError::TokenInvalid("bad signature".into()).kind(),
            ErrorKind::Unauthenticated
        );
        assert_eq!(AuthError::EmptyAuthHeader.kind(), ErrorKind::Unauthenticated);
    }

    #[test]
    fn permission_denied_names_method_and_caller() {
        let err = AuthError::PermissionDenied {
            method: "UpdateUser".to_string(),
            user_id: 7,
            email: "b@x.com".to_string(),
            role: Role::User,
        };
        let message = err.to_string();
        assert!(message.contains("UpdateUser"));
        assert!(message.contains("b@x.com"));
        assert!(message.contains("USER"));
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn token_generation_is_opaque() {
        let api: ApiError = AuthError::TokenGeneration("secret leaked?".into()).into();
        assert_eq!(api.kind, ErrorKind::Internal);
        assert!(!api.message.contains("secret"));
    }

    #[test]
    fn missing_auth_returns_401() {
        let response = AuthError::MissingAuthHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
