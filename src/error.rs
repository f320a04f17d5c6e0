// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transport-facing error taxonomy.
//!
//! Every failure in the service ends up as an [`ApiError`]: a stable
//! [`ErrorKind`], a stable snake_case `code`, a human-readable message and an
//! optional map of field-level details. Domain errors (`LedgerError`,
//! `AuthError`) convert into it via `From`.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::context::ContextError;

/// Message returned to callers for every internal failure.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Small, closed set of error kinds exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing input
    BadRequest,
    /// Missing, invalid or expired token
    Unauthenticated,
    /// Authenticated but not allowed to call the method
    PermissionDenied,
    /// User, account or transaction absent
    NotFound,
    /// Uniqueness violation
    Conflict,
    /// Store failure, unexpected fault or recovered panic
    Internal,
    /// Call canceled before or during execution
    Canceled,
    /// Call deadline passed before or during execution
    DeadlineExceeded,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            // 499 Client Closed Request (nginx convention)
            ErrorKind::Canceled => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::REQUEST_TIMEOUT)
            }
            ErrorKind::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
            ErrorKind::Canceled => "canceled",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
    pub details: BTreeMap<String, String>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    error: String,
    error_code: String,
    kind: ErrorKind,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    details: BTreeMap<String, String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    /// Attach a field-level detail (field name → description).
    pub fn with_detail(mut self, field: impl Into<String>, description: impl Into<String>) -> Self {
        self.details.insert(field.into(), description.into());
        self
    }

    pub fn with_details(mut self, details: BTreeMap<String, String>) -> Self {
        self.details.extend(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, "bad_request", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, "not_found", message)
    }

    /// Opaque internal error. The detail is never sent to the caller.
    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal, "internal", INTERNAL_MESSAGE)
    }

    pub fn canceled() -> Self {
        Self::new(ErrorKind::Canceled, "canceled", "Request was canceled")
    }

    pub fn deadline_exceeded() -> Self {
        Self::new(
            ErrorKind::DeadlineExceeded,
            "deadline_exceeded",
            "Request deadline exceeded",
        )
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code.to_string(),
            kind: self.kind,
            details: self.details,
        });
        (status, body).into_response()
    }
}

impl From<ContextError> for ApiError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Canceled => ApiError::canceled(),
            ContextError::DeadlineExceeded => ApiError::deadline_exceeded(),
        }
    }
}
