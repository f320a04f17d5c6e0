// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request call context and the bridge from handlers into the gate.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::auth::{BearerToken, Identity, Method, OwnedResource};
use crate::context::CallContext;
use crate::error::ApiError;
use crate::ledger::{LedgerResult, LedgerService};
use crate::state::AppState;

/// Caller-supplied deadline for the whole call, in milliseconds.
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout-ms";

/// Set by `SetRequestIdLayer` when the caller did not send one.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

impl FromRequestParts<AppState> for CallContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let mut ctx = CallContext::new().with_parent(&state.shutdown);

        if let Some(id) = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
        {
            ctx = ctx.with_request_id(id);
        }

        if let Some(value) = parts.headers.get(REQUEST_TIMEOUT_HEADER) {
            let millis: u64 = value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .ok_or_else(|| {
                    ApiError::bad_request("Invalid request timeout").with_detail(
                        REQUEST_TIMEOUT_HEADER,
                        "must be a whole number of milliseconds",
                    )
                })?;
            ctx = ctx.with_timeout(Duration::from_millis(millis));
        }

        Ok(ctx)
    }
}

/// Send one ledger operation through the gate.
///
/// If the request future is dropped (client went away) the call context is
/// cancelled, so a unit of work still running on the blocking pool rolls
/// back instead of committing.
pub(crate) async fn run<P, T, F>(
    state: &AppState,
    ctx: CallContext,
    token: &BearerToken,
    method: Method,
    payload: P,
    op: F,
) -> Result<T, ApiError>
where
    P: OwnedResource + Send + 'static,
    T: Send + 'static,
    F: FnOnce(&LedgerService, &CallContext, Option<Identity>, P) -> LedgerResult<T>
        + Send
        + 'static,
{
    let _cancel_on_drop = ctx.cancellation_token().clone().drop_guard();

    let ledger = Arc::clone(&state.ledger);
    let handler_ctx = ctx.clone();
    state
        .gate
        .dispatch(&ctx, token.as_deref(), method, payload, move |caller, payload| {
            op(&ledger, &handler_ctx, caller, payload).map_err(ApiError::from)
        })
        .await
}
