// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The authorization gate in front of every ledger method.
//!
//! ## Evaluation order
//!
//! 1. Public method (no policy entry): allowed, token not inspected
//! 2. Token required: missing or blank header is `Unauthenticated`
//! 3. Token verified by the [`ClaimsCodec`]
//! 4. Caller owns the payload's target: allowed regardless of role
//! 5. Caller's role must be allowed for the method (`ROOT` always is)
//!
//! Every call is evaluated on its own; nothing about a caller is remembered
//! between calls.

use std::any::Any;
use std::sync::Arc;

use super::{
    AccessPolicy, AuthError, ClaimsCodec, Identity, Method, OwnedResource, OwnershipEnforcer,
};
use crate::context::CallContext;
use crate::error::ApiError;

pub struct AuthorizationGate {
    codec: Arc<ClaimsCodec>,
    policy: AccessPolicy,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

impl AuthorizationGate {
    pub fn new(codec: Arc<ClaimsCodec>, policy: AccessPolicy) -> Self {
        Self { codec, policy }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Decide whether the bearer of `token` may call `method` with `payload`.
    ///
    /// Returns the caller's identity for gated methods and `None` for public
    /// ones.
    pub fn authorize<P>(
        &self,
        token: Option<&str>,
        method: Method,
        payload: &P,
    ) -> Result<Option<Identity>, AuthError>
    where
        P: OwnedResource + ?Sized,
    {
        let Some(allowed) = self.policy.allowed_roles(method) else {
            return Ok(None);
        };

        let token = token.ok_or(AuthError::MissingAuthHeader)?.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyAuthHeader);
        }

        let identity = self.codec.verify(token)?;

        if payload.is_owned_by(&identity) {
            tracing::debug!(
                method = %method,
                user_id = identity.user_id,
                "allowed by self-ownership"
            );
            return Ok(Some(identity));
        }

        if identity.role.satisfies_any(allowed) {
            return Ok(Some(identity));
        }

        Err(AuthError::PermissionDenied {
            method: method.to_string(),
            user_id: identity.user_id,
            email: identity.email,
            role: identity.role,
        })
    }

    /// Authorize, then run `handler` on the blocking pool.
    ///
    /// A context that is already canceled or past its deadline is rejected
    /// before anything else. A panic inside `handler` is logged here and
    /// returned as an opaque internal error.
    pub async fn dispatch<P, T, F>(
        &self,
        ctx: &CallContext,
        token: Option<&str>,
        method: Method,
        payload: P,
        handler: F,
    ) -> Result<T, ApiError>
    where
        P: OwnedResource + Send + 'static,
        T: Send + 'static,
        F: FnOnce(Option<Identity>, P) -> Result<T, ApiError> + Send + 'static,
    {
        let request_id = ctx.request_id();
        ctx.check()?;

        let caller = self.authorize(token, method, &payload).map_err(|e| {
            match &e {
                AuthError::PermissionDenied { user_id, role, .. } => tracing::warn!(
                    method = %method,
                    request_id = %request_id,
                    user_id,
                    role = %role,
                    "permission denied"
                ),
                other => tracing::debug!(
                    method = %method,
                    request_id = %request_id,
                    error = %other,
                    "unauthenticated call rejected"
                ),
            }
            e
        })?;

        match tokio::task::spawn_blocking(move || handler(caller, payload)).await {
            Ok(result) => result,
            Err(join) if join.is_panic() => {
                let payload = join.into_panic();
                tracing::error!(
                    method = %method,
                    request_id = %request_id,
                    panic = %panic_message(&*payload),
                    "handler panicked"
                );
                Err(ApiError::internal())
            }
            Err(join) => {
                tracing::error!(
                    method = %method,
                    request_id = %request_id,
                    error = %join,
                    "handler task did not complete"
                );
                Err(ApiError::internal())
            }
        }
    }
}
