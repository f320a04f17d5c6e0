// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-call context: deadline, cancellation and request id.
//!
//! The transport builds one [`CallContext`] per inbound call. The gate checks
//! it before dispatch and the ledger checks it again right before committing
//! a unit of work, so a call that is already done never writes.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Why a call context is no longer live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("call was canceled")]
    Canceled,
    #[error("call deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone)]
pub struct CallContext {
    request_id: Uuid,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl CallContext {
    /// A context with no deadline and a fresh cancellation token.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Reuse an id assigned upstream (e.g. the `x-request-id` header).
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Tie this call to a parent token (e.g. server shutdown).
    pub fn with_parent(mut self, parent: &CancellationToken) -> Self {
        self.cancel = parent.child_token();
        self
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fails if the call was canceled or its deadline has passed.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.cancel.is_cancelled() {
            return Err(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_live() {
        assert!(CallContext::new().check().is_ok());
    }

    #[test]
    fn canceled_context_fails_check() {
        let ctx = CallContext::new();
        ctx.cancel();
        assert_eq!(ctx.check(), Err(ContextError::Canceled));
    }

    #[test]
    fn past_deadline_fails_check() {
        let ctx = CallContext::new().with_deadline(Instant::now() - Duration::from_millis(1));
        assert_eq!(ctx.check(), Err(ContextError::DeadlineExceeded));
    }

    #[test]
    fn parent_cancellation_propagates() {
        let parent = CancellationToken::new();
        let ctx = CallContext::new().with_parent(&parent);
        parent.cancel();
        assert_eq!(ctx.check(), Err(ContextError::Canceled));
    }
}
