// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state, wired once at startup.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::{AccessPolicy, Argon2Hasher, AuthorizationGate, ClaimsCodec, PolicyError};
use crate::config::ServerConfig;
use crate::ledger::{LedgerService, LedgerSettings, LedgerStore, StoreError, UserCache};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to open ledger store: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerService>,
    pub gate: Arc<AuthorizationGate>,
    /// Cancelled on shutdown; every call context is a child of it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        ledger: Arc<LedgerService>,
        gate: Arc<AuthorizationGate>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ledger,
            gate,
            shutdown,
        }
    }

    /// Open the store at `config.ledger_path()` and wire every collaborator.
    pub fn from_config(
        config: &ServerConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, StartupError> {
        let store = Arc::new(LedgerStore::open(&config.ledger_path())?);

        let policy = match &config.policy_file {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading access policy");
                AccessPolicy::from_file(path)?
            }
            None => AccessPolicy::default(),
        };

        Ok(Self::assemble(store, config, policy, shutdown))
    }

    fn assemble(
        store: Arc<LedgerStore>,
        config: &ServerConfig,
        policy: AccessPolicy,
        shutdown: CancellationToken,
    ) -> Self {
        let codec = Arc::new(ClaimsCodec::new(&config.jwt));
        let settings = LedgerSettings {
            min_password_len: config.min_password_len,
        };

        let mut ledger = LedgerService::new(
            store,
            Arc::clone(&codec),
            Arc::new(Argon2Hasher::default()),
            settings,
        );
        if config.user_cache_capacity > 0 {
            ledger = ledger.with_user_cache(UserCache::new(
                config.user_cache_capacity,
                config.user_cache_ttl,
            ));
        }

        Self::new(
            Arc::new(ledger),
            Arc::new(AuthorizationGate::new(codec, policy)),
            shutdown,
        )
    }

    /// In-memory state with the default policy, for tests.
    #[cfg(test)]
    pub fn in_memory(config: &ServerConfig) -> Self {
        let store = Arc::new(LedgerStore::in_memory().expect("in-memory store"));
        Self::assemble(
            store,
            config,
            AccessPolicy::default(),
            CancellationToken::new(),
        )
    }
}
