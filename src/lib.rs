// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger Gate - users, bank accounts and transactions behind a JWT gate
//!
//! Every call passes through an authorization gate (token verification,
//! self-ownership, per-method role policy) before the ledger service runs it
//! as one atomic unit of work against an embedded redb store.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token codec, roles, access policy and the authorization gate
//! - `context` - Per-call deadline, cancellation and request id
//! - `error` - Transport-facing error taxonomy
//! - `ledger` - Users, accounts and transactions with balance invariants
//! - `config` / `state` - Environment configuration and wiring

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod ledger;
pub mod state;
