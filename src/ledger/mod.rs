// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger
//!
//! Users, their bank accounts and the transactions on those accounts.
//!
//! - `model`: rows and request payloads
//! - `store`: redb tables and the atomic unit of work
//! - `service`: the operations, each one unit of work
//! - `mask`: update-mask parsing
//! - `cache`: optional user cache for token validation

pub mod cache;
pub mod error;
pub mod mask;
pub mod model;
pub mod service;
pub mod store;

pub use cache::UserCache;
pub use error::{LedgerError, LedgerResult};
pub use service::{LedgerService, LedgerSettings};
pub use store::{LedgerStore, StoreError};
