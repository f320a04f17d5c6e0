// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Update masks: the list of field names an update is allowed to touch.

use std::collections::HashSet;
use std::hash::Hash;

use super::error::{LedgerError, LedgerResult};

/// A field that can be named in an update mask.
pub trait MaskField: Copy + Eq + Hash {
    /// Field names that exist but can never be updated.
    const IMMUTABLE: &'static [&'static str];

    fn parse(name: &str) -> Option<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Email,
    Password,
    Role,
}

impl MaskField for UserField {
    const IMMUTABLE: &'static [&'static str] = &["id", "created_at", "updated_at"];

    fn parse(name: &str) -> Option<Self> {
        match name {
            "email" => Some(UserField::Email),
            "password" => Some(UserField::Password),
            "role" => Some(UserField::Role),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionField {
    Amount,
}

impl MaskField for TransactionField {
    const IMMUTABLE: &'static [&'static str] = &[
        "id",
        "transaction_type",
        "account_id",
        "created_at",
        "updated_at",
    ];

    fn parse(name: &str) -> Option<Self> {
        match name {
            "amount" => Some(TransactionField::Amount),
            _ => None,
        }
    }
}

/// `transactionType` → `transaction_type`; snake_case passes through.
fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 4);
    for c in path.trim().chars() {
        if c.is_ascii_uppercase() {
            if !out.is_empty() {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Validate every path of a mask. Immutable fields are reported before
/// unknown ones, whatever their position in the mask.
pub fn parse_mask<F: MaskField>(paths: &[String]) -> LedgerResult<HashSet<F>> {
    let names: Vec<String> = paths.iter().map(|p| normalize(p)).collect();

    if let Some(name) = names.iter().find(|n| F::IMMUTABLE.contains(&n.as_str())) {
        return Err(LedgerError::ImmutableField(name.clone()));
    }

    names
        .iter()
        .map(|name| F::parse(name).ok_or_else(|| LedgerError::UnknownField(name.clone())))
        .collect()
}
