// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-method authorization policy.
//!
//! The policy table maps each [`Method`] to the roles allowed to call it.
//! A method with no entry (or an empty entry) is public. `ROOT` satisfies
//! every entry; callers acting on their own resources are allowed regardless
//! of role (see `AuthorizationGate`).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Role;

/// Callable service methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    CreateUser,
    Login,
    ValidateToken,
    UpdateUser,
    DeleteUser,
    ListUsers,
    CreateAccount,
    ListAccounts,
    CreateTransaction,
    ListTransactions,
    UpdateTransaction,
    DeleteTransaction,
}

impl Method {
    pub const ALL: [Method; 12] = [
        Method::CreateUser,
        Method::Login,
        Method::ValidateToken,
        Method::UpdateUser,
        Method::DeleteUser,
        Method::ListUsers,
        Method::CreateAccount,
        Method::ListAccounts,
        Method::CreateTransaction,
        Method::ListTransactions,
        Method::UpdateTransaction,
        Method::DeleteTransaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::CreateUser => "CreateUser",
            Method::Login => "Login",
            Method::ValidateToken => "ValidateToken",
            Method::UpdateUser => "UpdateUser",
            Method::DeleteUser => "DeleteUser",
            Method::ListUsers => "ListUsers",
            Method::CreateAccount => "CreateAccount",
            Method::ListAccounts => "ListAccounts",
            Method::CreateTransaction => "CreateTransaction",
            Method::ListTransactions => "ListTransactions",
            Method::UpdateTransaction => "UpdateTransaction",
            Method::DeleteTransaction => "DeleteTransaction",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse policy file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Role lists keyed by method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessPolicy {
    methods: HashMap<Method, Vec<Role>>,
}

impl AccessPolicy {
    /// A policy where every method is public.
    pub fn empty() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    pub fn with_method(mut self, method: Method, roles: impl IntoIterator<Item = Role>) -> Self {
        self.methods.insert(method, roles.into_iter().collect());
        self
    }

    /// Load a policy from a JSON file of the form
    /// `{ "UpdateUser": ["ADMIN"], "ListUsers": ["ADMIN"] }`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Roles allowed to call `method`; `None` means the method is public.
    pub fn allowed_roles(&self, method: Method) -> Option<&[Role]> {
        self.methods
            .get(&method)
            .map(Vec::as_slice)
            .filter(|roles| !roles.is_empty())
    }

    pub fn requires_auth(&self, method: Method) -> bool {
        self.allowed_roles(method).is_some()
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::empty()
            .with_method(Method::UpdateUser, [Role::Admin])
            .with_method(Method::DeleteUser, [Role::Admin])
            .with_method(Method::ListUsers, [Role::Admin])
            .with_method(Method::CreateAccount, [Role::Admin])
            .with_method(Method::ListAccounts, [Role::Admin])
            .with_method(Method::CreateTransaction, [Role::Admin])
            .with_method(Method::ListTransactions, [Role::Admin])
            .with_method(Method::UpdateTransaction, [Role::Admin])
            .with_method(Method::DeleteTransaction, [Role::Admin])
    }
}
