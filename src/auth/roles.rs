// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Root` - Superuser, satisfies every method policy
/// - `Admin` - Operator access to other users' records
/// - `User` - Normal user, acts on its own records through self-ownership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Superuser
    Root,
    /// Administrative access
    Admin,
    /// Normal user (owns accounts)
    User,
}

impl Role {
    /// Check if this role satisfies a method that allows `required`.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            // Root can do anything
            (Role::Root, _) => true,
            (Role::Admin, Role::Admin) => true,
            (Role::User, Role::User) => true,
            _ => false,
        }
    }

    /// Check if this role satisfies any of the allowed roles.
    pub fn satisfies_any(&self, allowed: &[Role]) -> bool {
        *self == Role::Root || allowed.iter().any(|role| self.has_privilege(*role))
    }

    /// Roles allowed to change other users' roles.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Root | Role::Admin)
    }

    /// Parse role from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Role> {
        match s.to_uppercase().as_str() {
            "ROOT" => Some(Role::Root),
            "ADMIN" => Some(Role::Admin),
            "USER" => Some(Role::User),
            _ => None,
        }
    }
}

impl Default for Role {
    /// Default role is User (least privilege).
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Root => write!(f, "ROOT"),
            Role::Admin => write!(f, "ADMIN"),
            Role::User => write!(f, "USER"),
        }
    }
}
