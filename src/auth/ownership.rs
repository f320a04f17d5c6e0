// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership of call payloads.
//!
//! Request payloads that target a user's resources implement
//! [`OwnedResource`]; the gate compares the owner id with the caller's subject
//! to apply the self-ownership override.

use super::Identity;
use crate::ledger::model::UserId;

/// Trait for payloads that target resources owned by a user.
pub trait OwnedResource {
    /// The user who owns the targeted resource, if the payload names one.
    fn owner_user_id(&self) -> Option<UserId>;
}

/// Payloads that never name an owner (login, signup, token validation).
impl OwnedResource for () {
    fn owner_user_id(&self) -> Option<UserId> {
        None
    }
}

/// Trait for checking that a caller owns a payload's target.
pub trait OwnershipEnforcer {
    /// Whether `user` owns the payload's target.
    fn is_owned_by(&self, user: &Identity) -> bool;
}

impl<T: OwnedResource + ?Sized> OwnershipEnforcer for T {
    fn is_owned_by(&self, user: &Identity) -> bool {
        // Zero is never a real id and must not match anything.
        matches!(self.owner_user_id(), Some(owner) if owner != 0 && user.owns(owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    struct TestRequest {
        owner: Option<UserId>,
    }

    impl OwnedResource for TestRequest {
        fn owner_user_id(&self) -> Option<UserId> {
            self.owner
        }
    }

    fn make_user(user_id: UserId, role: Role) -> Identity {
        Identity {
            user_id,
            email: format!("user{user_id}@x.com"),
            role,
            issued_at: 0,
            expires_at: 0,
            issuer: "test".to_string(),
        }
    }

    #[test]
    fn ownership_verification_passes_for_owner() {
        let request = TestRequest { owner: Some(123) };
        let user = make_user(123, Role::User);

        assert!(request.is_owned_by(&user));
    }

    #[test]
    fn ownership_verification_fails_for_non_owner() {
        let request = TestRequest { owner: Some(123) };
        let user = make_user(456, Role::User);

        assert!(!request.is_owned_by(&user));
    }

    #[test]
    fn payload_without_owner_is_never_owned() {
        let request = TestRequest { owner: None };
        assert!(!request.is_owned_by(&make_user(1, Role::Root)));
        assert!(!().is_owned_by(&make_user(1, Role::Root)));
    }

    #[test]
    fn zero_owner_is_never_owned() {
        let request = TestRequest { owner: Some(0) };
        assert!(!request.is_owned_by(&make_user(0, Role::User)));
    }
}
