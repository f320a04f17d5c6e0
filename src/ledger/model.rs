// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger rows and the request payloads that operate on them.
//!
//! Rows are stored as JSON in redb tables (see `store`). Ids are assigned by
//! the store from per-table sequences starting at 1; `0` means "not provided"
//! in every request payload.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{OwnedResource, Role};

pub type UserId = u64;
pub type AccountId = u64;
pub type TransactionId = u64;

// =============================================================================
// Rows
// =============================================================================

/// Stored user row. Contains the password digest, so it is never returned
/// to callers directly (see `api::users::UserResponse`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Lowercase, unique
    pub email: String,
    pub password_digest: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bank {
    Acb,
    Vcb,
    Vib,
}

impl std::fmt::Display for Bank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Bank::Acb => "ACB",
            Bank::Vcb => "VCB",
            Bank::Vib => "VIB",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub name: String,
    pub bank: Bank,
    /// Net sum of the account's transactions; never negative once committed
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Deposit,
    Withdraw,
}

impl TransactionType {
    /// Signed effect of a transaction of this type on its account balance.
    pub fn effect(self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Deposit => amount,
            TransactionType::Withdraw => -amount,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdraw => "WITHDRAW",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    /// Positive magnitude; the sign comes from `transaction_type`
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn effect(&self) -> Decimal {
        self.transaction_type.effect(self.amount)
    }
}

/// A transaction annotated with the bank of its account, as returned by
/// `ListTransactions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub bank: Bank,
}

// =============================================================================
// Results
// =============================================================================

/// A user together with a freshly issued access token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Result of `CreateAccount`: the account and, for a positive opening
/// balance, the opening deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OpenedAccount {
    #[serde(flatten)]
    pub account: Account,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_transaction: Option<Transaction>,
}

/// Result of `CreateTransaction` / `UpdateTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Posting {
    pub transaction: Transaction,
    /// Account balance after the posting was committed
    pub balance: Decimal,
}

// =============================================================================
// Requests
// =============================================================================
//
// Ids that come from the URL path are `#[serde(default)]`: the transport
// fills them in after deserializing the body.

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ValidateTokenRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub id: UserId,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    /// Field names to update; absent means "replace email and password"
    pub update_mask: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DeleteUserRequest {
    #[serde(default)]
    pub id: UserId,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersRequest {
    /// Only the user with this id
    pub id: Option<UserId>,
    /// Only users whose email contains this fragment (case-insensitive)
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAccountRequest {
    #[serde(default)]
    pub user_id: UserId,
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    pub bank: Bank,
    /// Opening balance; must not be negative
    #[serde(default)]
    pub balance: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListAccountsRequest {
    #[serde(default)]
    #[param(ignore)]
    pub user_id: UserId,
    pub account_id: Option<AccountId>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTransactionRequest {
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub account_id: AccountId,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateTransactionRequest {
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub account_id: AccountId,
    #[serde(default)]
    pub id: TransactionId,
    #[serde(default)]
    pub amount: Decimal,
    pub update_mask: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTransactionsRequest {
    #[serde(default)]
    #[param(ignore)]
    pub user_id: UserId,
    pub account_id: Option<AccountId>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteTransactionRequest {
    #[serde(default)]
    #[param(ignore)]
    pub user_id: UserId,
    pub account_id: Option<AccountId>,
    /// Searched across all of the user's accounts unless `account_id` narrows it
    pub id: Option<TransactionId>,
}

// =============================================================================
// Ownership
// =============================================================================

macro_rules! owned_by {
    ($($request:ty => $field:ident),* $(,)?) => {
        $(
            impl OwnedResource for $request {
                fn owner_user_id(&self) -> Option<UserId> {
                    Some(self.$field)
                }
            }
        )*
    };
}

owned_by! {
    UpdateUserRequest => id,
    DeleteUserRequest => id,
    CreateAccountRequest => user_id,
    ListAccountsRequest => user_id,
    CreateTransactionRequest => user_id,
    UpdateTransactionRequest => user_id,
    ListTransactionsRequest => user_id,
    DeleteTransactionRequest => user_id,
}

impl OwnedResource for CreateUserRequest {
    fn owner_user_id(&self) -> Option<UserId> {
        None
    }
}

impl OwnedResource for LoginRequest {
    fn owner_user_id(&self) -> Option<UserId> {
        None
    }
}

impl OwnedResource for ValidateTokenRequest {
    fn owner_user_id(&self) -> Option<UserId> {
        None
    }
}

impl OwnedResource for ListUsersRequest {
    fn owner_user_id(&self) -> Option<UserId> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_signs_amount_by_type() {
        let amount = Decimal::new(2550, 2);
        assert_eq!(TransactionType::Deposit.effect(amount), amount);
        assert_eq!(TransactionType::Withdraw.effect(amount), -amount);
    }

    #[test]
    fn enums_use_uppercase_wire_names() {
        assert_eq!(serde_json::to_string(&Bank::Vcb).unwrap(), "\"VCB\"");
        assert_eq!(
            serde_json::from_str::<TransactionType>("\"WITHDRAW\"").unwrap(),
            TransactionType::Withdraw
        );
        assert!(serde_json::from_str::<Bank>("\"HSBC\"").is_err());
    }

    #[test]
    fn path_ids_default_to_zero() {
        let req: CreateTransactionRequest =
            serde_json::from_str(r#"{"amount": "10", "transaction_type": "DEPOSIT"}"#).unwrap();
        assert_eq!(req.user_id, 0);
        assert_eq!(req.account_id, 0);
        assert_eq!(req.amount, Decimal::from(10));
    }

    #[test]
    fn account_name_is_length_checked() {
        let mut req = CreateAccountRequest {
            user_id: 1,
            name: "savings".into(),
            bank: Bank::Acb,
            balance: Decimal::ZERO,
        };
        assert!(req.validate().is_ok());

        req.name = "x".repeat(101);
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));

        req.name.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn owners_come_from_target_user() {
        let req = ListTransactionsRequest {
            user_id: 9,
            account_id: None,
        };
        assert_eq!(req.owner_user_id(), Some(9));
        assert_eq!(CreateUserRequest::default().owner_user_id(), None);
        assert_eq!(ListUsersRequest::default().owner_user_id(), None);
    }
}
