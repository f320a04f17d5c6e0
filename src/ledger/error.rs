// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger errors and their mapping onto the transport error taxonomy.

use std::collections::BTreeMap;

use crate::auth::AuthError;
use crate::context::ContextError;
use crate::error::{ApiError, ErrorKind};

use super::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Email is required")]
    MissingEmail,

    #[error("Invalid email")]
    InvalidEmail,

    #[error("Duplicate email")]
    DuplicateEmail,

    #[error("Invalid password")]
    InvalidPassword { min_len: usize },

    #[error("Email or password is incorrect")]
    IncorrectPassword,

    #[error("Hash password failed: {0}")]
    HashPassword(String),

    #[error("Missing user id")]
    MissingUserId,

    #[error("Missing account id")]
    MissingAccountId,

    #[error("Missing transaction id")]
    MissingTransactionId,

    #[error("Token missing")]
    MissingToken,

    #[error("Invalid account balance")]
    InvalidAccountBalance,

    #[error("Invalid transaction amount")]
    InvalidTransactionAmount,

    #[error("Invalid withdraw amount")]
    InvalidWithdrawAmount,

    #[error("Deleting transactions would leave account {account_id} with a negative balance")]
    NegativeBalance { account_id: u64 },

    #[error("Field '{0}' cannot be updated")]
    ImmutableField(String),

    #[error("Unknown field '{0}' in update mask")]
    UnknownField(String),

    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("Not found user")]
    UserNotFound,

    #[error("Not found account")]
    AccountNotFound,

    #[error("Not found transaction")]
    TransactionNotFound,

    #[error("Only administrators can change '{0}'")]
    PermissionDenied(&'static str),

    #[error(transparent)]
    Token(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Context(#[from] ContextError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::MissingEmail
            | LedgerError::InvalidEmail
            | LedgerError::InvalidPassword { .. }
            | LedgerError::MissingUserId
            | LedgerError::MissingAccountId
            | LedgerError::MissingTransactionId
            | LedgerError::MissingToken
            | LedgerError::InvalidAccountBalance
            | LedgerError::InvalidTransactionAmount
            | LedgerError::InvalidWithdrawAmount
            | LedgerError::NegativeBalance { .. }
            | LedgerError::ImmutableField(_)
            | LedgerError::UnknownField(_)
            | LedgerError::Validation(_) => ErrorKind::BadRequest,
            LedgerError::DuplicateEmail => ErrorKind::Conflict,
            LedgerError::IncorrectPassword => ErrorKind::Unauthenticated,
            LedgerError::UserNotFound
            | LedgerError::AccountNotFound
            | LedgerError::TransactionNotFound => ErrorKind::NotFound,
            LedgerError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            LedgerError::HashPassword(_) | LedgerError::Store(_) => ErrorKind::Internal,
            LedgerError::Token(e) => e.kind(),
            LedgerError::Context(ContextError::Canceled) => ErrorKind::Canceled,
            LedgerError::Context(ContextError::DeadlineExceeded) => ErrorKind::DeadlineExceeded,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::MissingEmail => "missing_email",
            LedgerError::InvalidEmail => "invalid_email",
            LedgerError::DuplicateEmail => "duplicate_email",
            LedgerError::InvalidPassword { .. } => "invalid_password",
            LedgerError::IncorrectPassword => "incorrect_password",
            LedgerError::HashPassword(_) => "hash_password_failed",
            LedgerError::MissingUserId => "missing_user_id",
            LedgerError::MissingAccountId => "missing_account_id",
            LedgerError::MissingTransactionId => "missing_transaction_id",
            LedgerError::MissingToken => "missing_token",
            LedgerError::InvalidAccountBalance => "invalid_account_balance",
            LedgerError::InvalidTransactionAmount => "invalid_transaction_amount",
            LedgerError::InvalidWithdrawAmount => "invalid_withdraw_amount",
            LedgerError::NegativeBalance { .. } => "negative_balance",
            LedgerError::ImmutableField(_) => "immutable_field",
            LedgerError::UnknownField(_) => "unknown_field",
            LedgerError::Validation(_) => "validation_failed",
            LedgerError::UserNotFound => "user_not_found",
            LedgerError::AccountNotFound => "account_not_found",
            LedgerError::TransactionNotFound => "transaction_not_found",
            LedgerError::PermissionDenied(_) => "permission_denied",
            LedgerError::Token(e) => e.error_code(),
            LedgerError::Store(_) => "internal",
            LedgerError::Context(ContextError::Canceled) => "canceled",
            LedgerError::Context(ContextError::DeadlineExceeded) => "deadline_exceeded",
        }
    }

    /// Field-level details shown to the caller.
    fn details(&self) -> BTreeMap<String, String> {
        let (field, description): (&str, String) = match self {
            LedgerError::MissingEmail => ("email", "Missing email".into()),
            LedgerError::InvalidEmail => ("email", "The email provided is invalid".into()),
            LedgerError::DuplicateEmail => (
                "email",
                "A user with this email address already exists".into(),
            ),
            LedgerError::InvalidPassword { min_len } => (
                "password",
                format!("Password must be at least {min_len} characters long"),
            ),
            LedgerError::IncorrectPassword => ("password", "Email or password is incorrect".into()),
            LedgerError::MissingUserId => ("user_id", "Missing user id".into()),
            LedgerError::MissingAccountId => ("account_id", "Missing account id".into()),
            LedgerError::MissingTransactionId => ("id", "Missing transaction id".into()),
            LedgerError::MissingToken => ("token", "Missing token".into()),
            LedgerError::InvalidAccountBalance => ("balance", "must not be negative".into()),
            LedgerError::InvalidTransactionAmount => ("amount", "greater than zero".into()),
            LedgerError::InvalidWithdrawAmount => {
                ("amount", "exceeds the account balance".into())
            }
            LedgerError::NegativeBalance { account_id } => (
                "account_id",
                format!("account {account_id} would be left with a negative balance"),
            ),
            LedgerError::ImmutableField(name) => ("update_mask", format!("{name} is immutable")),
            LedgerError::UnknownField(name) => ("update_mask", format!("{name} is not a field")),
            LedgerError::UserNotFound => ("user", "User not found".into()),
            LedgerError::AccountNotFound => ("account", "Account not found".into()),
            LedgerError::TransactionNotFound => ("transaction", "Transaction not found".into()),
            LedgerError::PermissionDenied(name) => (*name, "requires ADMIN or ROOT".into()),
            LedgerError::Validation(fields) => return fields.clone(),
            _ => return BTreeMap::new(),
        };
        BTreeMap::from([(field.to_string(), description)])
    }
}

impl From<validator::ValidationErrors> for LedgerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "invalid value".to_string());
                (field.to_string(), message)
            })
            .collect();
        LedgerError::Validation(fields)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Token(auth) => auth.into(),
            LedgerError::Store(ref e) => {
                tracing::error!(error = %e, "ledger store failure");
                ApiError::internal()
            }
            LedgerError::HashPassword(ref e) => {
                tracing::error!(error = %e, "password hashing failure");
                ApiError::internal()
            }
            LedgerError::Context(ContextError::Canceled) => ApiError::canceled(),
            LedgerError::Context(ContextError::DeadlineExceeded) => ApiError::deadline_exceeded(),
            _ => ApiError::new(err.kind(), err.code(), err.to_string()).with_details(err.details()),
        }
    }
}
