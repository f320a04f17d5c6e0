// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger store backed by redb (pure Rust, ACID).
//!
//! redb serializes write transactions: a [`UnitOfWork`] holds the single
//! writer lock from `begin_write` until commit or abort, so the
//! read-balance / compute / write sequence of one unit never interleaves
//! with another's.
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized User
//! - `user_emails`: lowercase email → user_id (unique index)
//! - `accounts`: account_id → serialized Account
//! - `transactions`: transaction_id → serialized Transaction
//! - `user_accounts`: (user_id, account_id) → ()
//! - `account_transactions`: (account_id, transaction_id) → ()
//! - `sequences`: table name → last assigned id

use std::path::Path;

use redb::{
    backends::InMemoryBackend, Database, ReadTransaction, ReadableDatabase, ReadableTable,
    TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

use super::model::{Account, AccountId, Transaction, TransactionId, User, UserId};

// =============================================================================
// Table Definitions
// =============================================================================

const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Unique index: lowercase email → user_id.
const USER_EMAILS: TableDefinition<&str, u64> = TableDefinition::new("user_emails");

const ACCOUNTS: TableDefinition<u64, &[u8]> = TableDefinition::new("accounts");

const TRANSACTIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("transactions");

/// Containment index: (user_id, account_id).
const USER_ACCOUNTS: TableDefinition<(u64, u64), ()> = TableDefinition::new("user_accounts");

/// Containment index: (account_id, transaction_id).
const ACCOUNT_TRANSACTIONS: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("account_transactions");

/// Last assigned id per row table.
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// Constraint name reported when an email is already taken.
pub const EMAIL_CONSTRAINT: &str = "users.email";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: &'static str },

    #[error("dangling index entry: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Row Helpers
// =============================================================================

fn get_row<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
    id: u64,
) -> StoreResult<Option<T>> {
    match table.get(id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn all_rows<T: DeserializeOwned>(table: &impl ReadableTable<u64, &'static [u8]>) -> StoreResult<Vec<T>> {
    let mut rows = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        rows.push(serde_json::from_slice(value.value())?);
    }
    Ok(rows)
}

/// Child ids of `parent` in a `(parent, child)` index, ascending.
fn child_ids(table: &impl ReadableTable<(u64, u64), ()>, parent: u64) -> StoreResult<Vec<u64>> {
    let mut ids = Vec::new();
    for entry in table.range((parent, 0)..=(parent, u64::MAX))? {
        let (key, _) = entry?;
        ids.push(key.value().1);
    }
    Ok(ids)
}

fn email_owner(table: &impl ReadableTable<&'static str, u64>, email: &str) -> StoreResult<Option<UserId>> {
    Ok(table.get(email)?.map(|v| v.value()))
}

// =============================================================================
// Read access shared by snapshots and units of work
// =============================================================================

/// Lookups available both inside a read snapshot and inside a unit of work.
///
/// Reads made through a [`UnitOfWork`] see that unit's own uncommitted
/// writes.
pub trait LedgerReader {
    fn user(&self, id: UserId) -> StoreResult<Option<User>>;
    fn user_id_by_email(&self, email: &str) -> StoreResult<Option<UserId>>;
    fn users(&self) -> StoreResult<Vec<User>>;
    fn account(&self, id: AccountId) -> StoreResult<Option<Account>>;
    fn account_ids_of(&self, user_id: UserId) -> StoreResult<Vec<AccountId>>;
    fn transaction(&self, id: TransactionId) -> StoreResult<Option<Transaction>>;
    fn transaction_ids_of(&self, account_id: AccountId) -> StoreResult<Vec<TransactionId>>;

    /// Every account of `user_id`, ascending by id.
    fn accounts_of(&self, user_id: UserId) -> StoreResult<Vec<Account>> {
        self.account_ids_of(user_id)?
            .into_iter()
            .map(|id| {
                self.account(id)?
                    .ok_or_else(|| StoreError::Corrupt(format!("user_accounts/{user_id}/{id}")))
            })
            .collect()
    }

    /// Every transaction of `account_id`, ascending by id.
    fn transactions_of(&self, account_id: AccountId) -> StoreResult<Vec<Transaction>> {
        self.transaction_ids_of(account_id)?
            .into_iter()
            .map(|id| {
                self.transaction(id)?.ok_or_else(|| {
                    StoreError::Corrupt(format!("account_transactions/{account_id}/{id}"))
                })
            })
            .collect()
    }
}

/// Consistent read-only view of the ledger.
pub struct Snapshot {
    txn: ReadTransaction,
}

impl LedgerReader for Snapshot {
    fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        get_row(&self.txn.open_table(USERS)?, id)
    }

    fn user_id_by_email(&self, email: &str) -> StoreResult<Option<UserId>> {
        email_owner(&self.txn.open_table(USER_EMAILS)?, email)
    }

    fn users(&self) -> StoreResult<Vec<User>> {
        all_rows(&self.txn.open_table(USERS)?)
    }

    fn account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        get_row(&self.txn.open_table(ACCOUNTS)?, id)
    }

    fn account_ids_of(&self, user_id: UserId) -> StoreResult<Vec<AccountId>> {
        child_ids(&self.txn.open_table(USER_ACCOUNTS)?, user_id)
    }

    fn transaction(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        get_row(&self.txn.open_table(TRANSACTIONS)?, id)
    }

    fn transaction_ids_of(&self, account_id: AccountId) -> StoreResult<Vec<TransactionId>> {
        child_ids(&self.txn.open_table(ACCOUNT_TRANSACTIONS)?, account_id)
    }
}

// =============================================================================
// UnitOfWork
// =============================================================================

/// One atomic unit of work. Created by [`LedgerStore::write`]; every write
/// made through it commits together or not at all.
pub struct UnitOfWork {
    txn: WriteTransaction,
}

impl UnitOfWork {
    /// Reserve the next id for `table`. Ids start at 1 and are never reused.
    fn next_id(&mut self, table: &'static str) -> StoreResult<u64> {
        let mut sequences = self.txn.open_table(SEQUENCES)?;
        let next = sequences.get(table)?.map(|v| v.value()).unwrap_or(0) + 1;
        sequences.insert(table, next)?;
        Ok(next)
    }

    pub fn next_user_id(&mut self) -> StoreResult<UserId> {
        self.next_id("users")
    }

    pub fn next_account_id(&mut self) -> StoreResult<AccountId> {
        self.next_id("accounts")
    }

    pub fn next_transaction_id(&mut self) -> StoreResult<TransactionId> {
        self.next_id("transactions")
    }

    fn put_row<T: Serialize>(
        &mut self,
        table: TableDefinition<'static, u64, &'static [u8]>,
        id: u64,
        row: &T,
    ) -> StoreResult<()> {
        let json = serde_json::to_vec(row)?;
        self.txn.open_table(table)?.insert(id, json.as_slice())?;
        Ok(())
    }

    /// Insert or replace a user row and keep the email index in step.
    ///
    /// Fails with [`StoreError::UniqueViolation`] when the email belongs to
    /// another user.
    pub fn put_user(&mut self, user: &User) -> StoreResult<()> {
        let previous: Option<User> = get_row(&self.txn.open_table(USERS)?, user.id)?;
        {
            let mut emails = self.txn.open_table(USER_EMAILS)?;
            if let Some(owner) = email_owner(&emails, &user.email)? {
                if owner != user.id {
                    return Err(StoreError::UniqueViolation {
                        constraint: EMAIL_CONSTRAINT,
                    });
                }
            }
            if let Some(previous) = &previous {
                if previous.email != user.email {
                    emails.remove(previous.email.as_str())?;
                }
            }
            emails.insert(user.email.as_str(), user.id)?;
        }
        self.put_row(USERS, user.id, user)
    }

    /// Remove a user row and its email index entry. Accounts are not touched.
    pub fn delete_user(&mut self, user: &User) -> StoreResult<()> {
        self.txn.open_table(USER_EMAILS)?.remove(user.email.as_str())?;
        self.txn.open_table(USERS)?.remove(user.id)?;
        Ok(())
    }

    pub fn put_account(&mut self, account: &Account) -> StoreResult<()> {
        self.put_row(ACCOUNTS, account.id, account)?;
        self.txn
            .open_table(USER_ACCOUNTS)?
            .insert((account.user_id, account.id), ())?;
        Ok(())
    }

    /// Remove an account row and its containment entry. Transactions are not
    /// touched.
    pub fn delete_account(&mut self, account: &Account) -> StoreResult<()> {
        self.txn
            .open_table(USER_ACCOUNTS)?
            .remove((account.user_id, account.id))?;
        self.txn.open_table(ACCOUNTS)?.remove(account.id)?;
        Ok(())
    }

    pub fn put_transaction(&mut self, transaction: &Transaction) -> StoreResult<()> {
        self.put_row(TRANSACTIONS, transaction.id, transaction)?;
        self.txn
            .open_table(ACCOUNT_TRANSACTIONS)?
            .insert((transaction.account_id, transaction.id), ())?;
        Ok(())
    }

    pub fn delete_transaction(&mut self, transaction: &Transaction) -> StoreResult<()> {
        self.txn
            .open_table(ACCOUNT_TRANSACTIONS)?
            .remove((transaction.account_id, transaction.id))?;
        self.txn.open_table(TRANSACTIONS)?.remove(transaction.id)?;
        Ok(())
    }
}

impl LedgerReader for UnitOfWork {
    fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        get_row(&self.txn.open_table(USERS)?, id)
    }

    fn user_id_by_email(&self, email: &str) -> StoreResult<Option<UserId>> {
        email_owner(&self.txn.open_table(USER_EMAILS)?, email)
    }

    fn users(&self) -> StoreResult<Vec<User>> {
        all_rows(&self.txn.open_table(USERS)?)
    }

    fn account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        get_row(&self.txn.open_table(ACCOUNTS)?, id)
    }

    fn account_ids_of(&self, user_id: UserId) -> StoreResult<Vec<AccountId>> {
        child_ids(&self.txn.open_table(USER_ACCOUNTS)?, user_id)
    }

    fn transaction(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        get_row(&self.txn.open_table(TRANSACTIONS)?, id)
    }

    fn transaction_ids_of(&self, account_id: AccountId) -> StoreResult<Vec<TransactionId>> {
        child_ids(&self.txn.open_table(ACCOUNT_TRANSACTIONS)?, account_id)
    }
}

// =============================================================================
// LedgerStore
// =============================================================================

pub struct LedgerStore {
    db: Database,
}

impl LedgerStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Database::create(path)?)
    }

    /// A store that lives only in memory.
    pub fn in_memory() -> StoreResult<Self> {
        Self::init(Database::builder().create_with_backend(InMemoryBackend::new())?)
    }

    fn init(db: Database) -> StoreResult<Self> {
        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_table(USER_ACCOUNTS)?;
            let _ = write_txn.open_table(ACCOUNT_TRANSACTIONS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Run `work` as one atomic unit: commit if it returns `Ok`, abort if it
    /// returns `Err`. A panic inside `work` drops the transaction
    /// uncommitted.
    pub fn write<T, E>(&self, work: impl FnOnce(&mut UnitOfWork) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let txn = self.db.begin_write().map_err(StoreError::from)?;
        let mut unit = UnitOfWork { txn };
        match work(&mut unit) {
            Ok(value) => {
                unit.txn.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort) = unit.txn.abort() {
                    tracing::warn!(error = %abort, "failed to abort ledger unit of work");
                }
                Err(e)
            }
        }
    }

    /// Run `work` against a consistent read snapshot.
    pub fn read<T, E>(&self, work: impl FnOnce(&Snapshot) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let txn = self.db.begin_read().map_err(StoreError::from)?;
        work(&Snapshot { txn })
    }
}

// =============================================================================
// Tests
// =============================================================================
