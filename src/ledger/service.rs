// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger operations.
//!
//! Every mutating operation runs as one [`UnitOfWork`]: validate the input,
//! read the current rows, compute the next state, write, then re-check the
//! call context and commit. Any error on the way aborts the unit, so a
//! rejected withdraw or an expired deadline leaves no partial writes.
//!
//! ## Balance invariant
//!
//! An account's `balance` always equals the signed sum of its transactions
//! and is never negative after a commit. A positive opening balance is
//! recorded as an opening `DEPOSIT` so the invariant holds from creation.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use validator::{Validate, ValidateEmail};

use super::cache::UserCache;
use super::error::{LedgerError, LedgerResult};
use super::mask::{parse_mask, TransactionField, UserField};
use super::model::{
    Account, AccountId, CreateAccountRequest, CreateTransactionRequest, CreateUserRequest,
    DeleteTransactionRequest, DeleteUserRequest, ListAccountsRequest, ListTransactionsRequest,
    ListUsersRequest, LoginRequest, OpenedAccount, Posting, Session, Transaction,
    TransactionId, TransactionType, TransactionView, UpdateTransactionRequest, UpdateUserRequest,
    User, UserId, ValidateTokenRequest,
};
use super::store::{LedgerReader, LedgerStore, Snapshot, StoreError, UnitOfWork};
use crate::auth::{ClaimsCodec, Identity, PasswordHasher, Role};
use crate::context::CallContext;

/// Tunables supplied from configuration.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub min_password_len: usize,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            min_password_len: 8,
        }
    }
}

pub struct LedgerService {
    store: Arc<LedgerStore>,
    codec: Arc<ClaimsCodec>,
    hasher: Arc<dyn PasswordHasher>,
    settings: LedgerSettings,
    user_cache: Option<UserCache>,
}

/// Lowercase, trimmed, format-checked email.
fn normalize_email(raw: &str) -> LedgerResult<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(LedgerError::MissingEmail);
    }
    if !email.validate_email() {
        return Err(LedgerError::InvalidEmail);
    }
    Ok(email)
}

fn duplicate_email(err: StoreError) -> LedgerError {
    match err {
        StoreError::UniqueViolation { .. } => LedgerError::DuplicateEmail,
        other => other.into(),
    }
}

/// The account, if it exists and belongs to `user_id`.
fn owned_account(
    reader: &impl LedgerReader,
    user_id: UserId,
    account_id: AccountId,
) -> LedgerResult<Account> {
    match reader.account(account_id)? {
        Some(account) if account.user_id == user_id => Ok(account),
        _ => Err(LedgerError::AccountNotFound),
    }
}

/// The user's accounts, optionally narrowed to one id.
fn select_accounts(
    reader: &impl LedgerReader,
    user_id: UserId,
    account_id: Option<AccountId>,
) -> LedgerResult<Vec<Account>> {
    let mut accounts = reader.accounts_of(user_id)?;
    if let Some(account_id) = account_id {
        accounts.retain(|a| a.id == account_id);
    }
    Ok(accounts)
}

impl LedgerService {
    pub fn new(
        store: Arc<LedgerStore>,
        codec: Arc<ClaimsCodec>,
        hasher: Arc<dyn PasswordHasher>,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            store,
            codec,
            hasher,
            settings,
            user_cache: None,
        }
    }

    /// Enable the read-through cache for user lookups by id.
    pub fn with_user_cache(mut self, cache: UserCache) -> Self {
        self.user_cache = Some(cache);
        self
    }

    pub fn codec(&self) -> &ClaimsCodec {
        &self.codec
    }

    /// Whether the store can open a read snapshot.
    pub fn is_ready(&self) -> bool {
        self.store.read(|_| Ok::<_, StoreError>(())).is_ok()
    }

    // =========================================================================
    // Unit of work plumbing
    // =========================================================================

    /// Run `work` as one atomic unit. The context is checked before the unit
    /// starts and again right before commit.
    fn atomically<T>(
        &self,
        ctx: &CallContext,
        work: impl FnOnce(&mut UnitOfWork) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        ctx.check()?;
        self.store.write(|uow| {
            let value = work(uow)?;
            ctx.check()?;
            Ok(value)
        })
    }

    fn snapshot<T>(
        &self,
        ctx: &CallContext,
        work: impl FnOnce(&Snapshot) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        ctx.check()?;
        self.store.read(work)
    }

    fn check_password(&self, password: &str) -> LedgerResult<()> {
        let min_len = self.settings.min_password_len;
        if password.chars().count() < min_len {
            return Err(LedgerError::InvalidPassword { min_len });
        }
        Ok(())
    }

    fn hash_password(&self, password: &str) -> LedgerResult<String> {
        self.hasher
            .hash(password)
            .map_err(|e| LedgerError::HashPassword(e.to_string()))
    }

    fn invalidate_user(&self, id: UserId) {
        if let Some(cache) = &self.user_cache {
            cache.invalidate(id);
        }
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub fn create_user(&self, ctx: &CallContext, req: CreateUserRequest) -> LedgerResult<Session> {
        let email = normalize_email(&req.email)?;
        self.check_password(&req.password)?;
        let digest = self.hash_password(&req.password)?;

        let session = self.insert_user(ctx, email, digest, Role::User)?;
        tracing::info!(user_id = session.user.id, "user created");
        Ok(session)
    }

    fn insert_user(
        &self,
        ctx: &CallContext,
        email: String,
        password_digest: String,
        role: Role,
    ) -> LedgerResult<Session> {
        self.atomically(ctx, |uow| {
            let now = Utc::now();
            let user = User {
                id: uow.next_user_id()?,
                email,
                password_digest,
                role,
                created_at: now,
                updated_at: now,
            };
            uow.put_user(&user).map_err(duplicate_email)?;
            let token = self.codec.issue(&user)?;
            Ok(Session { user, token })
        })
    }

    pub fn login(&self, ctx: &CallContext, req: LoginRequest) -> LedgerResult<Session> {
        let email = normalize_email(&req.email)?;
        if req.password.is_empty() {
            return Err(LedgerError::InvalidPassword {
                min_len: self.settings.min_password_len,
            });
        }

        let user = self.snapshot(ctx, |snap| {
            let id = snap
                .user_id_by_email(&email)?
                .ok_or(LedgerError::UserNotFound)?;
            snap.user(id)?.ok_or(LedgerError::UserNotFound)
        })?;

        if !self.hasher.verify(&user.password_digest, &req.password) {
            tracing::debug!(user_id = user.id, "login rejected: incorrect password");
            return Err(LedgerError::IncorrectPassword);
        }

        let token = self.codec.issue(&user)?;
        tracing::info!(user_id = user.id, "user logged in");
        Ok(Session { user, token })
    }

    /// Verify a token and return the user it names.
    pub fn validate_token(
        &self,
        ctx: &CallContext,
        req: ValidateTokenRequest,
    ) -> LedgerResult<User> {
        let token = req.token.trim();
        if token.is_empty() {
            return Err(LedgerError::MissingToken);
        }
        let identity = self.codec.verify(token)?;
        self.load_user(ctx, identity.user_id)
    }

    /// User lookup by id, through the cache when one is configured.
    fn load_user(&self, ctx: &CallContext, id: UserId) -> LedgerResult<User> {
        let cache = self.user_cache.as_ref();
        if let Some(user) = cache.and_then(|c| c.get(id)) {
            return Ok(user);
        }
        let seen = cache.map(UserCache::generation);
        let user = self
            .snapshot(ctx, |snap| Ok(snap.user(id)?))?
            .ok_or(LedgerError::UserNotFound)?;
        if let (Some(cache), Some(seen)) = (cache, seen) {
            cache.fill(user.clone(), seen);
        }
        Ok(user)
    }

    /// Update a user.
    ///
    /// Without a mask, email and password are replaced (and role, if given).
    /// With a mask, only the named fields are taken from the request. Role
    /// changes require an `ADMIN` or `ROOT` caller.
    pub fn update_user(
        &self,
        ctx: &CallContext,
        caller: Option<&Identity>,
        req: UpdateUserRequest,
    ) -> LedgerResult<User> {
        if req.id == 0 {
            return Err(LedgerError::MissingUserId);
        }

        let fields: HashSet<UserField> = match req.update_mask.as_deref() {
            Some(paths) if !paths.is_empty() => parse_mask(paths)?,
            _ => {
                let mut all = HashSet::from([UserField::Email, UserField::Password]);
                if req.role.is_some() {
                    all.insert(UserField::Role);
                }
                all
            }
        };

        let may_change_role = caller.is_some_and(|c| c.role.is_privileged());
        if fields.contains(&UserField::Role) && !may_change_role {
            return Err(LedgerError::PermissionDenied("role"));
        }

        let email = if fields.contains(&UserField::Email) {
            Some(normalize_email(req.email.as_deref().unwrap_or_default())?)
        } else {
            None
        };
        let password = if fields.contains(&UserField::Password) {
            let password = req.password.unwrap_or_default();
            self.check_password(&password)?;
            Some(password)
        } else {
            None
        };
        let role = if fields.contains(&UserField::Role) {
            let role = req.role.ok_or_else(|| {
                LedgerError::Validation([("role".to_string(), "Missing role".to_string())].into())
            })?;
            Some(role)
        } else {
            None
        };

        // Hash outside the unit so other writers don't queue behind Argon2.
        // A digest that already matches the new password is kept as is.
        let digest = match password {
            Some(password) => {
                let current = self
                    .snapshot(ctx, |snap| Ok(snap.user(req.id)?))?
                    .ok_or(LedgerError::UserNotFound)?
                    .password_digest;
                if self.hasher.verify(&current, &password) {
                    Some(current)
                } else {
                    Some(self.hash_password(&password)?)
                }
            }
            None => None,
        };

        let user = self.atomically(ctx, |uow| {
            let mut user = uow.user(req.id)?.ok_or(LedgerError::UserNotFound)?;

            if let Some(email) = email {
                user.email = email;
            }
            if let Some(digest) = digest {
                user.password_digest = digest;
            }
            if let Some(role) = role {
                user.role = role;
            }
            user.updated_at = Utc::now();

            uow.put_user(&user).map_err(duplicate_email)?;
            Ok(user)
        })?;

        self.invalidate_user(user.id);
        tracing::info!(user_id = user.id, "user updated");
        Ok(user)
    }

    /// Delete a user together with its accounts and their transactions.
    pub fn delete_user(&self, ctx: &CallContext, req: DeleteUserRequest) -> LedgerResult<User> {
        if req.id == 0 {
            return Err(LedgerError::MissingUserId);
        }

        let (user, accounts, transactions) = self.atomically(ctx, |uow| {
            let user = uow.user(req.id)?.ok_or(LedgerError::UserNotFound)?;
            let accounts = uow.accounts_of(user.id)?;
            let mut transactions = 0usize;
            for account in &accounts {
                for transaction in uow.transactions_of(account.id)? {
                    uow.delete_transaction(&transaction)?;
                    transactions += 1;
                }
                uow.delete_account(account)?;
            }
            uow.delete_user(&user)?;
            Ok((user, accounts.len(), transactions))
        })?;

        self.invalidate_user(user.id);
        tracing::info!(user_id = user.id, accounts, transactions, "user deleted");
        Ok(user)
    }

    /// Users matching the filters, newest first.
    pub fn list_users(&self, ctx: &CallContext, req: ListUsersRequest) -> LedgerResult<Vec<User>> {
        let fragment = req
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());

        let mut users = self.snapshot(ctx, |snap| match req.id {
            Some(id) => Ok(snap.user(id)?.into_iter().collect::<Vec<_>>()),
            None => Ok(snap.users()?),
        })?;

        if let Some(fragment) = fragment {
            users.retain(|u| u.email.contains(&fragment));
        }
        if users.is_empty() {
            return Err(LedgerError::UserNotFound);
        }
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users)
    }

    /// Create the `ROOT` user if no user with this email exists yet.
    ///
    /// Returns the new user, or `None` if the email was already taken.
    pub fn seed_root(&self, email: &str, password: &str) -> LedgerResult<Option<User>> {
        let ctx = CallContext::new();
        let email = normalize_email(email)?;
        self.check_password(password)?;

        if self.snapshot(&ctx, |snap| Ok(snap.user_id_by_email(&email)?))?.is_some() {
            tracing::debug!(email = %email, "root user already present");
            return Ok(None);
        }

        let digest = self.hash_password(password)?;
        match self.insert_user(&ctx, email, digest, Role::Root) {
            Ok(session) => {
                tracing::info!(user_id = session.user.id, "root user seeded");
                Ok(Some(session.user))
            }
            // Lost a race with another seeder; same outcome
            Err(LedgerError::DuplicateEmail) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    pub fn create_account(
        &self,
        ctx: &CallContext,
        req: CreateAccountRequest,
    ) -> LedgerResult<OpenedAccount> {
        if req.user_id == 0 {
            return Err(LedgerError::MissingUserId);
        }
        if req.balance < Decimal::ZERO {
            return Err(LedgerError::InvalidAccountBalance);
        }
        req.validate()?;

        let opened = self.atomically(ctx, |uow| {
            if uow.user(req.user_id)?.is_none() {
                return Err(LedgerError::UserNotFound);
            }

            let now = Utc::now();
            let mut account = Account {
                id: uow.next_account_id()?,
                user_id: req.user_id,
                name: req.name.trim().to_string(),
                bank: req.bank,
                balance: Decimal::ZERO,
                created_at: now,
                updated_at: now,
            };

            let opening_transaction = if req.balance > Decimal::ZERO {
                let deposit = Transaction {
                    id: uow.next_transaction_id()?,
                    account_id: account.id,
                    amount: req.balance,
                    transaction_type: TransactionType::Deposit,
                    created_at: now,
                    updated_at: now,
                };
                account.balance = deposit.effect();
                Some(deposit)
            } else {
                None
            };

            uow.put_account(&account)?;
            if let Some(deposit) = &opening_transaction {
                uow.put_transaction(deposit)?;
            }
            Ok(OpenedAccount {
                account,
                opening_transaction,
            })
        })?;

        tracing::info!(
            user_id = opened.account.user_id,
            account_id = opened.account.id,
            bank = %opened.account.bank,
            balance = %opened.account.balance,
            "account created"
        );
        Ok(opened)
    }

    /// Accounts of a user, optionally narrowed to one id.
    pub fn list_accounts(
        &self,
        ctx: &CallContext,
        req: ListAccountsRequest,
    ) -> LedgerResult<Vec<Account>> {
        if req.user_id == 0 {
            return Err(LedgerError::MissingUserId);
        }
        self.snapshot(ctx, |snap| {
            if snap.user(req.user_id)?.is_none() {
                return Err(LedgerError::UserNotFound);
            }
            let accounts = select_accounts(snap, req.user_id, req.account_id)?;
            if req.account_id.is_some() && accounts.is_empty() {
                return Err(LedgerError::AccountNotFound);
            }
            Ok(accounts)
        })
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    pub fn create_transaction(
        &self,
        ctx: &CallContext,
        req: CreateTransactionRequest,
    ) -> LedgerResult<Posting> {
        if req.user_id == 0 {
            return Err(LedgerError::MissingUserId);
        }
        if req.account_id == 0 {
            return Err(LedgerError::MissingAccountId);
        }
        if req.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidTransactionAmount);
        }

        let posting = self.atomically(ctx, |uow| {
            let mut account = owned_account(&*uow, req.user_id, req.account_id)?;

            let balance = account.balance + req.transaction_type.effect(req.amount);
            if balance < Decimal::ZERO {
                return Err(LedgerError::InvalidWithdrawAmount);
            }

            let now = Utc::now();
            let transaction = Transaction {
                id: uow.next_transaction_id()?,
                account_id: account.id,
                amount: req.amount,
                transaction_type: req.transaction_type,
                created_at: now,
                updated_at: now,
            };
            account.balance = balance;
            account.updated_at = now;

            uow.put_transaction(&transaction)?;
            uow.put_account(&account)?;
            Ok(Posting {
                transaction,
                balance,
            })
        })?;

        tracing::info!(
            account_id = posting.transaction.account_id,
            transaction_id = posting.transaction.id,
            transaction_type = %posting.transaction.transaction_type,
            amount = %posting.transaction.amount,
            "transaction created"
        );
        Ok(posting)
    }

    /// Change a transaction's amount and move the account balance by the
    /// signed difference.
    pub fn update_transaction(
        &self,
        ctx: &CallContext,
        req: UpdateTransactionRequest,
    ) -> LedgerResult<Posting> {
        if req.user_id == 0 {
            return Err(LedgerError::MissingUserId);
        }
        if req.account_id == 0 {
            return Err(LedgerError::MissingAccountId);
        }
        if req.id == 0 {
            return Err(LedgerError::MissingTransactionId);
        }
        if let Some(paths) = req.update_mask.as_deref() {
            // Amount is the only mutable field; parsing rejects the rest.
            let _: HashSet<TransactionField> = parse_mask(paths)?;
        }
        if req.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidTransactionAmount);
        }

        let posting = self.atomically(ctx, |uow| {
            let mut account = owned_account(&*uow, req.user_id, req.account_id)?;
            let mut transaction = match uow.transaction(req.id)? {
                Some(t) if t.account_id == account.id => t,
                _ => return Err(LedgerError::TransactionNotFound),
            };

            let delta = req.amount - transaction.amount;
            let balance = account.balance + transaction.transaction_type.effect(delta);
            if balance < Decimal::ZERO {
                return Err(LedgerError::InvalidWithdrawAmount);
            }

            let now = Utc::now();
            transaction.amount = req.amount;
            transaction.updated_at = now;
            account.balance = balance;
            account.updated_at = now;

            uow.put_transaction(&transaction)?;
            uow.put_account(&account)?;
            Ok(Posting {
                transaction,
                balance,
            })
        })?;

        tracing::info!(
            account_id = posting.transaction.account_id,
            transaction_id = posting.transaction.id,
            amount = %posting.transaction.amount,
            balance = %posting.balance,
            "transaction updated"
        );
        Ok(posting)
    }

    /// Every transaction of the user's accounts (or of one account), each
    /// annotated with its account's bank.
    pub fn list_transactions(
        &self,
        ctx: &CallContext,
        req: ListTransactionsRequest,
    ) -> LedgerResult<Vec<TransactionView>> {
        if req.user_id == 0 {
            return Err(LedgerError::MissingUserId);
        }
        self.snapshot(ctx, |snap| {
            if snap.user(req.user_id)?.is_none() {
                return Err(LedgerError::UserNotFound);
            }
            let accounts = select_accounts(snap, req.user_id, req.account_id)?;
            if accounts.is_empty() {
                return Err(LedgerError::TransactionNotFound);
            }

            let mut views = Vec::new();
            for account in accounts {
                views.extend(
                    snap.transactions_of(account.id)?
                        .into_iter()
                        .map(|transaction| TransactionView {
                            transaction,
                            bank: account.bank,
                        }),
                );
            }
            Ok(views)
        })
    }

    /// Delete one transaction, every transaction of an account, or every
    /// transaction of a user, and remove their effect from each affected
    /// balance in the same unit.
    ///
    /// Removing a deposit that later withdrawals depend on would leave a
    /// negative balance; such a delete is rejected with
    /// [`LedgerError::NegativeBalance`] and nothing is removed.
    pub fn delete_transaction(
        &self,
        ctx: &CallContext,
        req: DeleteTransactionRequest,
    ) -> LedgerResult<Vec<TransactionId>> {
        if req.user_id == 0 {
            return Err(LedgerError::MissingUserId);
        }

        let deleted = self.atomically(ctx, |uow| {
            let mut deleted = Vec::new();
            for mut account in select_accounts(&*uow, req.user_id, req.account_id)? {
                let mut doomed = uow.transactions_of(account.id)?;
                if let Some(id) = req.id {
                    doomed.retain(|t| t.id == id);
                }
                if doomed.is_empty() {
                    continue;
                }

                let removed: Decimal = doomed.iter().map(Transaction::effect).sum();
                let balance = account.balance - removed;
                if balance < Decimal::ZERO {
                    return Err(LedgerError::NegativeBalance {
                        account_id: account.id,
                    });
                }

                for transaction in &doomed {
                    uow.delete_transaction(transaction)?;
                    deleted.push(transaction.id);
                }
                account.balance = balance;
                account.updated_at = Utc::now();
                uow.put_account(&account)?;
            }

            if deleted.is_empty() {
                return Err(LedgerError::TransactionNotFound);
            }
            Ok(deleted)
        })?;

        tracing::info!(
            user_id = req.user_id,
            count = deleted.len(),
            "transactions deleted"
        );
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Argon2Hasher, AuthError, JwtConfig};
    use crate::context::ContextError;
    use crate::ledger::model::Bank;
    use std::time::Duration;

    fn service() -> LedgerService {
        let store = Arc::new(LedgerStore::in_memory().unwrap());
        let codec = Arc::new(ClaimsCodec::new(&JwtConfig {
            secret: "test-secret".to_string(),
            issuer: "ledger-test".to_string(),
            duration: Duration::from_secs(600),
        }));
        let hasher = Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap());
        LedgerService::new(store, codec, hasher, LedgerSettings::default())
    }

    fn ctx() -> CallContext {
        CallContext::new()
    }

    fn signup(svc: &LedgerService, email: &str) -> Session {
        svc.create_user(
            &ctx(),
            CreateUserRequest {
                email: email.to_string(),
                password: "secret12".to_string(),
            },
        )
        .unwrap()
    }

    fn open(svc: &LedgerService, user_id: UserId, balance: i64) -> Account {
        svc.create_account(
            &ctx(),
            CreateAccountRequest {
                user_id,
                name: "main".to_string(),
                bank: Bank::Acb,
                balance: Decimal::from(balance),
            },
        )
        .unwrap()
        .account
    }

    fn post(
        svc: &LedgerService,
        account: &Account,
        kind: TransactionType,
        amount: i64,
    ) -> LedgerResult<Posting> {
        svc.create_transaction(
            &ctx(),
            CreateTransactionRequest {
                user_id: account.user_id,
                account_id: account.id,
                amount: Decimal::from(amount),
                transaction_type: kind,
            },
        )
    }

    fn balance_of(svc: &LedgerService, account: &Account) -> Decimal {
        svc.list_accounts(
            &ctx(),
            ListAccountsRequest {
                user_id: account.user_id,
                account_id: Some(account.id),
            },
        )
        .unwrap()[0]
            .balance
    }

    fn history_sum(svc: &LedgerService, account: &Account) -> Decimal {
        svc.list_transactions(
            &ctx(),
            ListTransactionsRequest {
                user_id: account.user_id,
                account_id: Some(account.id),
            },
        )
        .unwrap()
        .iter()
        .map(|v| v.transaction.effect())
        .sum()
    }

    fn admin() -> Identity {
        Identity {
            user_id: 999,
            email: "admin@x.com".to_string(),
            role: Role::Admin,
            issued_at: 0,
            expires_at: 0,
            issuer: "ledger-test".to_string(),
        }
    }

    #[test]
    fn concrete_scenario() {
        let svc = service();
        let session = signup(&svc, "a@x.com");
        let identity = svc.codec().verify(&session.token).unwrap();
        assert_eq!(identity.user_id, session.user.id);

        let account = open(&svc, session.user.id, 0);
        let deposit = post(&svc, &account, TransactionType::Deposit, 50_000).unwrap();
        assert_eq!(deposit.balance, Decimal::from(50_000));

        let overdraw = post(&svc, &account, TransactionType::Withdraw, 60_000);
        assert!(matches!(overdraw, Err(LedgerError::InvalidWithdrawAmount)));
        assert_eq!(balance_of(&svc, &account), Decimal::from(50_000));

        let updated = svc
            .update_transaction(
                &ctx(),
                UpdateTransactionRequest {
                    user_id: account.user_id,
                    account_id: account.id,
                    id: deposit.transaction.id,
                    amount: Decimal::from(10_000),
                    update_mask: None,
                },
            )
            .unwrap();
        assert_eq!(updated.balance, Decimal::from(10_000));
        assert_eq!(balance_of(&svc, &account), Decimal::from(10_000));
    }

    #[test]
    fn create_user_validates_and_folds_email() {
        let svc = service();
        let session = signup(&svc, "  Mixed@X.com ");
        assert_eq!(session.user.email, "mixed@x.com");
        assert_eq!(session.user.role, Role::User);
        assert_ne!(session.user.password_digest, "secret12");

        let bad_email = svc.create_user(
            &ctx(),
            CreateUserRequest {
                email: "not-an-email".into(),
                password: "secret12".into(),
            },
        );
        assert!(matches!(bad_email, Err(LedgerError::InvalidEmail)));

        let short = svc.create_user(
            &ctx(),
            CreateUserRequest {
                email: "b@x.com".into(),
                password: "short".into(),
            },
        );
        assert!(matches!(short, Err(LedgerError::InvalidPassword { min_len: 8 })));
    }

    #[test]
    fn duplicate_email_is_rejected_case_insensitively() {
        let svc = service();
        signup(&svc, "a@x.com");
        let again = svc.create_user(
            &ctx(),
            CreateUserRequest {
                email: "A@X.COM".into(),
                password: "secret12".into(),
            },
        );
        assert!(matches!(again, Err(LedgerError::DuplicateEmail)));
    }

    #[test]
    fn login_checks_every_input() {
        let svc = service();
        signup(&svc, "a@x.com");

        let login = |email: &str, password: &str| {
            svc.login(
                &ctx(),
                LoginRequest {
                    email: email.into(),
                    password: password.into(),
                },
            )
        };

        assert!(matches!(login("", "secret12"), Err(LedgerError::MissingEmail)));
        assert!(matches!(login("nope", "secret12"), Err(LedgerError::InvalidEmail)));
        assert!(matches!(login("a@x.com", ""), Err(LedgerError::InvalidPassword { .. })));
        assert!(matches!(login("b@x.com", "secret12"), Err(LedgerError::UserNotFound)));
        assert!(matches!(login("a@x.com", "secret13"), Err(LedgerError::IncorrectPassword)));

        let session = login("A@x.com", "secret12").unwrap();
        assert_eq!(session.user.email, "a@x.com");
    }

    #[test]
    fn validate_token_resolves_user_through_cache() {
        let svc = service().with_user_cache(UserCache::new(16, Duration::from_secs(60)));
        let session = signup(&svc, "a@x.com");

        let user = svc
            .validate_token(&ctx(), ValidateTokenRequest { token: session.token.clone() })
            .unwrap();
        assert_eq!(user.id, session.user.id);

        assert!(matches!(
            svc.validate_token(&ctx(), ValidateTokenRequest { token: " ".into() }),
            Err(LedgerError::MissingToken)
        ));
        assert!(matches!(
            svc.validate_token(&ctx(), ValidateTokenRequest { token: "garbage".into() }),
            Err(LedgerError::Token(AuthError::TokenInvalid(_)))
        ));

        svc.delete_user(&ctx(), DeleteUserRequest { id: user.id }).unwrap();
        assert!(matches!(
            svc.validate_token(&ctx(), ValidateTokenRequest { token: session.token }),
            Err(LedgerError::UserNotFound)
        ));
    }

    #[test]
    fn row_read_before_a_delete_is_not_cached_after_it() {
        let svc = service().with_user_cache(UserCache::new(16, Duration::from_secs(60)));
        let session = signup(&svc, "a@x.com");
        let cache = svc.user_cache.as_ref().unwrap();

        // A validation missed the cache and read the row...
        let seen = cache.generation();
        let stale = session.user.clone();
        // ...then the user was deleted before it could fill.
        svc.delete_user(&ctx(), DeleteUserRequest { id: stale.id }).unwrap();
        assert!(!cache.fill(stale, seen));

        assert!(matches!(
            svc.validate_token(&ctx(), ValidateTokenRequest { token: session.token }),
            Err(LedgerError::UserNotFound)
        ));
    }

    /// Signals on a channel whether a ledger write could start while a
    /// password was being hashed.
    struct WriterCheckingHasher {
        inner: Argon2Hasher,
        store: Arc<LedgerStore>,
        writer_free: std::sync::mpsc::Sender<bool>,
    }

    impl PasswordHasher for WriterCheckingHasher {
        fn hash(&self, secret: &str) -> Result<String, crate::auth::HashError> {
            let store = Arc::clone(&self.store);
            let (done_tx, done_rx) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let _ = store.write(|_| Ok::<_, StoreError>(()));
                let _ = done_tx.send(());
            });
            let free = done_rx.recv_timeout(Duration::from_secs(2)).is_ok();
            let _ = self.writer_free.send(free);
            self.inner.hash(secret)
        }

        fn verify(&self, digest: &str, secret: &str) -> bool {
            self.inner.verify(digest, secret)
        }
    }

    #[test]
    fn password_is_hashed_outside_the_write_unit() {
        let store = Arc::new(LedgerStore::in_memory().unwrap());
        let (tx, rx) = std::sync::mpsc::channel();
        let hasher = Arc::new(WriterCheckingHasher {
            inner: Argon2Hasher::with_params(8, 1, 1).unwrap(),
            store: Arc::clone(&store),
            writer_free: tx,
        });
        let codec = Arc::new(ClaimsCodec::new(&JwtConfig {
            secret: "test-secret".to_string(),
            issuer: "ledger-test".to_string(),
            duration: Duration::from_secs(600),
        }));
        let svc = LedgerService::new(store, codec, hasher, LedgerSettings::default());

        let session = signup(&svc, "a@x.com");
        assert!(rx.recv().unwrap());

        let updated = svc
            .update_user(
                &ctx(),
                None,
                UpdateUserRequest {
                    id: session.user.id,
                    password: Some("another-secret".into()),
                    update_mask: Some(vec!["password".into()]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(rx.recv().unwrap());
        assert_ne!(updated.password_digest, session.user.password_digest);

        // Same password again: the stored digest is kept, nothing is hashed.
        let again = svc
            .update_user(
                &ctx(),
                None,
                UpdateUserRequest {
                    id: session.user.id,
                    password: Some("another-secret".into()),
                    update_mask: Some(vec!["password".into()]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(again.password_digest, updated.password_digest);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn update_user_without_mask_replaces_email_and_password() {
        let svc = service();
        let session = signup(&svc, "a@x.com");

        let updated = svc
            .update_user(
                &ctx(),
                None,
                UpdateUserRequest {
                    id: session.user.id,
                    email: Some("b@x.com".into()),
                    password: Some("newsecret".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.email, "b@x.com");
        assert_ne!(updated.password_digest, session.user.password_digest);

        assert!(svc
            .login(
                &ctx(),
                LoginRequest {
                    email: "b@x.com".into(),
                    password: "newsecret".into()
                }
            )
            .is_ok());
    }

    #[test]
    fn update_user_keeps_digest_when_password_unchanged() {
        let svc = service();
        let session = signup(&svc, "a@x.com");

        let updated = svc
            .update_user(
                &ctx(),
                None,
                UpdateUserRequest {
                    id: session.user.id,
                    email: Some("a@x.com".into()),
                    password: Some("secret12".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.password_digest, session.user.password_digest);
    }

    #[test]
    fn update_user_mask_rules() {
        let svc = service();
        let session = signup(&svc, "a@x.com");
        let id = session.user.id;

        let masked = |mask: &[&str], caller: Option<&Identity>| {
            svc.update_user(
                &ctx(),
                caller,
                UpdateUserRequest {
                    id,
                    email: Some("c@x.com".into()),
                    password: None,
                    role: Some(Role::Admin),
                    update_mask: Some(mask.iter().map(|s| s.to_string()).collect()),
                },
            )
        };

        assert!(matches!(masked(&["id"], None), Err(LedgerError::ImmutableField(_))));
        assert!(matches!(masked(&["nickname"], None), Err(LedgerError::UnknownField(_))));
        assert!(matches!(masked(&["role"], None), Err(LedgerError::PermissionDenied("role"))));

        let updated = masked(&["email"], None).unwrap();
        assert_eq!(updated.email, "c@x.com");
        assert_eq!(updated.role, Role::User);
        assert_eq!(updated.password_digest, session.user.password_digest);

        let promoted = masked(&["role"], Some(&admin())).unwrap();
        assert_eq!(promoted.role, Role::Admin);
    }

    #[test]
    fn update_user_reports_missing_and_duplicate() {
        let svc = service();
        let a = signup(&svc, "a@x.com");
        signup(&svc, "b@x.com");

        let missing_id = svc.update_user(&ctx(), None, UpdateUserRequest::default());
        assert!(matches!(missing_id, Err(LedgerError::MissingUserId)));

        let unknown = svc.update_user(
            &ctx(),
            None,
            UpdateUserRequest {
                id: 4242,
                email: Some("z@x.com".into()),
                password: Some("secret12".into()),
                ..Default::default()
            },
        );
        assert!(matches!(unknown, Err(LedgerError::UserNotFound)));

        let taken = svc.update_user(
            &ctx(),
            None,
            UpdateUserRequest {
                id: a.user.id,
                email: Some("b@x.com".into()),
                update_mask: Some(vec!["email".into()]),
                ..Default::default()
            },
        );
        assert!(matches!(taken, Err(LedgerError::DuplicateEmail)));
    }

    #[test]
    fn list_users_filters_newest_first() {
        let svc = service();
        let first = signup(&svc, "alice@x.com");
        let second = signup(&svc, "bob@x.com");

        let all = svc.list_users(&ctx(), ListUsersRequest::default()).unwrap();
        assert_eq!(all.iter().map(|u| u.id).collect::<Vec<_>>(), vec![second.user.id, first.user.id]);

        let by_email = svc
            .list_users(
                &ctx(),
                ListUsersRequest {
                    id: None,
                    email: Some("ALI".into()),
                },
            )
            .unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].id, first.user.id);

        let none = svc.list_users(
            &ctx(),
            ListUsersRequest {
                id: Some(77),
                email: None,
            },
        );
        assert!(matches!(none, Err(LedgerError::UserNotFound)));
    }

    #[test]
    fn delete_user_cascades() {
        let svc = service();
        let session = signup(&svc, "a@x.com");
        let account = open(&svc, session.user.id, 100);
        post(&svc, &account, TransactionType::Withdraw, 30).unwrap();

        svc.delete_user(&ctx(), DeleteUserRequest { id: session.user.id })
            .unwrap();

        let accounts = svc.list_accounts(
            &ctx(),
            ListAccountsRequest {
                user_id: session.user.id,
                account_id: None,
            },
        );
        assert!(matches!(accounts, Err(LedgerError::UserNotFound)));
        assert!(matches!(
            svc.delete_user(&ctx(), DeleteUserRequest { id: session.user.id }),
            Err(LedgerError::UserNotFound)
        ));

        // The email is free again
        signup(&svc, "a@x.com");
    }

    #[test]
    fn create_account_checks_inputs() {
        let svc = service();
        let session = signup(&svc, "a@x.com");

        let request = |user_id, name: &str, balance: i64| CreateAccountRequest {
            user_id,
            name: name.to_string(),
            bank: Bank::Vib,
            balance: Decimal::from(balance),
        };

        assert!(matches!(
            svc.create_account(&ctx(), request(0, "main", 0)),
            Err(LedgerError::MissingUserId)
        ));
        assert!(matches!(
            svc.create_account(&ctx(), request(session.user.id, "main", -1)),
            Err(LedgerError::InvalidAccountBalance)
        ));
        assert!(matches!(
            svc.create_account(&ctx(), request(session.user.id, &"x".repeat(101), 0)),
            Err(LedgerError::Validation(fields)) if fields.contains_key("name")
        ));
        assert!(matches!(
            svc.create_account(&ctx(), request(4242, "main", 0)),
            Err(LedgerError::UserNotFound)
        ));
    }

    #[test]
    fn opening_balance_is_an_opening_deposit() {
        let svc = service();
        let session = signup(&svc, "a@x.com");
        let opened = svc
            .create_account(
                &ctx(),
                CreateAccountRequest {
                    user_id: session.user.id,
                    name: "savings".into(),
                    bank: Bank::Vcb,
                    balance: Decimal::new(12_550, 2),
                },
            )
            .unwrap();

        let deposit = opened.opening_transaction.unwrap();
        assert_eq!(deposit.transaction_type, TransactionType::Deposit);
        assert_eq!(deposit.amount, Decimal::new(12_550, 2));
        assert_eq!(history_sum(&svc, &opened.account), opened.account.balance);
    }

    #[test]
    fn create_transaction_checks_inputs_and_ownership() {
        let svc = service();
        let alice = signup(&svc, "a@x.com");
        let bob = signup(&svc, "b@x.com");
        let account = open(&svc, alice.user.id, 0);

        let request = |user_id, account_id, amount: i64| CreateTransactionRequest {
            user_id,
            account_id,
            amount: Decimal::from(amount),
            transaction_type: TransactionType::Deposit,
        };

        assert!(matches!(
            svc.create_transaction(&ctx(), request(0, account.id, 1)),
            Err(LedgerError::MissingUserId)
        ));
        assert!(matches!(
            svc.create_transaction(&ctx(), request(alice.user.id, 0, 1)),
            Err(LedgerError::MissingAccountId)
        ));
        assert!(matches!(
            svc.create_transaction(&ctx(), request(alice.user.id, account.id, 0)),
            Err(LedgerError::InvalidTransactionAmount)
        ));
        assert!(matches!(
            svc.create_transaction(&ctx(), request(bob.user.id, account.id, 1)),
            Err(LedgerError::AccountNotFound)
        ));
    }

    #[test]
    fn balance_tracks_history_through_every_mutation() {
        let svc = service();
        let session = signup(&svc, "a@x.com");
        let account = open(&svc, session.user.id, 20);

        let d1 = post(&svc, &account, TransactionType::Deposit, 100).unwrap();
        let w1 = post(&svc, &account, TransactionType::Withdraw, 40).unwrap();
        post(&svc, &account, TransactionType::Deposit, 5).unwrap();
        assert_eq!(balance_of(&svc, &account), history_sum(&svc, &account));
        assert_eq!(balance_of(&svc, &account), Decimal::from(85));

        svc.update_transaction(
            &ctx(),
            UpdateTransactionRequest {
                user_id: account.user_id,
                account_id: account.id,
                id: w1.transaction.id,
                amount: Decimal::from(60),
                update_mask: Some(vec!["amount".into()]),
            },
        )
        .unwrap();
        assert_eq!(balance_of(&svc, &account), Decimal::from(65));
        assert_eq!(balance_of(&svc, &account), history_sum(&svc, &account));

        svc.delete_transaction(
            &ctx(),
            DeleteTransactionRequest {
                user_id: account.user_id,
                account_id: Some(account.id),
                id: Some(w1.transaction.id),
            },
        )
        .unwrap();
        assert_eq!(balance_of(&svc, &account), Decimal::from(125));
        assert_eq!(balance_of(&svc, &account), history_sum(&svc, &account));

        // Shrinking the deposit below what was withdrawn is refused
        post(&svc, &account, TransactionType::Withdraw, 120).unwrap();
        let shrink = svc.update_transaction(
            &ctx(),
            UpdateTransactionRequest {
                user_id: account.user_id,
                account_id: account.id,
                id: d1.transaction.id,
                amount: Decimal::from(1),
                update_mask: None,
            },
        );
        assert!(matches!(shrink, Err(LedgerError::InvalidWithdrawAmount)));
        assert_eq!(balance_of(&svc, &account), Decimal::from(5));
    }

    #[test]
    fn overdraw_leaves_no_trace() {
        let svc = service();
        let session = signup(&svc, "a@x.com");
        let account = open(&svc, session.user.id, 10);

        let before = svc
            .list_transactions(
                &ctx(),
                ListTransactionsRequest {
                    user_id: account.user_id,
                    account_id: None,
                },
            )
            .unwrap();

        assert!(matches!(
            post(&svc, &account, TransactionType::Withdraw, 11),
            Err(LedgerError::InvalidWithdrawAmount)
        ));

        let after = svc
            .list_transactions(
                &ctx(),
                ListTransactionsRequest {
                    user_id: account.user_id,
                    account_id: None,
                },
            )
            .unwrap();
        assert_eq!(before, after);
        assert_eq!(balance_of(&svc, &account), Decimal::from(10));

        // Withdrawing exactly the balance is fine
        let drained = post(&svc, &account, TransactionType::Withdraw, 10).unwrap();
        assert_eq!(drained.balance, Decimal::ZERO);
    }

    #[test]
    fn update_transaction_rejects_immutable_mask_before_reading() {
        let svc = service();
        let session = signup(&svc, "a@x.com");
        let account = open(&svc, session.user.id, 0);
        let deposit = post(&svc, &account, TransactionType::Deposit, 50).unwrap();

        for field in ["id", "transaction_type"] {
            let result = svc.update_transaction(
                &ctx(),
                UpdateTransactionRequest {
                    user_id: account.user_id,
                    account_id: account.id,
                    id: deposit.transaction.id,
                    amount: Decimal::from(5),
                    update_mask: Some(vec![field.into()]),
                },
            );
            assert!(matches!(result, Err(LedgerError::ImmutableField(_))));
        }

        // A transaction id that does not exist still fails on the mask first
        let result = svc.update_transaction(
            &ctx(),
            UpdateTransactionRequest {
                user_id: account.user_id,
                account_id: account.id,
                id: 4242,
                amount: Decimal::from(5),
                update_mask: Some(vec!["id".into()]),
            },
        );
        assert!(matches!(result, Err(LedgerError::ImmutableField(_))));

        assert_eq!(balance_of(&svc, &account), Decimal::from(50));
    }

    #[test]
    fn update_transaction_reports_missing_rows() {
        let svc = service();
        let session = signup(&svc, "a@x.com");
        let first = open(&svc, session.user.id, 0);
        let second = open(&svc, session.user.id, 0);
        let deposit = post(&svc, &first, TransactionType::Deposit, 50).unwrap();

        let request = |account_id, id| UpdateTransactionRequest {
            user_id: session.user.id,
            account_id,
            id,
            amount: Decimal::from(5),
            update_mask: None,
        };

        assert!(matches!(
            svc.update_transaction(&ctx(), request(first.id, 0)),
            Err(LedgerError::MissingTransactionId)
        ));
        assert!(matches!(
            svc.update_transaction(&ctx(), request(4242, deposit.transaction.id)),
            Err(LedgerError::AccountNotFound)
        ));
        // Transaction exists but under another account
        assert!(matches!(
            svc.update_transaction(&ctx(), request(second.id, deposit.transaction.id)),
            Err(LedgerError::TransactionNotFound)
        ));
    }

    #[test]
    fn listing_distinguishes_missing_user_from_no_rows() {
        let svc = service();
        let session = signup(&svc, "a@x.com");
        let user_id = session.user.id;

        let accounts = svc
            .list_accounts(&ctx(), ListAccountsRequest { user_id, account_id: None })
            .unwrap();
        assert!(accounts.is_empty());

        assert!(matches!(
            svc.list_accounts(&ctx(), ListAccountsRequest { user_id, account_id: Some(9) }),
            Err(LedgerError::AccountNotFound)
        ));
        assert!(matches!(
            svc.list_accounts(&ctx(), ListAccountsRequest { user_id: 4242, account_id: None }),
            Err(LedgerError::UserNotFound)
        ));
        assert!(matches!(
            svc.list_transactions(&ctx(), ListTransactionsRequest { user_id, account_id: None }),
            Err(LedgerError::TransactionNotFound)
        ));

        let account = open(&svc, user_id, 0);
        let views = svc
            .list_transactions(&ctx(), ListTransactionsRequest { user_id, account_id: None })
            .unwrap();
        assert!(views.is_empty());

        post(&svc, &account, TransactionType::Deposit, 3).unwrap();
        let views = svc
            .list_transactions(&ctx(), ListTransactionsRequest { user_id, account_id: None })
            .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].bank, Bank::Acb);
    }

    #[test]
    fn delete_transaction_scopes() {
        let svc = service();
        let session = signup(&svc, "a@x.com");
        let user_id = session.user.id;
        let first = open(&svc, user_id, 0);
        let second = open(&svc, user_id, 0);
        post(&svc, &first, TransactionType::Deposit, 10).unwrap();
        let twenty = post(&svc, &first, TransactionType::Deposit, 20).unwrap();
        post(&svc, &second, TransactionType::Deposit, 30).unwrap();

        // An id alone is looked up across every account of the user.
        let by_id = svc
            .delete_transaction(
                &ctx(),
                DeleteTransactionRequest {
                    user_id,
                    account_id: None,
                    id: Some(twenty.transaction.id),
                },
            )
            .unwrap();
        assert_eq!(by_id, vec![twenty.transaction.id]);
        assert_eq!(balance_of(&svc, &first), Decimal::from(10));
        assert_eq!(history_sum(&svc, &first), Decimal::from(10));
        assert_eq!(balance_of(&svc, &second), Decimal::from(30));

        let from_first = svc
            .delete_transaction(
                &ctx(),
                DeleteTransactionRequest { user_id, account_id: Some(first.id), id: None },
            )
            .unwrap();
        assert_eq!(from_first.len(), 1);
        assert_eq!(balance_of(&svc, &first), Decimal::ZERO);
        assert_eq!(balance_of(&svc, &second), Decimal::from(30));

        let rest = svc
            .delete_transaction(
                &ctx(),
                DeleteTransactionRequest { user_id, account_id: None, id: None },
            )
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(balance_of(&svc, &second), Decimal::ZERO);

        let nothing_left = svc.delete_transaction(
            &ctx(),
            DeleteTransactionRequest { user_id, account_id: None, id: None },
        );
        assert!(matches!(nothing_left, Err(LedgerError::TransactionNotFound)));
    }

    #[test]
    fn deleting_a_funding_deposit_is_refused() {
        let svc = service();
        let session = signup(&svc, "a@x.com");
        let account = open(&svc, session.user.id, 0);
        let deposit = post(&svc, &account, TransactionType::Deposit, 100).unwrap();
        post(&svc, &account, TransactionType::Withdraw, 80).unwrap();

        let result = svc.delete_transaction(
            &ctx(),
            DeleteTransactionRequest {
                user_id: account.user_id,
                account_id: Some(account.id),
                id: Some(deposit.transaction.id),
            },
        );
        assert!(matches!(result, Err(LedgerError::NegativeBalance { .. })));
        assert_eq!(balance_of(&svc, &account), Decimal::from(20));
        assert_eq!(history_sum(&svc, &account), Decimal::from(20));
    }

    #[test]
    fn concurrent_withdraws_never_overdraw() {
        let svc = Arc::new(service());
        let session = signup(&svc, "a@x.com");
        let account = open(&svc, session.user.id, 50);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = Arc::clone(&svc);
                let account = account.clone();
                std::thread::spawn(move || {
                    post(&svc, &account, TransactionType::Withdraw, 10).is_ok()
                })
            })
            .collect();
        let succeeded = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(succeeded, 5);
        assert_eq!(balance_of(&svc, &account), Decimal::ZERO);
        assert_eq!(history_sum(&svc, &account), Decimal::ZERO);
    }

    #[test]
    fn done_context_writes_nothing() {
        let svc = service();
        let session = signup(&svc, "a@x.com");
        let account = open(&svc, session.user.id, 0);

        let canceled = ctx();
        canceled.cancel();
        let result = svc.create_transaction(
            &canceled,
            CreateTransactionRequest {
                user_id: account.user_id,
                account_id: account.id,
                amount: Decimal::from(5),
                transaction_type: TransactionType::Deposit,
            },
        );
        assert!(matches!(result, Err(LedgerError::Context(ContextError::Canceled))));

        let expired = ctx().with_timeout(Duration::ZERO);
        let result = svc.create_transaction(
            &expired,
            CreateTransactionRequest {
                user_id: account.user_id,
                account_id: account.id,
                amount: Decimal::from(5),
                transaction_type: TransactionType::Deposit,
            },
        );
        assert!(matches!(
            result,
            Err(LedgerError::Context(ContextError::DeadlineExceeded))
        ));
        assert_eq!(balance_of(&svc, &account), Decimal::ZERO);
    }

    #[test]
    fn seed_root_is_idempotent() {
        let svc = service();
        let root = svc.seed_root("Root@X.com", "rootpass1").unwrap().unwrap();
        assert_eq!(root.role, Role::Root);
        assert_eq!(root.email, "root@x.com");
        assert!(svc.seed_root("root@x.com", "rootpass1").unwrap().is_none());
    }
}
