//! Cache-aware transaction orchestration.
//!
//! Wraps the ledger repositories for create/update/delete flows, keeps
//! account balances in step with edits by reverting and reapplying balance
//! effects, and invalidates the per-user cache entries on every mutation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    LedgerTransaction, NewLedgerTransaction, TransactionPatch, TransactionStatus, TransactionType,
};
use crate::error::AppError;
use crate::ports::{
    AccountRepository, Cache, CategoryRepository, TransactionFilter, TransactionRepository,
};
use crate::services::AccountLocks;
use crate::use_cases::ProcessTransactionInput;

const TRANSACTION_TTL_SECS: u64 = 300;
const LISTING_TTL_SECS: u64 = 60;

/// Input for [`TransactionService::create_transaction`]. Unlike the
/// process-transaction use case, imports may arrive already COMPLETED; the
/// balance effect is applied exactly when they do.
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    pub request: ProcessTransactionInput,
    pub status: Option<TransactionStatus>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ListTransactionsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub kind: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionListing {
    pub data: Vec<LedgerTransaction>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

pub struct TransactionService {
    transaction_repository: Arc<dyn TransactionRepository>,
    account_repository: Arc<dyn AccountRepository>,
    category_repository: Arc<dyn CategoryRepository>,
    cache: Arc<dyn Cache>,
    locks: Arc<AccountLocks>,
}

impl TransactionService {
    pub fn new(
        transaction_repository: Arc<dyn TransactionRepository>,
        account_repository: Arc<dyn AccountRepository>,
        category_repository: Arc<dyn CategoryRepository>,
        cache: Arc<dyn Cache>,
        locks: Arc<AccountLocks>,
    ) -> Self {
        Self {
            transaction_repository,
            account_repository,
            category_repository,
            cache,
            locks,
        }
    }

    pub async fn create_transaction(
        &self,
        input: CreateTransactionInput,
    ) -> Result<LedgerTransaction, AppError> {
        let request = input.request;

        let account = self
            .account_repository
            .find_by_id(request.account_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

        if account.user_id() != request.user_id {
            return Err(AppError::Ownership(
                "Account does not belong to the user".to_string(),
            ));
        }

        let category = self
            .category_repository
            .resolve(&request.category)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

        if !category.usable_by(request.user_id) {
            return Err(AppError::Ownership(
                "Category does not belong to the user".to_string(),
            ));
        }

        if !category.is_active() {
            return Err(AppError::InactiveEntity(
                "Cannot use an inactive category for transactions".to_string(),
            ));
        }

        if request.kind == TransactionType::Transfer {
            if let Some(to_account_id) = request.to_account_id {
                let destination = self
                    .account_repository
                    .find_by_id(to_account_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound("Destination account not found".to_string())
                    })?;

                if destination.user_id() != request.user_id {
                    return Err(AppError::Ownership(
                        "Destination account does not belong to the user".to_string(),
                    ));
                }
            }
        }

        let transaction = LedgerTransaction::new(NewLedgerTransaction {
            user_id: request.user_id,
            description: request.description,
            amount: request.amount,
            kind: request.kind,
            category: request.category,
            account_id: request.account_id,
            to_account_id: request.to_account_id,
            status: input.status,
            date: request.date,
            reference: request.reference,
            metadata: request.metadata,
        })?;

        let saved = self.transaction_repository.create(&transaction).await?;

        if saved.is_completed() {
            let _guards = self.locks.acquire_many(&involved_accounts(&saved)).await;
            self.apply_balance_effect(&saved).await?;
        }

        self.clear_user_cache(saved.user_id()).await;

        Ok(saved)
    }

    /// Cached single-transaction lookup. A transaction owned by a different
    /// user reads as absent.
    pub async fn get_transaction(
        &self,
        id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Option<LedgerTransaction>, AppError> {
        let cache_key = transaction_cache_key(id);

        if let Some(value) = self.cache.get_json(&cache_key).await {
            if let Ok(cached) = serde_json::from_value::<LedgerTransaction>(value) {
                if user_id.is_some_and(|user| cached.user_id() != user) {
                    return Ok(None);
                }
                return Ok(Some(cached));
            }
        }

        let transaction = self.transaction_repository.find_by_id(id).await?;

        let Some(transaction) = transaction else {
            return Ok(None);
        };

        if user_id.is_some_and(|user| transaction.user_id() != user) {
            return Ok(None);
        }

        if let Ok(value) = serde_json::to_value(&transaction) {
            self.cache
                .set_json(&cache_key, &value, TRANSACTION_TTL_SECS)
                .await;
        }

        Ok(Some(transaction))
    }

    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        query: ListTransactionsQuery,
    ) -> Result<TransactionListing, AppError> {
        let cache_key = format!(
            "transactions:{}:{}",
            user_id,
            serde_json::to_string(&query).unwrap_or_default()
        );

        if let Some(value) = self.cache.get_json(&cache_key).await {
            if let Ok(cached) = serde_json::from_value::<TransactionListing>(value) {
                return Ok(cached);
            }
        }

        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);

        let filter = TransactionFilter {
            kind: query.kind,
            status: query.status,
            account_id: query.account_id,
            category_id: query.category_id,
            date_from: query.date_from,
            date_to: query.date_to,
            limit: Some(limit),
            offset: Some((page - 1) * limit),
        };

        let result = self
            .transaction_repository
            .find_by_user(user_id, &filter)
            .await?;

        let listing = TransactionListing {
            data: result.transactions,
            total: result.total,
            page,
            limit,
        };

        if let Ok(value) = serde_json::to_value(&listing) {
            self.cache
                .set_json(&cache_key, &value, LISTING_TTL_SECS)
                .await;
        }

        Ok(listing)
    }

    /// Edit a transaction. When the edit changes what the transaction did to
    /// account balances, the old effect is reverted before the record is
    /// rewritten and the new effect applied afterwards, all under the
    /// involved accounts' locks. The window between revert and reapply is
    /// not crash-atomic without a storage-level unit of work.
    pub async fn update_transaction(
        &self,
        id: Uuid,
        patch: TransactionPatch,
    ) -> Result<LedgerTransaction, AppError> {
        let existing = self
            .transaction_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

        if let Some(new_account_id) = patch.account_id {
            if new_account_id != existing.account_id() {
                let account = self
                    .account_repository
                    .find_by_id(new_account_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

                if account.user_id() != existing.user_id() {
                    return Err(AppError::Ownership(
                        "Account does not belong to the user".to_string(),
                    ));
                }
            }
        }

        if let Some(new_to_account_id) = patch.to_account_id {
            if existing.to_account_id() != Some(new_to_account_id) {
                let account = self
                    .account_repository
                    .find_by_id(new_to_account_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound("Destination account not found".to_string())
                    })?;

                if account.user_id() != existing.user_id() {
                    return Err(AppError::Ownership(
                        "Destination account does not belong to the user".to_string(),
                    ));
                }
            }
        }

        if let Some(new_category) = patch.category {
            if new_category != existing.category() {
                let category = self
                    .category_repository
                    .resolve(&new_category)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

                if !category.usable_by(existing.user_id()) {
                    return Err(AppError::Ownership(
                        "Category does not belong to the user".to_string(),
                    ));
                }

                if !category.is_active() {
                    return Err(AppError::InactiveEntity(
                        "Cannot use an inactive category for transactions".to_string(),
                    ));
                }
            }
        }

        let affects_balances = patch.affects_balances();
        let updated = existing.apply_patch(patch)?;

        let saved = if affects_balances {
            let mut involved = involved_accounts(&existing);
            involved.extend(involved_accounts(&updated));
            let _guards = self.locks.acquire_many(&involved).await;

            self.revert_balance_effect(&existing).await?;
            let saved = self.transaction_repository.update(&updated).await?;
            self.apply_balance_effect(&saved).await?;
            saved
        } else {
            self.transaction_repository.update(&updated).await?
        };

        self.cache
            .invalidate_pattern(&transaction_cache_key(id))
            .await;
        self.clear_user_cache(saved.user_id()).await;

        Ok(saved)
    }

    /// Remove a transaction, undoing its balance effect first. Deleting a
    /// transaction that never completed leaves balances untouched.
    pub async fn delete_transaction(&self, id: Uuid) -> Result<(), AppError> {
        let transaction = self
            .transaction_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

        {
            let _guards = self
                .locks
                .acquire_many(&involved_accounts(&transaction))
                .await;

            self.revert_balance_effect(&transaction).await?;
            self.transaction_repository.delete(id).await?;
        }

        self.cache
            .invalidate_pattern(&transaction_cache_key(id))
            .await;
        self.clear_user_cache(transaction.user_id()).await;

        Ok(())
    }

    /// Apply the balance movement a COMPLETED transaction stands for.
    /// Callers must hold the involved accounts' locks.
    async fn apply_balance_effect(&self, transaction: &LedgerTransaction) -> Result<(), AppError> {
        if transaction.status() != TransactionStatus::Completed {
            return Ok(());
        }

        let Some(account) = self
            .account_repository
            .find_by_id(transaction.account_id())
            .await?
        else {
            tracing::warn!(
                transaction_id = %transaction.id(),
                account_id = %transaction.account_id(),
                "Skipping balance update for missing account"
            );
            return Ok(());
        };

        let amount = transaction.amount();

        match transaction.kind() {
            TransactionType::Income => {
                self.account_repository
                    .update_balance(transaction.account_id(), &account.balance().plus(amount))
                    .await?;
            }
            TransactionType::Expense => {
                self.account_repository
                    .update_balance(transaction.account_id(), &account.balance().minus(amount))
                    .await?;
            }
            TransactionType::Transfer => {
                if let Some(to_account_id) = transaction.to_account_id() {
                    let Some(destination) =
                        self.account_repository.find_by_id(to_account_id).await?
                    else {
                        tracing::warn!(
                            transaction_id = %transaction.id(),
                            account_id = %to_account_id,
                            "Skipping balance update for missing destination account"
                        );
                        return Ok(());
                    };

                    self.account_repository
                        .update_balance(transaction.account_id(), &account.balance().minus(amount))
                        .await?;
                    self.account_repository
                        .update_balance(to_account_id, &destination.balance().plus(amount))
                        .await?;
                }
            }
        }

        Ok(())
    }

    /// Symmetric inverse of [`Self::apply_balance_effect`]. Callers must hold
    /// the involved accounts' locks.
    async fn revert_balance_effect(&self, transaction: &LedgerTransaction) -> Result<(), AppError> {
        if transaction.status() != TransactionStatus::Completed {
            return Ok(());
        }

        let Some(account) = self
            .account_repository
            .find_by_id(transaction.account_id())
            .await?
        else {
            tracing::warn!(
                transaction_id = %transaction.id(),
                account_id = %transaction.account_id(),
                "Skipping balance revert for missing account"
            );
            return Ok(());
        };

        let amount = transaction.amount();

        match transaction.kind() {
            TransactionType::Income => {
                self.account_repository
                    .update_balance(transaction.account_id(), &account.balance().minus(amount))
                    .await?;
            }
            TransactionType::Expense => {
                self.account_repository
                    .update_balance(transaction.account_id(), &account.balance().plus(amount))
                    .await?;
            }
            TransactionType::Transfer => {
                if let Some(to_account_id) = transaction.to_account_id() {
                    let Some(destination) =
                        self.account_repository.find_by_id(to_account_id).await?
                    else {
                        tracing::warn!(
                            transaction_id = %transaction.id(),
                            account_id = %to_account_id,
                            "Skipping balance revert for missing destination account"
                        );
                        return Ok(());
                    };

                    self.account_repository
                        .update_balance(transaction.account_id(), &account.balance().plus(amount))
                        .await?;
                    self.account_repository
                        .update_balance(to_account_id, &destination.balance().minus(amount))
                        .await?;
                }
            }
        }

        Ok(())
    }

    async fn clear_user_cache(&self, user_id: Uuid) {
        for pattern in user_cache_patterns(user_id) {
            self.cache.invalidate_pattern(&pattern).await;
        }
    }
}

fn transaction_cache_key(id: Uuid) -> String {
    format!("transaction:{}", id)
}

fn user_cache_patterns(user_id: Uuid) -> [String; 6] {
    [
        format!("transactions:{}:*", user_id),
        format!("monthly-stats:{}:*", user_id),
        format!("category-analysis:{}:*", user_id),
        format!("trend-analysis:{}", user_id),
        format!("comparison-analysis:{}:*", user_id),
        format!("advanced-insights:{}", user_id),
    ]
}

fn involved_accounts(transaction: &LedgerTransaction) -> Vec<Uuid> {
    let mut accounts = vec![transaction.account_id()];
    if let Some(to_account_id) = transaction.to_account_id() {
        accounts.push(to_account_id);
    }
    accounts
}
