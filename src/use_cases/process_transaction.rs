//! Process-transaction use case.
//!
//! Validates a transaction request against its category and accounts, applies
//! the balance mutation in memory, and persists the result. A mutation
//! failure leaves a FAILED ledger record behind for audit and surfaces the
//! original error unchanged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Account, CategoryRef, LedgerTransaction, Money, NewLedgerTransaction, TransactionType,
};
use crate::error::AppError;
use crate::ports::{AccountRepository, CategoryRepository, TransactionRepository};
use crate::services::AccountLocks;

/// Input for the ProcessTransaction use case.
#[derive(Debug, Clone)]
pub struct ProcessTransactionInput {
    pub user_id: Uuid,
    pub description: String,
    pub amount: Money,
    pub kind: TransactionType,
    pub category: CategoryRef,
    pub account_id: Uuid,
    pub to_account_id: Option<Uuid>,
    pub date: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Output of the ProcessTransaction use case.
#[derive(Debug, Clone)]
pub struct ProcessTransactionOutput {
    pub transaction: LedgerTransaction,
    pub source_account: Account,
    pub destination_account: Option<Account>,
}

/// Use case for processing a single money movement against the ledger.
pub struct ProcessTransaction {
    transaction_repository: Arc<dyn TransactionRepository>,
    account_repository: Arc<dyn AccountRepository>,
    category_repository: Arc<dyn CategoryRepository>,
    locks: Arc<AccountLocks>,
}

impl ProcessTransaction {
    pub fn new(
        transaction_repository: Arc<dyn TransactionRepository>,
        account_repository: Arc<dyn AccountRepository>,
        category_repository: Arc<dyn CategoryRepository>,
        locks: Arc<AccountLocks>,
    ) -> Self {
        Self {
            transaction_repository,
            account_repository,
            category_repository,
            locks,
        }
    }

    pub async fn execute(
        &self,
        input: ProcessTransactionInput,
    ) -> Result<ProcessTransactionOutput, AppError> {
        self.validate_request(&input).await?;

        // Hold the mutation locks for every involved account until the
        // outcome (including the failure record) is persisted.
        let mut involved = vec![input.account_id];
        if let Some(to_account_id) = input.to_account_id {
            involved.push(to_account_id);
        }
        let _guards = self.locks.acquire_many(&involved).await;

        let mut source_account = self
            .account_repository
            .find_by_id(input.account_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Source account not found".to_string()))?;

        if !source_account.is_active() {
            return Err(AppError::InactiveEntity(
                "Source account is not active".to_string(),
            ));
        }

        if source_account.user_id() != input.user_id {
            return Err(AppError::Ownership(
                "Account does not belong to the user".to_string(),
            ));
        }

        let mut destination_account = match input.kind {
            TransactionType::Transfer => {
                let to_account_id = input.to_account_id.ok_or_else(|| {
                    AppError::Validation(
                        "Destination account is required for transfers".to_string(),
                    )
                })?;

                let destination = self
                    .account_repository
                    .find_by_id(to_account_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound("Destination account not found".to_string())
                    })?;

                if !destination.is_active() {
                    return Err(AppError::InactiveEntity(
                        "Destination account is not active".to_string(),
                    ));
                }

                if destination.user_id() != input.user_id {
                    return Err(AppError::Ownership(
                        "Destination account does not belong to the user".to_string(),
                    ));
                }

                Some(destination)
            }
            _ => None,
        };

        let mut transaction = LedgerTransaction::new(NewLedgerTransaction {
            user_id: input.user_id,
            description: input.description,
            amount: input.amount,
            kind: input.kind,
            category: input.category,
            account_id: input.account_id,
            to_account_id: input.to_account_id,
            status: None,
            date: input.date,
            reference: input.reference,
            metadata: input.metadata,
        })?;

        match self
            .settle(&mut source_account, destination_account.as_mut(), &mut transaction)
            .await
        {
            Ok(saved) => Ok(ProcessTransactionOutput {
                transaction: saved,
                source_account,
                destination_account,
            }),
            Err(err) => {
                // Audit trail: the attempt is recorded as FAILED. The record
                // is best effort and never masks the original error.
                if transaction.is_pending() {
                    if let Err(mark_err) = transaction.mark_as_failed() {
                        tracing::error!(
                            transaction_id = %transaction.id(),
                            "Could not mark transaction as failed: {}",
                            mark_err
                        );
                    }
                    if let Err(persist_err) =
                        self.transaction_repository.create(&transaction).await
                    {
                        tracing::error!(
                            transaction_id = %transaction.id(),
                            "Could not persist failed transaction record: {}",
                            persist_err
                        );
                    }
                }

                Err(err)
            }
        }
    }

    /// Effect phase: in-memory balance mutation first, persistence writes
    /// only after every mutation succeeded, COMPLETED only after the account
    /// writes landed.
    async fn settle(
        &self,
        source_account: &mut Account,
        mut destination_account: Option<&mut Account>,
        transaction: &mut LedgerTransaction,
    ) -> Result<LedgerTransaction, AppError> {
        Self::apply_balances(source_account, destination_account.as_deref_mut(), transaction)?;

        self.account_repository.update(source_account).await?;
        if let Some(destination) = destination_account.as_deref() {
            self.account_repository.update(destination).await?;
        }

        transaction.mark_as_completed()?;
        let saved = self.transaction_repository.create(transaction).await?;
        Ok(saved)
    }

    fn apply_balances(
        source_account: &mut Account,
        destination_account: Option<&mut Account>,
        transaction: &LedgerTransaction,
    ) -> Result<(), AppError> {
        match transaction.kind() {
            TransactionType::Income => source_account.credit(transaction.amount()),
            TransactionType::Expense => source_account.debit(transaction.amount()),
            TransactionType::Transfer => {
                let destination = destination_account.ok_or_else(|| {
                    AppError::Validation(
                        "Destination account is required for transfers".to_string(),
                    )
                })?;

                source_account.debit(transaction.amount())?;
                destination.credit(transaction.amount())
            }
        }
    }

    async fn validate_request(&self, input: &ProcessTransactionInput) -> Result<(), AppError> {
        let category = self
            .category_repository
            .resolve(&input.category)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

        if !category.usable_by(input.user_id) {
            return Err(AppError::Ownership(
                "Category does not belong to the user".to_string(),
            ));
        }

        if !category.is_active() {
            return Err(AppError::InactiveEntity(
                "Category is not active".to_string(),
            ));
        }

        if category.kind() != input.kind {
            return Err(AppError::TypeMismatch(
                "Category type does not match transaction type".to_string(),
            ));
        }

        if !input.amount.is_positive() {
            return Err(AppError::Validation(
                "Transaction amount must be greater than zero".to_string(),
            ));
        }

        if input.kind == TransactionType::Transfer {
            match input.to_account_id {
                None => {
                    return Err(AppError::Validation(
                        "Destination account is required for transfer transactions".to_string(),
                    ));
                }
                Some(to_account_id) if to_account_id == input.account_id => {
                    return Err(AppError::Validation(
                        "Source and destination accounts cannot be the same".to_string(),
                    ));
                }
                Some(_) => {}
            }
        }

        if let Some(date) = input.date {
            if date > Utc::now() {
                return Err(AppError::Validation(
                    "Transaction date cannot be in the future".to_string(),
                ));
            }
        }

        Ok(())
    }
}
