//! Ledger transaction domain entity.
//!
//! A single money movement (income, expense or transfer) with a monotonic
//! lifecycle status. Instances are immutable after validation except for the
//! status transitions below; edits are expressed by constructing a new value
//! from the old one plus a patch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CategoryRef, Money};
use crate::error::AppError;
use crate::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
            TransactionType::Transfer => "TRANSFER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "INCOME" => Some(TransactionType::Income),
            "EXPENSE" => Some(TransactionType::Expense),
            "TRANSFER" => Some(TransactionType::Transfer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Cancelled => "CANCELLED",
            TransactionStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(TransactionStatus::Pending),
            "COMPLETED" => Some(TransactionStatus::Completed),
            "CANCELLED" => Some(TransactionStatus::Cancelled),
            "FAILED" => Some(TransactionStatus::Failed),
            _ => None,
        }
    }
}

/// Construction parameters for [`LedgerTransaction::new`].
#[derive(Debug, Clone)]
pub struct NewLedgerTransaction {
    pub user_id: Uuid,
    pub description: String,
    pub amount: Money,
    pub kind: TransactionType,
    pub category: CategoryRef,
    pub account_id: Uuid,
    pub to_account_id: Option<Uuid>,
    pub status: Option<TransactionStatus>,
    pub date: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Partial update applied through [`LedgerTransaction::apply_patch`].
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub description: Option<String>,
    pub amount: Option<Money>,
    pub kind: Option<TransactionType>,
    pub category: Option<CategoryRef>,
    pub account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
    pub date: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl TransactionPatch {
    /// Whether applying this patch changes which balance mutations the
    /// transaction stands for.
    pub fn affects_balances(&self) -> bool {
        self.amount.is_some()
            || self.kind.is_some()
            || self.account_id.is_some()
            || self.to_account_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    id: Uuid,
    user_id: Uuid,
    description: String,
    amount: Money,
    #[serde(rename = "type")]
    kind: TransactionType,
    category: CategoryRef,
    account_id: Uuid,
    to_account_id: Option<Uuid>,
    status: TransactionStatus,
    date: DateTime<Utc>,
    reference: Option<String>,
    metadata: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LedgerTransaction {
    pub fn new(params: NewLedgerTransaction) -> Result<Self, AppError> {
        let now = Utc::now();
        let transaction = Self {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            description: validation::sanitize_string(&params.description),
            amount: params.amount,
            kind: params.kind,
            category: params.category,
            account_id: params.account_id,
            to_account_id: params.to_account_id,
            status: params.status.unwrap_or(TransactionStatus::Pending),
            date: params.date.unwrap_or(now),
            reference: params.reference,
            metadata: params.metadata,
            created_at: now,
            updated_at: now,
        };

        transaction.validate()?;
        Ok(transaction)
    }

    /// Rehydrate a transaction from storage without re-running construction
    /// validation.
    #[allow(clippy::too_many_arguments)]
    pub fn from_storage(
        id: Uuid,
        user_id: Uuid,
        description: String,
        amount: Money,
        kind: TransactionType,
        category: CategoryRef,
        account_id: Uuid,
        to_account_id: Option<Uuid>,
        status: TransactionStatus,
        date: DateTime<Utc>,
        reference: Option<String>,
        metadata: Option<serde_json::Value>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            description,
            amount,
            kind,
            category,
            account_id,
            to_account_id,
            status,
            date,
            reference,
            metadata,
            created_at,
            updated_at,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        validation::validate_required("description", &self.description)?;
        validation::validate_max_len(
            "description",
            &self.description,
            validation::DESCRIPTION_MAX_LEN,
        )?;

        if !self.amount.is_positive() {
            return Err(AppError::Validation(
                "Transaction amount must be greater than zero".to_string(),
            ));
        }

        if self.kind == TransactionType::Transfer {
            match self.to_account_id {
                None => {
                    return Err(AppError::Validation(
                        "Transfer transactions require a destination account".to_string(),
                    ));
                }
                Some(to) if to == self.account_id => {
                    return Err(AppError::Validation(
                        "Source and destination accounts cannot be the same".to_string(),
                    ));
                }
                Some(_) => {}
            }
        }

        if let Some(reference) = &self.reference {
            validation::validate_max_len("reference", reference, validation::REFERENCE_MAX_LEN)?;
        }

        if self.date > Utc::now() {
            return Err(AppError::Validation(
                "Transaction date cannot be in the future".to_string(),
            ));
        }

        Ok(())
    }

    /// New value from the old one plus a delta; identity, creation time and
    /// status carry over, everything merged is revalidated.
    pub fn apply_patch(&self, patch: TransactionPatch) -> Result<Self, AppError> {
        let kind = patch.kind.unwrap_or(self.kind);
        let to_account_id = if kind == TransactionType::Transfer {
            patch.to_account_id.or(self.to_account_id)
        } else {
            None
        };

        let updated = Self {
            id: self.id,
            user_id: self.user_id,
            description: patch
                .description
                .map(|d| validation::sanitize_string(&d))
                .unwrap_or_else(|| self.description.clone()),
            amount: patch.amount.unwrap_or_else(|| self.amount.clone()),
            kind,
            category: patch.category.unwrap_or(self.category),
            account_id: patch.account_id.unwrap_or(self.account_id),
            to_account_id,
            status: self.status,
            date: patch.date.unwrap_or(self.date),
            reference: patch.reference.or_else(|| self.reference.clone()),
            metadata: patch.metadata.or_else(|| self.metadata.clone()),
            created_at: self.created_at,
            updated_at: Utc::now(),
        };

        updated.validate()?;
        Ok(updated)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> &Money {
        &self.amount
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn category(&self) -> CategoryRef {
        self.category
    }

    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    pub fn to_account_id(&self) -> Option<Uuid> {
        self.to_account_id
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_transfer(&self) -> bool {
        self.kind == TransactionType::Transfer
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionType::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionType::Expense
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    /// PENDING -> COMPLETED. The only path into the completed state.
    pub fn mark_as_completed(&mut self) -> Result<(), AppError> {
        if self.status != TransactionStatus::Pending {
            return Err(AppError::InvalidState(
                "Only pending transactions can be completed".to_string(),
            ));
        }

        self.status = TransactionStatus::Completed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Completed transactions are audit-significant and stay completed;
    /// reversal is a balance revert, never a status change.
    pub fn mark_as_cancelled(&mut self) -> Result<(), AppError> {
        if self.status == TransactionStatus::Completed {
            return Err(AppError::InvalidState(
                "Completed transactions cannot be cancelled".to_string(),
            ));
        }

        self.status = TransactionStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn mark_as_failed(&mut self) -> Result<(), AppError> {
        if self.status == TransactionStatus::Completed {
            return Err(AppError::InvalidState(
                "Completed transactions cannot be marked as failed".to_string(),
            ));
        }

        self.status = TransactionStatus::Failed;
        self.updated_at = Utc::now();
        Ok(())
    }
}
