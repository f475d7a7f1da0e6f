//! Repository and cache contracts consumed by the use-case and service
//! layers. Implementations live in `adapters`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Account, Category, CategoryRef, LedgerTransaction, Money, TransactionStatus, TransactionType,
};
use crate::error::AppError;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError>;

    /// Persist the full account state (name, status, limits, balance).
    async fn update(&self, account: &Account) -> Result<Account, AppError>;

    /// Persist only a new balance. The caller must hold the account's
    /// mutation lock; concurrent writers would otherwise overwrite each other.
    async fn update_balance(&self, id: Uuid, balance: &Money) -> Result<Account, AppError>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Resolve a category reference against the matching backing table.
    async fn resolve(&self, category: &CategoryRef) -> Result<Option<Category>, AppError>;
}

/// Filters for ledger queries. All fields are optional and combine with AND.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub kind: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub date_to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TransactionFilter {
    pub fn date_range(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            date_from: Some(from),
            date_to: Some(to),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransactionPage {
    pub transactions: Vec<LedgerTransaction>,
    pub total: i64,
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create(&self, transaction: &LedgerTransaction)
        -> Result<LedgerTransaction, AppError>;

    async fn update(&self, transaction: &LedgerTransaction)
        -> Result<LedgerTransaction, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LedgerTransaction>, AppError>;

    async fn find_by_user(
        &self,
        user_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<TransactionPage, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

/// Best-effort JSON cache. Failures degrade to misses; correctness never
/// depends on a hit.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_json(&self, key: &str) -> Option<serde_json::Value>;

    async fn set_json(&self, key: &str, value: &serde_json::Value, ttl_secs: u64);

    async fn invalidate_pattern(&self, pattern: &str);
}
