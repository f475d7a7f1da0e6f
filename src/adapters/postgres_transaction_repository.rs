//! Postgres implementation of TransactionRepository.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    CategoryRef, LedgerTransaction, Money, TransactionStatus, TransactionType,
};
use crate::error::AppError;
use crate::ports::{TransactionFilter, TransactionPage, TransactionRepository};

const CATEGORY_SCOPE_SYSTEM: &str = "system";
const CATEGORY_SCOPE_USER: &str = "user";

/// Postgres-backed ledger repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn create(
        &self,
        transaction: &LedgerTransaction,
    ) -> Result<LedgerTransaction, AppError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO transactions (
                id, user_id, description, amount, transaction_type,
                category_id, category_scope, account_id, to_account_id, status,
                date, reference, metadata, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(transaction.id())
        .bind(transaction.user_id())
        .bind(transaction.description())
        .bind(transaction.amount().as_decimal())
        .bind(transaction.kind().as_str())
        .bind(transaction.category().id())
        .bind(category_scope(transaction.category()))
        .bind(transaction.account_id())
        .bind(transaction.to_account_id())
        .bind(transaction.status().as_str())
        .bind(transaction.date())
        .bind(transaction.reference())
        .bind(transaction.metadata())
        .bind(transaction.created_at())
        .bind(transaction.updated_at())
        .fetch_one(&self.pool)
        .await?;

        row.into_domain()
    }

    async fn update(
        &self,
        transaction: &LedgerTransaction,
    ) -> Result<LedgerTransaction, AppError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            UPDATE transactions
            SET description = $2, amount = $3, transaction_type = $4,
                category_id = $5, category_scope = $6, account_id = $7,
                to_account_id = $8, status = $9, date = $10, reference = $11,
                metadata = $12, updated_at = $13
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(transaction.id())
        .bind(transaction.description())
        .bind(transaction.amount().as_decimal())
        .bind(transaction.kind().as_str())
        .bind(transaction.category().id())
        .bind(category_scope(transaction.category()))
        .bind(transaction.account_id())
        .bind(transaction.to_account_id())
        .bind(transaction.status().as_str())
        .bind(transaction.date())
        .bind(transaction.reference())
        .bind(transaction.metadata())
        .bind(transaction.updated_at())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| {
            AppError::NotFound(format!("Transaction {} not found", transaction.id()))
        })?
        .into_domain()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LedgerTransaction>, AppError> {
        let row = sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_domain()).transpose()
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<TransactionPage, AppError> {
        let kind = filter.kind.map(|k| k.as_str());
        let status = filter.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT * FROM transactions
            WHERE user_id = $1
              AND ($2::text IS NULL OR transaction_type = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::uuid IS NULL OR account_id = $4)
              AND ($5::uuid IS NULL OR category_id = $5)
              AND ($6::timestamptz IS NULL OR date >= $6)
              AND ($7::timestamptz IS NULL OR date < $7)
            ORDER BY date DESC, created_at DESC
            LIMIT $8 OFFSET $9
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(status)
        .bind(filter.account_id)
        .bind(filter.category_id)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(filter.limit)
        .bind(filter.offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM transactions
            WHERE user_id = $1
              AND ($2::text IS NULL OR transaction_type = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::uuid IS NULL OR account_id = $4)
              AND ($5::uuid IS NULL OR category_id = $5)
              AND ($6::timestamptz IS NULL OR date >= $6)
              AND ($7::timestamptz IS NULL OR date < $7)
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(status)
        .bind(filter.account_id)
        .bind(filter.category_id)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .fetch_one(&self.pool)
        .await?;

        let transactions = rows
            .into_iter()
            .map(|r| r.into_domain())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TransactionPage {
            transactions,
            total,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Transaction {} not found", id)));
        }

        Ok(())
    }
}

fn category_scope(category: CategoryRef) -> &'static str {
    if category.is_system() {
        CATEGORY_SCOPE_SYSTEM
    } else {
        CATEGORY_SCOPE_USER
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: Uuid,
    description: String,
    amount: BigDecimal,
    transaction_type: String,
    category_id: Uuid,
    category_scope: String,
    account_id: Uuid,
    to_account_id: Option<Uuid>,
    status: String,
    date: DateTime<Utc>,
    reference: Option<String>,
    metadata: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> Result<LedgerTransaction, AppError> {
        let kind = TransactionType::parse(&self.transaction_type).ok_or_else(|| {
            AppError::Internal(format!(
                "unknown transaction type: {}",
                self.transaction_type
            ))
        })?;
        let status = TransactionStatus::parse(&self.status).ok_or_else(|| {
            AppError::Internal(format!("unknown transaction status: {}", self.status))
        })?;
        let category = match self.category_scope.as_str() {
            CATEGORY_SCOPE_SYSTEM => CategoryRef::System(self.category_id),
            CATEGORY_SCOPE_USER => CategoryRef::UserOwned(self.category_id),
            other => {
                return Err(AppError::Internal(format!(
                    "unknown category scope: {}",
                    other
                )));
            }
        };

        Ok(LedgerTransaction::from_storage(
            self.id,
            self.user_id,
            self.description,
            Money::new(self.amount),
            kind,
            category,
            self.account_id,
            self.to_account_id,
            status,
            self.date,
            self.reference,
            self.metadata,
            self.created_at,
            self.updated_at,
        ))
    }
}
