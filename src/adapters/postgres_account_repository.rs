//! Postgres implementation of AccountRepository.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Account, AccountStatus, AccountType, Money};
use crate::error::AppError;
use crate::ports::AccountRepository;

/// Postgres-backed account repository.
#[derive(Clone)]
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_domain()).transpose()
    }

    async fn update(&self, account: &Account) -> Result<Account, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE accounts
            SET name = $2, account_type = $3, balance = $4, currency = $5,
                status = $6, is_default = $7, credit_limit = $8,
                interest_rate = $9, updated_at = $10
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(account.id())
        .bind(account.name())
        .bind(account.kind().as_str())
        .bind(account.balance().as_decimal())
        .bind(account.currency())
        .bind(account.status().as_str())
        .bind(account.is_default())
        .bind(account.credit_limit().map(Money::as_decimal))
        .bind(account.interest_rate())
        .bind(account.updated_at())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| AppError::NotFound(format!("Account {} not found", account.id())))?
            .into_domain()
    }

    async fn update_balance(&self, id: Uuid, balance: &Money) -> Result<Account, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "UPDATE accounts SET balance = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(balance.as_decimal())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| AppError::NotFound(format!("Account {} not found", id)))?
            .into_domain()
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    account_type: String,
    balance: BigDecimal,
    currency: String,
    status: String,
    is_default: bool,
    credit_limit: Option<BigDecimal>,
    interest_rate: Option<BigDecimal>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl AccountRow {
    fn into_domain(self) -> Result<Account, AppError> {
        let kind = AccountType::parse(&self.account_type).ok_or_else(|| {
            AppError::Internal(format!("unknown account type: {}", self.account_type))
        })?;
        let status = AccountStatus::parse(&self.status)
            .ok_or_else(|| AppError::Internal(format!("unknown account status: {}", self.status)))?;

        Ok(Account::from_storage(
            self.id,
            self.user_id,
            self.name,
            kind,
            Money::new(self.balance),
            self.currency,
            status,
            self.is_default,
            self.credit_limit.map(Money::new),
            self.interest_rate,
            self.created_at,
            self.updated_at,
        ))
    }
}
