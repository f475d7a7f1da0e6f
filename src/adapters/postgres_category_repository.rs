//! Postgres implementation of CategoryRepository.
//!
//! System and user-owned categories share one table; the reference variant
//! selects which partition of it a lookup may hit.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Category, CategoryRef, TransactionType};
use crate::error::AppError;
use crate::ports::CategoryRepository;

#[derive(Clone)]
pub struct PostgresCategoryRepository {
    pool: PgPool,
}

impl PostgresCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn resolve(&self, category: &CategoryRef) -> Result<Option<Category>, AppError> {
        let row = match category {
            CategoryRef::System(id) => {
                sqlx::query_as::<_, CategoryRow>(
                    "SELECT * FROM categories WHERE id = $1 AND user_id IS NULL",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            CategoryRef::UserOwned(id) => {
                sqlx::query_as::<_, CategoryRow>(
                    "SELECT * FROM categories WHERE id = $1 AND user_id IS NOT NULL",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        row.map(|r| r.into_domain()).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    user_id: Option<Uuid>,
    name: String,
    category_type: String,
    is_active: bool,
}

impl CategoryRow {
    fn into_domain(self) -> Result<Category, AppError> {
        let kind = TransactionType::parse(&self.category_type).ok_or_else(|| {
            AppError::Internal(format!("unknown category type: {}", self.category_type))
        })?;

        Ok(Category::new(
            self.id,
            self.user_id,
            self.name,
            kind,
            self.is_active,
        ))
    }
}
