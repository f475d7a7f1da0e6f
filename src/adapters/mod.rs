//! Infrastructure implementations of the `ports` contracts.

pub mod postgres_account_repository;
pub mod postgres_category_repository;
pub mod postgres_transaction_repository;
pub mod redis_cache;

pub use postgres_account_repository::PostgresAccountRepository;
pub use postgres_category_repository::PostgresCategoryRepository;
pub use postgres_transaction_repository::PostgresTransactionRepository;
pub use redis_cache::RedisCache;
