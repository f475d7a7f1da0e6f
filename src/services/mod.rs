pub mod account_locks;
pub mod analytics;
pub mod transaction_service;

pub use account_locks::AccountLocks;
pub use analytics::AnalyticsService;
pub use transaction_service::{
    CreateTransactionInput, ListTransactionsQuery, TransactionListing, TransactionService,
};
