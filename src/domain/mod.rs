//! Domain entities. Framework-agnostic; persistence and HTTP shapes live in
//! the adapters and handlers.

pub mod account;
pub mod category;
pub mod money;
pub mod transaction;

pub use account::{Account, AccountStatus, AccountType, NewAccount};
pub use category::{Category, CategoryRef};
pub use money::Money;
pub use transaction::{
    LedgerTransaction, NewLedgerTransaction, TransactionPatch, TransactionStatus, TransactionType,
};
