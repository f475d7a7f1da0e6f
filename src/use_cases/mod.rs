pub mod process_transaction;

pub use process_transaction::{
    ProcessTransaction, ProcessTransactionInput, ProcessTransactionOutput,
};
