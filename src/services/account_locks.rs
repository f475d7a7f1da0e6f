//! Per-account mutation serialization.
//!
//! The balance-mutation contract is at-most-one in-flight mutation per
//! account. Every code path that mutates a balance acquires the account's
//! lock first; paths touching several accounts (transfers, account moves)
//! acquire all locks in canonical id order so two transfers between the same
//! pair of accounts cannot deadlock.
//!
//! This serializes mutations within one process. Multi-process deployments
//! additionally rely on the database: `update_balance` writes a single row,
//! so row-level locking can be layered underneath without changing callers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct AccountLocks {
    entries: StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: Uuid) -> Arc<Mutex<()>> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Lock a single account for mutation.
    pub async fn acquire(&self, id: Uuid) -> OwnedMutexGuard<()> {
        self.entry(id).lock_owned().await
    }

    /// Lock a set of accounts, deduplicated and in canonical order.
    pub async fn acquire_many(&self, ids: &[Uuid]) -> Vec<OwnedMutexGuard<()>> {
        let mut sorted = ids.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for id in sorted {
            guards.push(self.acquire(id).await);
        }
        guards
    }
}
