//! Shared fixtures: in-memory implementations of the repository and cache
//! ports, so the use-case and service suites run hermetically.

#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use fintrack_core::domain::{
    Account, AccountType, Category, CategoryRef, LedgerTransaction, Money, NewAccount,
    TransactionType,
};
use fintrack_core::error::AppError;
use fintrack_core::ports::{
    AccountRepository, Cache, CategoryRepository, TransactionFilter, TransactionPage,
    TransactionRepository,
};

pub fn money(s: &str) -> Money {
    Money::from_str(s).expect("valid decimal literal")
}

pub fn checking_account(user_id: Uuid, balance: &str) -> Account {
    Account::new(NewAccount {
        user_id,
        name: "Checking".to_string(),
        kind: AccountType::Checking,
        currency: "USD".to_string(),
        balance: Some(money(balance)),
        is_default: true,
        credit_limit: None,
        interest_rate: None,
    })
    .expect("valid account fixture")
}

pub fn savings_account(user_id: Uuid, balance: &str) -> Account {
    Account::new(NewAccount {
        user_id,
        name: "Savings".to_string(),
        kind: AccountType::Savings,
        currency: "USD".to_string(),
        balance: Some(money(balance)),
        is_default: false,
        credit_limit: None,
        interest_rate: None,
    })
    .expect("valid account fixture")
}

pub fn credit_card_account(user_id: Uuid, limit: &str) -> Account {
    Account::new(NewAccount {
        user_id,
        name: "Credit card".to_string(),
        kind: AccountType::CreditCard,
        currency: "USD".to_string(),
        balance: None,
        is_default: false,
        credit_limit: Some(money(limit)),
        interest_rate: None,
    })
    .expect("valid account fixture")
}

pub fn user_category(user_id: Uuid, kind: TransactionType) -> Category {
    Category::new(
        Uuid::new_v4(),
        Some(user_id),
        format!("{:?} category", kind),
        kind,
        true,
    )
}

pub fn system_category(kind: TransactionType) -> Category {
    Category::new(Uuid::new_v4(), None, format!("{:?}", kind), kind, true)
}

pub fn category_ref(category: &Category) -> CategoryRef {
    if category.is_system() {
        CategoryRef::System(category.id())
    } else {
        CategoryRef::UserOwned(category.id())
    }
}

#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl InMemoryAccountRepository {
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Arc<Self> {
        let repo = Self::default();
        {
            let mut map = repo.accounts.lock().unwrap();
            for account in accounts {
                map.insert(account.id(), account);
            }
        }
        Arc::new(repo)
    }

    pub fn balance_of(&self, id: Uuid) -> Money {
        self.accounts
            .lock()
            .unwrap()
            .get(&id)
            .map(|a| a.balance().clone())
            .expect("account exists")
    }

    pub fn insert(&self, account: Account) {
        self.accounts.lock().unwrap().insert(account.id(), account);
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        Ok(self.accounts.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, account: &Account) -> Result<Account, AppError> {
        let mut accounts = self.accounts.lock().unwrap();
        if !accounts.contains_key(&account.id()) {
            return Err(AppError::NotFound(format!(
                "Account {} not found",
                account.id()
            )));
        }
        accounts.insert(account.id(), account.clone());
        Ok(account.clone())
    }

    async fn update_balance(&self, id: Uuid, balance: &Money) -> Result<Account, AppError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Account {} not found", id)))?;

        let updated = Account::from_storage(
            account.id(),
            account.user_id(),
            account.name().to_string(),
            account.kind(),
            balance.clone(),
            account.currency().to_string(),
            account.status(),
            account.is_default(),
            account.credit_limit().cloned(),
            account.interest_rate().cloned(),
            account.created_at(),
            chrono::Utc::now(),
        );
        accounts.insert(id, updated.clone());
        Ok(updated)
    }
}

#[derive(Default)]
pub struct InMemoryCategoryRepository {
    categories: Mutex<HashMap<Uuid, Category>>,
}

impl InMemoryCategoryRepository {
    pub fn with_categories(categories: impl IntoIterator<Item = Category>) -> Arc<Self> {
        let repo = Self::default();
        {
            let mut map = repo.categories.lock().unwrap();
            for category in categories {
                map.insert(category.id(), category);
            }
        }
        Arc::new(repo)
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn resolve(&self, category: &CategoryRef) -> Result<Option<Category>, AppError> {
        let categories = self.categories.lock().unwrap();
        let found = categories.get(&category.id()).cloned();

        // The reference variant must agree with where the category lives.
        Ok(found.filter(|c| c.is_system() == category.is_system()))
    }
}

#[derive(Default)]
pub struct InMemoryTransactionRepository {
    transactions: Mutex<Vec<LedgerTransaction>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_transactions(transactions: impl IntoIterator<Item = LedgerTransaction>) -> Arc<Self> {
        let repo = Self::default();
        repo.transactions.lock().unwrap().extend(transactions);
        Arc::new(repo)
    }

    pub fn all(&self) -> Vec<LedgerTransaction> {
        self.transactions.lock().unwrap().clone()
    }
}

fn matches(tx: &LedgerTransaction, user_id: Uuid, filter: &TransactionFilter) -> bool {
    tx.user_id() == user_id
        && filter.kind.map_or(true, |kind| tx.kind() == kind)
        && filter.status.map_or(true, |status| tx.status() == status)
        && filter
            .account_id
            .map_or(true, |account| tx.account_id() == account)
        && filter
            .category_id
            .map_or(true, |category| tx.category().id() == category)
        && filter.date_from.map_or(true, |from| tx.date() >= from)
        && filter.date_to.map_or(true, |to| tx.date() < to)
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn create(
        &self,
        transaction: &LedgerTransaction,
    ) -> Result<LedgerTransaction, AppError> {
        let mut transactions = self.transactions.lock().unwrap();
        transactions.push(transaction.clone());
        Ok(transaction.clone())
    }

    async fn update(
        &self,
        transaction: &LedgerTransaction,
    ) -> Result<LedgerTransaction, AppError> {
        let mut transactions = self.transactions.lock().unwrap();
        let slot = transactions
            .iter_mut()
            .find(|t| t.id() == transaction.id())
            .ok_or_else(|| {
                AppError::NotFound(format!("Transaction {} not found", transaction.id()))
            })?;
        *slot = transaction.clone();
        Ok(transaction.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LedgerTransaction>, AppError> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id() == id)
            .cloned())
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<TransactionPage, AppError> {
        let transactions = self.transactions.lock().unwrap();
        let mut selected: Vec<LedgerTransaction> = transactions
            .iter()
            .filter(|t| matches(t, user_id, filter))
            .cloned()
            .collect();
        selected.sort_by_key(|t| std::cmp::Reverse(t.date()));

        let total = selected.len() as i64;
        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let page: Vec<LedgerTransaction> = match filter.limit {
            Some(limit) => selected
                .into_iter()
                .skip(offset)
                .take(limit.max(0) as usize)
                .collect(),
            None => selected.into_iter().skip(offset).collect(),
        };

        Ok(TransactionPage {
            transactions: page,
            total,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut transactions = self.transactions.lock().unwrap();
        let before = transactions.len();
        transactions.retain(|t| t.id() != id);
        if transactions.len() == before {
            return Err(AppError::NotFound(format!("Transaction {} not found", id)));
        }
        Ok(())
    }
}

/// Cache double that records every invalidated pattern.
#[derive(Default)]
pub struct RecordingCache {
    entries: Mutex<HashMap<String, serde_json::Value>>,
    invalidations: Mutex<Vec<String>>,
}

impl RecordingCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn invalidated_patterns(&self) -> Vec<String> {
        self.invalidations.lock().unwrap().clone()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl Cache for RecordingCache {
    async fn get_json(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    async fn set_json(&self, key: &str, value: &serde_json::Value, _ttl_secs: u64) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
    }

    async fn invalidate_pattern(&self, pattern: &str) {
        self.invalidations.lock().unwrap().push(pattern.to_string());

        let prefix = pattern.trim_end_matches('*');
        self.entries
            .lock()
            .unwrap()
            .retain(|key, _| !key.starts_with(prefix));
    }
}
