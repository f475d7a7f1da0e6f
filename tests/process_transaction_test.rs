//! End-to-end coverage of the process-transaction use case over in-memory
//! ports.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use common::*;
use fintrack_core::domain::{Account, Category, TransactionStatus, TransactionType};
use fintrack_core::error::AppError;
use fintrack_core::services::AccountLocks;
use fintrack_core::use_cases::{ProcessTransaction, ProcessTransactionInput};

struct Harness {
    processor: ProcessTransaction,
    accounts: Arc<InMemoryAccountRepository>,
    transactions: Arc<InMemoryTransactionRepository>,
}

fn harness(accounts: Vec<Account>, categories: Vec<Category>) -> Harness {
    let account_repository = InMemoryAccountRepository::with_accounts(accounts);
    let category_repository = InMemoryCategoryRepository::with_categories(categories);
    let transaction_repository = InMemoryTransactionRepository::new();

    let processor = ProcessTransaction::new(
        transaction_repository.clone(),
        account_repository.clone(),
        category_repository,
        Arc::new(AccountLocks::new()),
    );

    Harness {
        processor,
        accounts: account_repository,
        transactions: transaction_repository,
    }
}

fn request(
    user_id: Uuid,
    category: &Category,
    account: &Account,
    amount: &str,
    kind: TransactionType,
) -> ProcessTransactionInput {
    ProcessTransactionInput {
        user_id,
        description: "test movement".to_string(),
        amount: money(amount),
        kind,
        category: category_ref(category),
        account_id: account.id(),
        to_account_id: None,
        date: None,
        reference: None,
        metadata: None,
    }
}

#[tokio::test]
async fn expense_debits_source_and_completes() {
    let user = Uuid::new_v4();
    let account = checking_account(user, "1000.00");
    let category = user_category(user, TransactionType::Expense);
    let h = harness(vec![account.clone()], vec![category.clone()]);

    let output = h
        .processor
        .execute(request(user, &category, &account, "25.50", TransactionType::Expense))
        .await
        .unwrap();

    assert_eq!(output.transaction.status(), TransactionStatus::Completed);
    assert_eq!(output.source_account.balance(), &money("974.50"));
    assert!(output.destination_account.is_none());

    // persisted state agrees with the returned snapshot
    assert_eq!(h.accounts.balance_of(account.id()), money("974.50"));
    let persisted = h.transactions.all();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].status(), TransactionStatus::Completed);
}

#[tokio::test]
async fn income_credits_source() {
    let user = Uuid::new_v4();
    let account = checking_account(user, "100.00");
    let category = user_category(user, TransactionType::Income);
    let h = harness(vec![account.clone()], vec![category.clone()]);

    h.processor
        .execute(request(user, &category, &account, "900.00", TransactionType::Income))
        .await
        .unwrap();

    assert_eq!(h.accounts.balance_of(account.id()), money("1000.00"));
}

#[tokio::test]
async fn insufficient_funds_persists_failed_record() {
    let user = Uuid::new_v4();
    let account = checking_account(user, "1000.00");
    let category = user_category(user, TransactionType::Expense);
    let h = harness(vec![account.clone()], vec![category.clone()]);

    let err = h
        .processor
        .execute(request(user, &category, &account, "2000", TransactionType::Expense))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientFunds(_)));
    assert_eq!(h.accounts.balance_of(account.id()), money("1000.00"));

    let persisted = h.transactions.all();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].status(), TransactionStatus::Failed);
    assert_eq!(persisted[0].amount(), &money("2000"));
}

#[tokio::test]
async fn transfer_moves_funds_between_accounts() {
    let user = Uuid::new_v4();
    let source = checking_account(user, "1000.00");
    let destination = savings_account(user, "500.00");
    let category = user_category(user, TransactionType::Transfer);
    let h = harness(
        vec![source.clone(), destination.clone()],
        vec![category.clone()],
    );

    let mut input = request(user, &category, &source, "200.00", TransactionType::Transfer);
    input.to_account_id = Some(destination.id());

    let output = h.processor.execute(input).await.unwrap();

    assert_eq!(output.transaction.status(), TransactionStatus::Completed);
    assert_eq!(h.accounts.balance_of(source.id()), money("800.00"));
    assert_eq!(h.accounts.balance_of(destination.id()), money("700.00"));
    assert_eq!(
        output.destination_account.unwrap().balance(),
        &money("700.00")
    );
}

#[tokio::test]
async fn self_transfer_is_rejected_before_touching_accounts() {
    let user = Uuid::new_v4();
    let account = checking_account(user, "1000.00");
    let category = user_category(user, TransactionType::Transfer);
    let h = harness(vec![account.clone()], vec![category.clone()]);

    let mut input = request(user, &category, &account, "200.00", TransactionType::Transfer);
    input.to_account_id = Some(account.id());

    let err = h.processor.execute(input).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(
        err.to_string()
            .contains("Source and destination accounts cannot be the same")
    );
    assert_eq!(h.accounts.balance_of(account.id()), money("1000.00"));
    assert!(h.transactions.all().is_empty());
}

#[tokio::test]
async fn transfer_without_destination_is_rejected() {
    let user = Uuid::new_v4();
    let account = checking_account(user, "1000.00");
    let category = user_category(user, TransactionType::Transfer);
    let h = harness(vec![account.clone()], vec![category.clone()]);

    let input = request(user, &category, &account, "200.00", TransactionType::Transfer);
    let err = h.processor.execute(input).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(h.transactions.all().is_empty());
}

#[tokio::test]
async fn failed_transfer_leaves_no_partial_state() {
    let user = Uuid::new_v4();
    let source = checking_account(user, "100.00");
    let destination = savings_account(user, "500.00");
    let category = user_category(user, TransactionType::Transfer);
    let h = harness(
        vec![source.clone(), destination.clone()],
        vec![category.clone()],
    );

    let mut input = request(user, &category, &source, "250.00", TransactionType::Transfer);
    input.to_account_id = Some(destination.id());

    let err = h.processor.execute(input).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientFunds(_)));

    // neither side of the transfer was persisted
    assert_eq!(h.accounts.balance_of(source.id()), money("100.00"));
    assert_eq!(h.accounts.balance_of(destination.id()), money("500.00"));

    // but the attempt is on record
    let persisted = h.transactions.all();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].status(), TransactionStatus::Failed);
}

#[tokio::test]
async fn credit_card_debit_beyond_limit_fails() {
    let user = Uuid::new_v4();
    let card = credit_card_account(user, "500.00");
    let category = user_category(user, TransactionType::Expense);
    let h = harness(vec![card.clone()], vec![category.clone()]);

    let err = h
        .processor
        .execute(request(user, &category, &card, "600.00", TransactionType::Expense))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::CreditLimitExceeded(_)));
    assert_eq!(h.accounts.balance_of(card.id()), money("0"));

    let persisted = h.transactions.all();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].status(), TransactionStatus::Failed);
}

#[tokio::test]
async fn credit_card_debit_within_limit_succeeds() {
    let user = Uuid::new_v4();
    let card = credit_card_account(user, "500.00");
    let category = user_category(user, TransactionType::Expense);
    let h = harness(vec![card.clone()], vec![category.clone()]);

    h.processor
        .execute(request(user, &category, &card, "400.00", TransactionType::Expense))
        .await
        .unwrap();

    assert_eq!(h.accounts.balance_of(card.id()), money("-400.00"));
}

#[tokio::test]
async fn category_type_must_match_transaction_type() {
    let user = Uuid::new_v4();
    let account = checking_account(user, "1000.00");
    let income_category = user_category(user, TransactionType::Income);
    let h = harness(vec![account.clone()], vec![income_category.clone()]);

    let err = h
        .processor
        .execute(request(
            user,
            &income_category,
            &account,
            "10.00",
            TransactionType::Expense,
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TypeMismatch(_)));
    assert_eq!(h.accounts.balance_of(account.id()), money("1000.00"));
    assert!(h.transactions.all().is_empty());
}

#[tokio::test]
async fn unknown_category_is_not_found() {
    let user = Uuid::new_v4();
    let account = checking_account(user, "1000.00");
    let unknown = user_category(user, TransactionType::Expense);
    let h = harness(vec![account.clone()], vec![]);

    let err = h
        .processor
        .execute(request(user, &unknown, &account, "10.00", TransactionType::Expense))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn foreign_category_is_rejected() {
    let user = Uuid::new_v4();
    let account = checking_account(user, "1000.00");
    let foreign = user_category(Uuid::new_v4(), TransactionType::Expense);
    let h = harness(vec![account.clone()], vec![foreign.clone()]);

    let err = h
        .processor
        .execute(request(user, &foreign, &account, "10.00", TransactionType::Expense))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Ownership(_)));
}

#[tokio::test]
async fn system_category_is_usable_by_any_user() {
    let user = Uuid::new_v4();
    let account = checking_account(user, "1000.00");
    let shared = system_category(TransactionType::Expense);
    let h = harness(vec![account.clone()], vec![shared.clone()]);

    h.processor
        .execute(request(user, &shared, &account, "10.00", TransactionType::Expense))
        .await
        .unwrap();

    assert_eq!(h.accounts.balance_of(account.id()), money("990.00"));
}

#[tokio::test]
async fn inactive_category_is_rejected() {
    let user = Uuid::new_v4();
    let account = checking_account(user, "1000.00");
    let inactive = Category::new(
        Uuid::new_v4(),
        Some(user),
        "Old category".to_string(),
        TransactionType::Expense,
        false,
    );
    let h = harness(vec![account.clone()], vec![inactive.clone()]);

    let err = h
        .processor
        .execute(request(user, &inactive, &account, "10.00", TransactionType::Expense))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InactiveEntity(_)));
}

#[tokio::test]
async fn frozen_source_account_is_rejected() {
    let user = Uuid::new_v4();
    let mut account = checking_account(user, "1000.00");
    account.freeze().unwrap();
    let category = user_category(user, TransactionType::Expense);
    let h = harness(vec![account.clone()], vec![category.clone()]);

    let err = h
        .processor
        .execute(request(user, &category, &account, "10.00", TransactionType::Expense))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InactiveEntity(_)));
}

#[tokio::test]
async fn foreign_account_is_rejected() {
    let user = Uuid::new_v4();
    let foreign_account = checking_account(Uuid::new_v4(), "1000.00");
    let category = user_category(user, TransactionType::Expense);
    let h = harness(vec![foreign_account.clone()], vec![category.clone()]);

    let err = h
        .processor
        .execute(request(
            user,
            &category,
            &foreign_account,
            "10.00",
            TransactionType::Expense,
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Ownership(_)));
}

#[tokio::test]
async fn future_date_is_rejected() {
    let user = Uuid::new_v4();
    let account = checking_account(user, "1000.00");
    let category = user_category(user, TransactionType::Expense);
    let h = harness(vec![account.clone()], vec![category.clone()]);

    let mut input = request(user, &category, &account, "10.00", TransactionType::Expense);
    input.date = Some(Utc::now() + Duration::days(2));

    let err = h.processor.execute(input).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(h.transactions.all().is_empty());
}
