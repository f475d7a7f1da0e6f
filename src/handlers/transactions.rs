//! Transaction and analytics HTTP handlers.
//!
//! Thin layer: deserialize, resolve the calling user from the `x-user-id`
//! header (session handling proper lives upstream), call the use case or
//! service, and let `AppError` render the response on failure.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::domain::{
    Account, CategoryRef, LedgerTransaction, Money, TransactionPatch, TransactionStatus,
    TransactionType,
};
use crate::error::AppError;
use crate::services::{CreateTransactionInput, ListTransactionsQuery};
use crate::use_cases::ProcessTransactionInput;

fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let value = headers
        .get("x-user-id")
        .ok_or_else(|| AppError::Validation("x-user-id header is required".to_string()))?;

    let value = value
        .to_str()
        .map_err(|_| AppError::Validation("x-user-id header is not valid".to_string()))?;

    Uuid::parse_str(value)
        .map_err(|_| AppError::Validation("x-user-id header must be a UUID".to_string()))
}

fn parse_amount(raw: &str) -> Result<Money, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("Invalid amount: {}", raw)))
}

#[derive(Debug, Deserialize)]
pub struct TransactionPayload {
    pub description: String,
    /// Decimal string; never a binary float.
    pub amount: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: CategoryRef,
    pub account_id: Uuid,
    pub to_account_id: Option<Uuid>,
    pub date: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl TransactionPayload {
    fn into_input(self, user_id: Uuid) -> Result<ProcessTransactionInput, AppError> {
        Ok(ProcessTransactionInput {
            user_id,
            description: self.description,
            amount: parse_amount(&self.amount)?,
            kind: self.kind,
            category: self.category,
            account_id: self.account_id,
            to_account_id: self.to_account_id,
            date: self.date,
            reference: self.reference,
            metadata: self.metadata,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ProcessTransactionResponse {
    pub transaction: LedgerTransaction,
    pub source_account: Account,
    pub destination_account: Option<Account>,
}

pub async fn process_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TransactionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user_id_from_headers(&headers)?;
    let input = payload.into_input(user_id)?;

    let output = state.processor.execute(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ProcessTransactionResponse {
            transaction: output.transaction,
            source_account: output.source_account,
            destination_account: output.destination_account,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ImportTransactionPayload {
    #[serde(flatten)]
    pub transaction: TransactionPayload,
    pub status: Option<TransactionStatus>,
}

/// Record a transaction without running it through the processor, e.g. when
/// importing history. A COMPLETED import applies its balance effect.
pub async fn import_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ImportTransactionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user_id_from_headers(&headers)?;
    let request = payload.transaction.into_input(user_id)?;

    let transaction = state
        .transactions
        .create_transaction(CreateTransactionInput {
            request,
            status: payload.status,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user_id_from_headers(&headers)?;

    let listing = state
        .transactions
        .list_transactions(
            user_id,
            ListTransactionsQuery {
                page: params.page,
                limit: params.limit,
                kind: params.kind,
                status: params.status,
                account_id: params.account_id,
                category_id: params.category_id,
                date_from: params.date_from,
                date_to: params.date_to,
            },
        )
        .await?;

    Ok(Json(listing))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user_id_from_headers(&headers)?;

    let transaction = state
        .transactions
        .get_transaction(id, Some(user_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", id)))?;

    Ok(Json(transaction))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTransactionPayload {
    pub description: Option<String>,
    pub amount: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub category: Option<CategoryRef>,
    pub account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
    pub date: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

pub async fn update_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTransactionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user_id_from_headers(&headers)?;

    // Foreign transactions read as absent; don't reveal their existence.
    state
        .transactions
        .get_transaction(id, Some(user_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", id)))?;

    let amount = payload.amount.as_deref().map(parse_amount).transpose()?;

    let patch = TransactionPatch {
        description: payload.description,
        amount,
        kind: payload.kind,
        category: payload.category,
        account_id: payload.account_id,
        to_account_id: payload.to_account_id,
        date: payload.date,
        reference: payload.reference,
        metadata: payload.metadata,
    };

    let updated = state.transactions.update_transaction(id, patch).await?;

    Ok(Json(updated))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user_id_from_headers(&headers)?;

    state
        .transactions
        .get_transaction(id, Some(user_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", id)))?;

    state.transactions.delete_transaction(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct MonthlyParams {
    pub year: i32,
    pub month: u32,
}

pub async fn monthly_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<MonthlyParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user_id_from_headers(&headers)?;
    let stats = state
        .analytics
        .monthly_stats(user_id, params.year, params.month)
        .await?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
pub struct PeriodParams {
    pub year: i32,
    pub month: Option<u32>,
}

pub async fn category_analysis(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<PeriodParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user_id_from_headers(&headers)?;
    let analysis = state
        .analytics
        .category_analysis(user_id, params.year, params.month)
        .await?;
    Ok(Json(analysis))
}

pub async fn trend_analysis(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user_id_from_headers(&headers)?;
    let analysis = state.analytics.trend_analysis(user_id).await?;
    Ok(Json(analysis))
}

pub async fn comparison_analysis(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<PeriodParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user_id_from_headers(&headers)?;
    let analysis = state
        .analytics
        .comparison_analysis(user_id, params.year, params.month)
        .await?;
    Ok(Json(analysis))
}

pub async fn advanced_insights(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user_id_from_headers(&headers)?;
    let insights = state.analytics.advanced_insights(user_id).await?;
    Ok(Json(insights))
}
