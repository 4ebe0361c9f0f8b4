//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, MAX_PAGE_LIMIT};
use releve_core::models::{NewTransaction, TransactionWithTags};
use releve_core::{InsertError, TransactionFilter};

/// Query parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub account_id: Option<i64>,
    pub import_id: Option<i64>,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub transactions: Vec<TransactionWithTags>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Request body for a hand-entered transaction
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub account_id: i64,
    pub date: NaiveDate,
    pub label: String,
    /// Decimal string ("-12.34") or JSON number
    pub amount: Decimal,
    pub currency: Option<String>,
}

/// GET /api/transactions - List transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionQuery>,
) -> Result<Json<TransactionResponse>, AppError> {
    // Input validation: clamp pagination parameters
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
    let offset = params.offset.max(0);

    let filter = TransactionFilter {
        account_id: params.account_id,
        import_id: params.import_id,
        limit,
        offset,
    };

    let total = state.db.count_transactions(&filter)?;
    let transactions = state
        .db
        .list_transactions(&filter)?
        .into_iter()
        .map(|transaction| -> releve_core::Result<TransactionWithTags> {
            let tags = state.db.get_transaction_tags(transaction.id)?;
            Ok(TransactionWithTags { transaction, tags })
        })
        .collect::<releve_core::Result<Vec<_>>>()?;

    Ok(Json(TransactionResponse {
        transactions,
        total,
        limit,
        offset,
    }))
}

/// POST /api/transactions - Record a transaction by hand
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionWithTags>), AppError> {
    if state.db.get_account(req.account_id)?.is_none() {
        return Err(AppError::not_found(&format!(
            "Account {} not found",
            req.account_id
        )));
    }

    let currency = req
        .currency
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("EUR")
        .to_uppercase();
    let new_tx = NewTransaction::manual(
        req.account_id,
        req.date,
        req.label.trim(),
        req.amount,
        &currency,
    );

    let id = state
        .db
        .create_manual_transaction(&new_tx)
        .map_err(|e| match e {
            InsertError::DuplicateKey => {
                AppError::conflict("A transaction with the same date, amount and label already exists")
            }
            InsertError::ConstraintViolation { .. } => AppError::bad_request(&e.to_string()),
            InsertError::Storage(msg) => anyhow::anyhow!(msg).into(),
        })?;

    let transaction = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::internal("Transaction not found after creation"))?;

    Ok((
        StatusCode::CREATED,
        Json(TransactionWithTags {
            transaction,
            tags: vec![],
        }),
    ))
}
