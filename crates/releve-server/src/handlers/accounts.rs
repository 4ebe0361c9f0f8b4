//! Account management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, SuccessResponse};
use releve_core::models::{Account, Bank};

/// Request body for creating an account
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    /// Bank key (boursorama, revolut, caisse_epargne); informational only
    pub bank: Option<String>,
}

/// GET /api/accounts - List all accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Account>>, AppError> {
    Ok(Json(state.db.list_accounts()?))
}

/// GET /api/accounts/:id - Get one account
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Account>, AppError> {
    let account = state
        .db
        .get_account(id)?
        .ok_or_else(|| AppError::not_found(&format!("Account {} not found", id)))?;

    Ok(Json(account))
}

/// POST /api/accounts - Create a new account
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<Json<Account>, AppError> {
    let bank = req
        .bank
        .as_deref()
        .map(|b| {
            b.parse::<Bank>()
                .map_err(|_| AppError::bad_request(&format!("Unknown bank: {}", b)))
        })
        .transpose()?;

    if state.db.get_account_by_name(req.name.trim())?.is_some() {
        return Err(AppError::conflict(&format!(
            "Account '{}' already exists",
            req.name.trim()
        )));
    }

    let account_id = state
        .db
        .create_account(&req.name, bank)
        .map_err(AppError::from_core)?;

    let account = state
        .db
        .get_account(account_id)?
        .ok_or_else(|| AppError::internal("Account not found after creation"))?;

    Ok(Json(account))
}

/// DELETE /api/accounts/:id - Delete an account and its transactions
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.db.delete_account(id)? {
        return Err(AppError::not_found(&format!("Account {} not found", id)));
    }

    Ok(Json(SuccessResponse { success: true }))
}
