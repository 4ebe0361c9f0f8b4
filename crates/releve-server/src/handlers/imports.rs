//! Statement import and format detection handlers
//!
//! Imports run synchronously: the response carries the final import record
//! and its per-row report.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState};
use releve_core::models::{Bank, Import, ImportOutcome, ImportResult};
use releve_core::ImportPipeline;

/// Filename recorded when the client sends none
const DEFAULT_FILENAME: &str = "statement.csv";

/// JSON import request (CSV content base64-encoded)
#[derive(Debug, Deserialize)]
pub struct ImportJsonRequest {
    pub filename: Option<String>,
    pub csv_data: String,
}

#[derive(Debug, Deserialize)]
pub struct ImportListQuery {
    pub account_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub bank: Option<Bank>,
}

/// POST /api/accounts/:id/imports - Import a statement from a multipart upload
///
/// Expects multipart form with:
/// - file: CSV file (required)
/// - filename: name to record (optional, defaults to the part's file name)
pub async fn import_csv(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                if filename.is_none() {
                    filename = field.file_name().map(str::to_string);
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file data"))?;
                check_upload_size(&state, bytes.len())?;
                file_data = Some(bytes.to_vec());
            }
            "filename" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read filename"))?;
                if !value.trim().is_empty() {
                    filename = Some(value.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let file_data = file_data.ok_or_else(|| AppError::bad_request("Missing file field"))?;
    let filename = filename.unwrap_or_else(|| DEFAULT_FILENAME.to_string());

    run_import(&state, account_id, &filename, &file_data)
}

/// POST /api/accounts/:id/imports/json - Import a statement sent as base64 JSON
pub async fn import_csv_json(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<i64>,
    Json(req): Json<ImportJsonRequest>,
) -> Result<Response, AppError> {
    use base64::Engine;

    let file_data = base64::engine::general_purpose::STANDARD
        .decode(req.csv_data.trim())
        .map_err(|e| AppError::bad_request(&format!("Invalid base64 data: {}", e)))?;
    check_upload_size(&state, file_data.len())?;

    let filename = req
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_FILENAME)
        .to_string();

    run_import(&state, account_id, &filename, &file_data)
}

fn check_upload_size(state: &AppState, len: usize) -> Result<(), AppError> {
    let max = state.config.max_upload_bytes;
    if len > max {
        return Err(AppError::bad_request(&format!(
            "File too large. Maximum size is {} bytes",
            max
        )));
    }
    Ok(())
}

/// Create and process an import; a failed import is answered with 422
fn run_import(
    state: &AppState,
    account_id: i64,
    filename: &str,
    content: &[u8],
) -> Result<Response, AppError> {
    let pipeline = ImportPipeline::new(&state.db, &state.registry);

    let import = pipeline
        .create_import(account_id, filename)
        .map_err(AppError::from_core)?;
    info!(
        "Import {} of '{}' ({} bytes) for account {}",
        import.id,
        filename,
        content.len(),
        account_id
    );

    let response = match pipeline.process_import(&import, content)? {
        ImportOutcome::Completed(result) => Json(result).into_response(),
        ImportOutcome::Failed(result) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(result)).into_response()
        }
    };

    Ok(response)
}

/// POST /api/detect - Detect the bank format of a raw CSV body
pub async fn detect_format(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<DetectResponse>, AppError> {
    Ok(Json(DetectResponse {
        bank: state.registry.detect_bank(&body),
    }))
}

/// GET /api/imports - List imports, newest first
pub async fn list_imports(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImportListQuery>,
) -> Result<Json<Vec<Import>>, AppError> {
    Ok(Json(state.db.list_imports(params.account_id)?))
}

/// GET /api/imports/:id - One import with its per-row outcomes
pub async fn get_import(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ImportResult>, AppError> {
    let import = state
        .db
        .get_import(id)?
        .ok_or_else(|| AppError::not_found(&format!("Import {} not found", id)))?;
    let rows = state.db.get_import_rows(id).map_err(AppError::from_core)?;

    Ok(Json(ImportResult { import, rows }))
}
