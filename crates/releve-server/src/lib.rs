//! Releve Web Server
//!
//! Axum-based REST API for importing bank statements and browsing the
//! resulting transactions.
//!
//! Security features:
//! - Restrictive CORS policy
//! - Input validation (pagination limits, upload size limits)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use releve_core::db::Database;
use releve_core::{Error as CoreError, ParserRegistry};

mod handlers;

/// Default maximum statement upload size (10 MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Largest accepted statement file, in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Read overrides from the environment.
    ///
    /// - `RELEVE_ALLOWED_ORIGINS`: comma-separated list of origins
    /// - `RELEVE_MAX_UPLOAD_MB`: upload limit in megabytes
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(origins) = std::env::var("RELEVE_ALLOWED_ORIGINS") {
            config.allowed_origins = parse_origins(&origins);
        }

        if let Some(mb) = std::env::var("RELEVE_MAX_UPLOAD_MB")
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|mb| *mb > 0)
        {
            config.max_upload_bytes = mb * 1024 * 1024;
        }

        config
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub registry: ParserRegistry,
}

/// Simple success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    // Multipart framing and base64 both inflate the request past the file size
    let body_limit = config.max_upload_bytes.saturating_mul(2).max(64 * 1024);

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        registry: ParserRegistry::default(),
    });

    let api_routes = Router::new()
        // Accounts
        .route(
            "/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route(
            "/accounts/:id",
            get(handlers::get_account).delete(handlers::delete_account),
        )
        // Imports
        .route("/accounts/:id/imports", post(handlers::import_csv))
        .route("/accounts/:id/imports/json", post(handlers::import_csv_json))
        .route("/detect", post(handlers::detect_format))
        .route("/imports", get(handlers::list_imports))
        .route("/imports/:id", get(handlers::get_import))
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        // Tags
        .route("/tags", get(handlers::list_tags).post(handlers::create_tag))
        .route("/tags/:id", axum::routing::delete(handlers::delete_tag))
        // Tagging rules
        .route("/rules", get(handlers::list_rules).post(handlers::create_rule))
        .route("/rules/test", post(handlers::test_rules))
        .route("/rules/:id", axum::routing::delete(handlers::delete_rule));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16, config: ServerConfig) -> anyhow::Result<()> {
    let app = create_router(db, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::with_status(StatusCode::CONFLICT, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map a core error that carries a caller-facing message.
    ///
    /// Storage failures stay opaque; validation and lookup errors keep
    /// their text.
    pub fn from_core(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => Self::not_found(&msg),
            CoreError::InvalidData(msg) | CoreError::Tag(msg) => Self::bad_request(&msg),
            other => other.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
