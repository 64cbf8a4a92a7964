//! Question-answering HTTP server.
//!
//! Serves one [`QueryService`] over a small JSON API for the browser chat
//! client. The service is built once at startup and shared by all handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Answer `{ "question": "..." }` |
//! | `GET`  | `/health` | Health check (version, chunk count, extractor state) |
//!
//! # Error Contract
//!
//! All error responses are `{ "error": "<message>" }`:
//!
//! | Status | Message | Cause |
//! |--------|---------|-------|
//! | 400 | `Question too short.` | trimmed question under 3 characters |
//! | 400 | `Invalid request body.` | malformed JSON or missing `question` |
//! | 413 | `Request body too large.` | body over `[server].max_body_bytes` |
//! | 500 | `Failed to process the question.` | any downstream failure |
//!
//! Internal error details are logged, never returned.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the chat page can be
//! served from anywhere.

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use askdoc_core::models::AnswerResult;
use askdoc_core::service::{QueryError, QueryService};

use crate::ask::load_service;
use crate::config::Config;

const INVALID_BODY: &str = "Invalid request body.";
const BODY_TOO_LARGE: &str = "Request body too large.";
const PROCESSING_FAILED: &str = "Failed to process the question.";

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: QueryService,
}

/// Starts the HTTP server.
///
/// Loads the snapshot and models, binds `[server].bind`, and serves until
/// the process is terminated. Startup failures (missing snapshot,
/// dimension mismatch, bind error) are returned before any request is
/// accepted.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = load_service(config).await?;
    let chunks = service.store().len();
    let extractor = service.extractor().is_enabled();

    let app = router(AppState { service }, config.server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        bind = %config.server.bind,
        chunks,
        extractor,
        "askdoc server listening"
    );
    println!("askdoc listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router with CORS and the request body limit applied.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError {
                status: StatusCode::PAYLOAD_TOO_LARGE,
                message: BODY_TOO_LARGE.to_string(),
            };
        }
        tracing::debug!(error = %rejection.body_text(), "rejected request body");
        bad_request(INVALID_BODY)
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidInput(msg) => bad_request(msg),
            QueryError::Processing(e) => {
                tracing::error!(error = %format!("{e:#}"), "failed to answer question");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: PROCESSING_FAILED.to_string(),
                }
            }
        }
    }
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

/// Handler for `POST /ask`.
async fn handle_ask(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AnswerResult>, AppError> {
    let Json(req) = body?;
    let result = state.service.answer(&req.question).await?;
    tracing::info!(
        score = result.score,
        source_id = ?result.source_id,
        sources = result.sources.len(),
        "answered question"
    );
    Ok(Json(result))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    version: String,
    /// Number of chunks in the loaded snapshot.
    chunks: usize,
    /// `"enabled"` or `"disabled"`.
    extractor: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let extractor = if state.service.extractor().is_enabled() {
        "enabled"
    } else {
        "disabled"
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chunks: state.service.store().len(),
        extractor: extractor.to_string(),
    })
}
