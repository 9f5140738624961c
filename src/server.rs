//! HTTP API over [`SearchEngine`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/search` | Run a search: `{query, user_id, conversation?}` → `{results}` |
//! | `GET`  | `/suggestions?prefix=&limit=` | Autocomplete (default limit 5) |
//! | `GET`  | `/popular?limit=` | Popular searches, last 7 days (default limit 10) |
//! | `GET`  | `/history/{user_id}?limit=` | A user's recent searches (default limit 10) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "search_unavailable", "message": "search temporarily unavailable: ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `search_unavailable` (503), `internal` (500).
//! A search that matches nothing is `200` with `{"results": []}`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use federated_search_core::models::{ConversationTurn, HistoryEntry, PopularSearch, SearchResult};

use crate::config::Config;
use crate::engine::SearchEngine;
use crate::error::SearchError;

const MAX_LIST_LIMIT: usize = 100;

#[derive(Clone)]
struct AppState {
    engine: Arc<SearchEngine>,
}

/// Start the server on `[server].bind` and run until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let engine = SearchEngine::from_config(config).await?;
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "search server listening");
    axum::serve(listener, router(Arc::new(engine))).await?;
    Ok(())
}

/// Build the application router.
pub fn router(engine: Arc<SearchEngine>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/search", post(handle_search))
        .route("/suggestions", get(handle_suggestions))
        .route("/popular", get(handle_popular))
        .route("/history/{user_id}", get(handle_history))
        .layer(cors)
        .with_state(AppState { engine })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::warn!(error = %err, "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: err.to_string(),
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        AppError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "search_unavailable",
            message: err.to_string(),
        }
    }
}

fn clamp_limit(limit: Option<usize>, default: usize) -> usize {
    limit.unwrap_or(default).min(MAX_LIST_LIMIT)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    user_id: String,
    #[serde(default)]
    conversation: Vec<ConversationTurn>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

async fn handle_search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Json(req) = payload.map_err(|rejection| bad_request(rejection.body_text()))?;
    if req.user_id.trim().is_empty() {
        return Err(bad_request("user_id must not be empty"));
    }
    let results = state
        .engine
        .perform_search_with_context(&req.query, &req.user_id, req.conversation)
        .await?;
    Ok(Json(SearchResponse { results }))
}

// ============ GET /suggestions ============

#[derive(Deserialize)]
struct SuggestionsParams {
    #[serde(default)]
    prefix: String,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SuggestionsResponse {
    suggestions: Vec<String>,
}

async fn handle_suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestionsParams>,
) -> Result<Json<SuggestionsResponse>, AppError> {
    let suggestions = state
        .engine
        .get_suggestions(&params.prefix, clamp_limit(params.limit, 5))
        .await
        .map_err(internal)?;
    Ok(Json(SuggestionsResponse { suggestions }))
}

// ============ GET /popular ============

#[derive(Deserialize)]
struct LimitParams {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct PopularResponse {
    searches: Vec<PopularSearch>,
}

async fn handle_popular(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<PopularResponse>, AppError> {
    let searches = state
        .engine
        .get_popular_searches(clamp_limit(params.limit, 10))
        .await
        .map_err(internal)?;
    Ok(Json(PopularResponse { searches }))
}

// ============ GET /history/{user_id} ============

#[derive(Serialize)]
struct HistoryResponse {
    entries: Vec<HistoryEntry>,
}

async fn handle_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<HistoryResponse>, AppError> {
    let entries = state
        .engine
        .recent_searches(&user_id, clamp_limit(params.limit, 10))
        .await
        .map_err(internal)?;
    Ok(Json(HistoryResponse { entries }))
}
