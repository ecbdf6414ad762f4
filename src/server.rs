//! Read-only HTTP service over stored reviews.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/reviews?limit=N` | The `N` most recently ingested reviews, newest first (default 20) |
//! | `GET`  | `/health` | Liveness check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "limit must be >= 1" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500).

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::db;
use crate::models::StoredReview;
use crate::store::{ReviewStore, SqliteReviewStore};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 500;

/// Shared state for route handlers.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn ReviewStore>,
}

/// Starts the read service on `[server].bind` over the configured database.
///
/// Runs until Ctrl+C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    crate::migrate::create_schema(&pool).await?;
    let store: Arc<dyn ReviewStore> = Arc::new(SqliteReviewStore::new(pool));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("review API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(store))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

/// Build the router over any store.
pub fn router(store: Arc<dyn ReviewStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/reviews", get(handle_reviews))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { store })
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
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
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

// ============ GET /reviews ============

#[derive(Debug, Deserialize)]
struct ReviewsQuery {
    limit: Option<i64>,
}

/// One review as served over HTTP. Timestamps are ISO 8601 UTC.
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: i64,
    pub source: String,
    pub subject_id: String,
    pub text: String,
    pub author: String,
    pub url: String,
    pub language: String,
    pub rating: Option<f64>,
    pub reviewed_at: Option<String>,
    pub sentiment_score: f64,
    pub sentiment_label: String,
    pub ingested_at: String,
}

fn format_ts_iso(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

impl From<StoredReview> for ReviewResponse {
    fn from(r: StoredReview) -> Self {
        Self {
            id: r.id,
            reviewed_at: r.reviewed_at.as_ref().map(format_ts_iso),
            ingested_at: format_ts_iso(&r.ingested_at),
            sentiment_label: r.sentiment_label.to_string(),
            source: r.source,
            subject_id: r.subject_id,
            text: r.text,
            author: r.author,
            url: r.url,
            language: r.language,
            rating: r.rating,
            sentiment_score: r.sentiment_score,
        }
    }
}

async fn handle_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewsQuery>,
) -> Result<Json<Vec<ReviewResponse>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if limit < 1 {
        return Err(bad_request("limit must be >= 1"));
    }

    let rows = state.store.recent(limit.min(MAX_LIMIT)).await.map_err(|e| {
        error!("failed to load reviews: {:#}", e);
        internal("failed to load reviews")
    })?;

    Ok(Json(rows.into_iter().map(ReviewResponse::from).collect()))
}
