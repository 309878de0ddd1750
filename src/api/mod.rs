use crate::models::{DayKey, DayKeyError};
use crate::pipeline::Pipeline;
use crate::query::{QueryError, QueryService};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub query: QueryService,
    pub pipeline: Arc<Pipeline>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Screener snapshots API is running." }))
        .route("/api/screeners", get(list_screeners))
        .route("/api/get_days", get(get_days))
        .route("/api/get_table/{table}", get(get_table))
        .route("/api/today-report", get(today_report))
        .route("/api/update_live", get(update_live))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Serving on http://{}", listener.local_addr()?);
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    BadDay(#[from] DayKeyError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Query(QueryError::DayNotFound(day)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "DB not found", "day": day }),
            ),
            ApiError::Query(QueryError::UnknownScreener(_)) => {
                (StatusCode::BAD_REQUEST, json!({ "error": "Invalid table" }))
            }
            ApiError::BadDay(e) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": e.to_string(), "day": e.0 }),
            ),
            ApiError::Query(QueryError::Storage(_)) | ApiError::Internal(_) => {
                error!("{}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": self.to_string() }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// DuckDB calls block; keep them off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, QueryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

// ── Handlers ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DayParams {
    day: Option<String>,
}

impl DayParams {
    fn day_key(&self) -> Result<Option<DayKey>, ApiError> {
        match self.day.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Ok(Some(raw.parse()?)),
        }
    }
}

async fn list_screeners(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "screeners": state.query.registry().info() }))
}

async fn get_days(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let query = state.query.clone();
    let days = blocking(move || query.list_days()).await?;
    Ok(Json(json!({ "days": days })))
}

async fn get_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<DayParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let day = params.day_key()?;
    let query = state.query.clone();
    let requested = day.clone();
    let tables = blocking(move || query.get_table(requested.as_ref(), &table)).await?;
    Ok(Json(json!({ "day": day, "tables": tables })))
}

async fn today_report(
    State(state): State<AppState>,
    Query(params): Query<DayParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let day = params.day_key()?;
    let query = state.query.clone();
    let as_of = chrono::Local::now().date_naive();
    let doc = blocking(move || query.get_report(day.as_ref(), as_of)).await?;
    Ok(Json(json!(doc)))
}

async fn update_live(State(state): State<AppState>) -> Response {
    match state.pipeline.run().await {
        Ok(stats) => Json(json!({
            "status": "ok",
            "message": "Live data updated successfully!",
            "day": stats.day,
            "placeholders": stats.placeholders,
        }))
        .into_response(),
        Err(e) => {
            error!("Update run failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": format!("{:#}", e) })),
            )
                .into_response()
        }
    }
}
