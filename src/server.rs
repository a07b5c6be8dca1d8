//! The HTTP boundary: four routes over `JobEngine` (spec §6). Request bodies
//! are validated with `garde` the way the teacher validates tool parameters
//! (`server.rs`'s `#[derive(Validate)]` structs) before ever reaching the
//! engine.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use garde::Validate;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::engine::JobEngine;
use crate::error::StartError;
use crate::models::{CancelOutcome, ResultOutcome, StrategyParameters, UniverseFilter};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<JobEngine>,
}

pub fn router(engine: Arc<JobEngine>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/executions", post(start_execution))
        .route("/executions/{job_id}/progress", get(get_progress))
        .route("/executions/{job_id}/result", get(get_result))
        .route("/executions/{job_id}/cancel", post(cancel_execution))
        .layer(CorsLayer::permissive())
        .with_state(AppState { engine })
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartExecutionRequest {
    #[garde(length(min = 1, max = 64))]
    pub strategy_id: String,
    #[garde(skip)]
    pub parameters: HashMap<String, f64>,
    #[garde(skip)]
    pub markets: Vec<String>,
    #[garde(skip)]
    pub industries: Vec<String>,
    #[garde(range(min = 0.0, max = 100.0))]
    pub min_score: f64,
    #[garde(skip)]
    pub max_stocks: usize,
    #[garde(range(min = 0, max = 64))]
    pub worker_count: usize,
}

#[derive(Debug, Serialize)]
pub struct StartExecutionResponse {
    pub job_id: String,
}

async fn start_execution(
    State(state): State<AppState>,
    Json(body): Json<StartExecutionRequest>,
) -> Result<Json<StartExecutionResponse>, ApiError> {
    body.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let request = crate::models::StartRequest {
        strategy_id: body.strategy_id,
        parameters: StrategyParameters { values: body.parameters },
        filter: UniverseFilter { markets: body.markets, industries: body.industries },
        min_score: body.min_score,
        max_stocks: body.max_stocks,
        worker_count: body.worker_count,
    };

    let job_id = state.engine.start(request).map_err(ApiError::from)?;
    Ok(Json(StartExecutionResponse { job_id }))
}

async fn get_progress(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    match state.engine.progress(&job_id).await {
        Some(p) => Json(p).into_response(),
        None => ApiError::NotFound.into_response(),
    }
}

async fn get_result(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    match state.engine.result(&job_id).await {
        ResultOutcome::Ready(r) => Json(r).into_response(),
        ResultOutcome::NotReady => {
            (StatusCode::ACCEPTED, Json(serde_json::json!({ "status": "not_ready" }))).into_response()
        }
        ResultOutcome::NotFound => ApiError::NotFound.into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

async fn cancel_execution(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    match state.engine.cancel(&job_id).await {
        CancelOutcome::Acknowledged => Json(CancelResponse { cancelled: true }).into_response(),
        CancelOutcome::AlreadyTerminal => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "cancelled": false, "reason": "already_terminal" })),
        )
            .into_response(),
        CancelOutcome::NotFound => ApiError::NotFound.into_response(),
    }
}

enum ApiError {
    BadRequest(String),
    NotFound,
    Start(StartError),
}

impl From<StartError> for ApiError {
    fn from(e: StartError) -> Self {
        ApiError::Start(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "job not found".to_string()),
            ApiError::Start(StartError::UnknownStrategy(id)) => {
                (StatusCode::BAD_REQUEST, format!("unknown strategy: {id}"))
            }
            ApiError::Start(StartError::InvalidParameters(msg)) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Start(StartError::BadFilter(msg)) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Start(e @ StartError::CapacityExceeded { .. }) => {
                (StatusCode::TOO_MANY_REQUESTS, e.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
