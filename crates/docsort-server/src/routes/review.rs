//! Manual review routes for the holding folder.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::error::ApiResult;
use crate::state::AppState;
use docsort_core::PipelineEvent;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/review/pending", get(list_pending))
        .route("/review/classify", post(classify))
}

#[derive(Debug, Deserialize)]
struct ClassifyRequest {
    filename: String,
    category: String,
}

async fn list_pending(State(state): State<Arc<AppState>>) -> ApiResult<Json<serde_json::Value>> {
    let pending = state.review.list_pending()?;
    Ok(Json(json!({
        "holdingDir": state.pipeline.filing().holding_dir(),
        "pending": pending,
    })))
}

/// Pipeline failures are reported in the returned event (`outcome: failed`),
/// not as an HTTP error.
async fn classify(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClassifyRequest>,
) -> ApiResult<Json<PipelineEvent>> {
    let event = state
        .review
        .classify_manually(&req.filename, &req.category)
        .await?;
    Ok(Json(event))
}
