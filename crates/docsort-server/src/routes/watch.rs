//! Watch loop control routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use super::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/watch/status", get(get_status))
        .route("/watch/start", post(start))
        .route("/watch/stop", post(stop))
}

fn status_json(state: &AppState) -> Json<serde_json::Value> {
    Json(json!({
        "watch": state.watch.status(),
        "outputRoot": state.config.output_root,
        "holdingFolder": state.config.holding_folder,
        "llm": state.llm_config.to_response(),
    }))
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    status_json(&state)
}

async fn start(State(state): State<Arc<AppState>>) -> ApiResult<Json<serde_json::Value>> {
    state.watch.start()?;
    Ok(status_json(&state))
}

async fn stop(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.watch.stop();
    status_json(&state)
}
