//! Document index routes: search and stats.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::error::{ApiError, ApiResult};
use crate::state::AppState;
use docsort_store::IndexStats;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents", get(search_documents))
        .route("/documents/stats", get(get_stats))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let index = Arc::clone(&state.index);
    let documents = tokio::task::spawn_blocking(move || index.search(&query.q))
        .await
        .map_err(|e| ApiError(docsort_core::Error::Internal(e.to_string())))??;

    Ok(Json(json!({
        "count": documents.len(),
        "documents": documents,
    })))
}

async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<IndexStats>> {
    let index = Arc::clone(&state.index);
    let stats = tokio::task::spawn_blocking(move || index.stats())
        .await
        .map_err(|e| ApiError(docsort_core::Error::Internal(e.to_string())))??;
    Ok(Json(stats))
}
