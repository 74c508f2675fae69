//! Category routes: list, add, rename / re-folder, delete.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::error::ApiResult;
use crate::state::AppState;
use docsort_core::Category;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories", get(list_categories).post(add_category))
        .route(
            "/categories/{name}",
            put(update_category).delete(delete_category),
        )
}

#[derive(Debug, Deserialize)]
struct AddCategoryRequest {
    name: String,
    #[serde(default)]
    folder: Option<PathBuf>,
}

/// Rename and/or change the folder override. An empty `folder` clears it.
#[derive(Debug, Deserialize)]
struct UpdateCategoryRequest {
    #[serde(default, rename = "newName")]
    new_name: Option<String>,
    #[serde(default)]
    folder: Option<String>,
}

fn category_list(categories: Vec<Category>) -> Json<serde_json::Value> {
    Json(json!({ "categories": categories }))
}

async fn list_categories(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    category_list(state.categories.snapshot().categories().to_vec())
}

async fn add_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddCategoryRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    state.categories.add(&req.name, req.folder)?;
    info!("Category added: {}", req.name);
    Ok((
        StatusCode::CREATED,
        category_list(state.categories.snapshot().categories().to_vec()),
    ))
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(req): Json<UpdateCategoryRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut current = name;
    if let Some(new_name) = req.new_name.filter(|n| *n != current) {
        state.categories.rename(&current, &new_name)?;
        info!("Category renamed: {} -> {}", current, new_name);
        current = new_name;
    }
    if let Some(folder) = req.folder {
        let folder = (!folder.trim().is_empty()).then(|| PathBuf::from(folder));
        state.categories.set_folder(&current, folder)?;
    }
    Ok(category_list(state.categories.snapshot().categories().to_vec()))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.categories.delete(&name)?;
    info!("Category deleted: {}", name);
    Ok(category_list(state.categories.snapshot().categories().to_vec()))
}
