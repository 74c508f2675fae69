//! HTTP control surface under `/api`.

pub mod categories;
pub mod documents;
pub mod error;
pub mod events;
pub mod review;
pub mod watch;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(documents::routes())
        .merge(categories::routes())
        .merge(review::routes())
        .merge(watch::routes())
        .merge(events::routes())
}
