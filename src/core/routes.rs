// HTTP routes configuration

use crate::core::state::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/announce", get(crate::handlers::announce::announce_handler))
        .route("/health", get(crate::handlers::health::health_handler))
        .route("/metrics", get(crate::handlers::metrics::metrics_handler))
        // Everything else gets a bencoded failure
        .fallback(crate::handlers::fallback::fallback_handler)
        .with_state(state)
}
