use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::batches::handlers;
use crate::features::batches::services::BatchApi;

/// Default cap on uploaded file bodies (can be overridden in main with the
/// configured limit).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

/// Create routes for the batches feature
pub fn routes(service: Arc<dyn BatchApi>) -> Router {
    routes_with_upload_limit(service, DEFAULT_MAX_UPLOAD_SIZE)
}

pub fn routes_with_upload_limit(service: Arc<dyn BatchApi>, max_upload_size: usize) -> Router {
    Router::new()
        .route("/batch", post(handlers::create_batch))
        .route("/batch/{batchId}", get(handlers::get_batch))
        .route(
            "/batch/{batchId}/{filename}",
            post(handlers::upload_file).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .with_state(service)
}
