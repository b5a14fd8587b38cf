pub mod health;
pub mod intake;
pub mod metadata;
pub mod metrics;

use axum::{Router, routing::post};

use crate::AppState;

/// Build the pipeline stage routes
pub fn intake_routes() -> Router<AppState> {
    Router::new()
        .route("/parse", post(intake::parse))
        .route("/extract", post(intake::extract))
        .route("/search", post(intake::search))
        .route("/rank", post(intake::rank))
}
