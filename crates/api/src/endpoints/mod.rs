//! API endpoints.

mod candidates;
mod elections;
mod results;
mod voting;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/elections", elections::router())
        .nest("/candidates", candidates::router())
        .nest("/voting", voting::router())
        .nest("/results", results::router())
}
