//! Query document routes.

use crate::handlers::query::{compile, execute};
use crate::state::AppState;
use axum::{routing::post, Router};

/// POST /query executes a document; POST /query/sql only compiles it.
pub fn query_routes(state: AppState) -> Router {
    Router::new()
        .route("/query", post(execute))
        .route("/query/sql", post(compile))
        .with_state(state)
}
