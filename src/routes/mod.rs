pub mod common;
pub mod entity;
pub mod query;

pub use common::common_routes;
pub use entity::entity_routes;
pub use query::query_routes;

use crate::middleware::require_api_key;
use crate::state::AppState;
use axum::Router;

/// Query and model routes behind API-key authentication, to be nested under the API prefix.
pub fn api_routes(state: AppState) -> Router {
    query_routes(state.clone())
        .merge(entity_routes(state.clone()))
        .route_layer(axum::middleware::from_fn_with_state(state, require_api_key))
}

/// Full application router: common routes at the root, API routes under `prefix`.
pub fn app_router(state: AppState, prefix: &str) -> Router {
    let api = api_routes(state.clone());
    let router = common_routes(state);
    if prefix.is_empty() || prefix == "/" {
        router.merge(api)
    } else {
        router.nest(prefix, api)
    }
}
