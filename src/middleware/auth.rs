//! API-key authentication: the `X-API-KEY` header must match a `users.api_key` row.

use crate::error::AppError;
use crate::extractors::ApiKey;
use crate::sql::{Compiler, FieldSet, Literal, Operation, QueryBuf, QueryIr, SelectSpec, WhereCond};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

pub const USERS_TABLE: &str = "users";
pub const API_KEY_COLUMN: &str = "api_key";

pub fn api_key_lookup(key: &str) -> QueryIr {
    QueryIr::new(Operation::Select(SelectSpec {
        sources: vec![FieldSet::columns(USERS_TABLE, [API_KEY_COLUMN])],
        ..Default::default()
    }))
    .with_filter(WhereCond::new(API_KEY_COLUMN, "e", Literal::string(key)))
    .with_limit(1)
}

/// Passes through when auth is disabled; otherwise 403 unless the key is known.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.auth_enabled {
        return Ok(next.run(req).await);
    }
    let ApiKey(key) = ApiKey::from_headers(req.headers());
    let Some(key) = key else {
        tracing::warn!(path = %req.uri().path(), "missing api key");
        return Err(AppError::Forbidden);
    };
    let q: QueryBuf = Compiler::new(&state.registry).compile_bound(&api_key_lookup(&key))?;
    if state.executor.fetch_all(&q).await?.is_empty() {
        tracing::warn!(path = %req.uri().path(), "unknown api key");
        return Err(AppError::Forbidden);
    }
    Ok(next.run(req).await)
}
