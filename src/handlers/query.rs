//! JSON query document handlers: execute, or compile without executing.

use crate::error::AppError;
use crate::response::{success_many, success_one_ok};
use crate::service::{QueryOutcome, QueryService};
use crate::sql::QueryDocument;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub struct CompileParams {
    /// Return the statement with literals inlined instead of `{sql, params}`.
    #[serde(default)]
    pub inline: bool,
}

pub async fn execute(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let doc = QueryDocument::from_value(body)?;
    let outcome = QueryService::run(
        state.executor.as_ref(),
        &state.catalog,
        &state.registry,
        doc,
        state.allow_raw_literals,
    )
    .await?;
    Ok(match outcome {
        QueryOutcome::Rows(rows) => success_many(rows).into_response(),
        affected => success_one_ok(affected).into_response(),
    })
}

pub async fn compile(
    State(state): State<AppState>,
    Query(params): Query<CompileParams>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let doc = QueryDocument::from_value(body)?;
    let ir = QueryService::prepare(&state.catalog, doc, state.allow_raw_literals)?;
    if params.inline {
        let sql = QueryService::compile_inline(&state.registry, &ir)?;
        return Ok(success_one_ok(serde_json::json!({ "sql": sql })).into_response());
    }
    let q = QueryService::compile(&state.catalog, &state.registry, &ir)?;
    Ok(success_one_ok(q).into_response())
}
