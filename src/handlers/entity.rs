//! Model CRUD handlers: list, create, read, replace, patch, delete.

use crate::config::ResolvedModel;
use crate::error::AppError;
use crate::response::{success_many, success_one, success_one_ok};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

fn model_for<'s>(state: &'s AppState, path_segment: &str) -> Result<&'s ResolvedModel, AppError> {
    state
        .catalog
        .model_by_path(path_segment)
        .ok_or_else(|| AppError::NotFound(format!("no model serves /{}", path_segment)))
}

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let model = model_for(&state, &path_segment)?;
    let mut limit: Option<u64> = None;
    let mut offset: Option<u64> = None;
    let mut filters: Vec<(String, String)> = Vec::new();
    for (k, v) in params {
        match k.as_str() {
            "limit" => limit = v.parse().ok(),
            "offset" => offset = v.parse().ok(),
            _ => filters.push((k, v)),
        }
    }
    filters.sort();
    let rows = state.crud().list(model, &filters, limit, offset).await?;
    Ok(success_many(rows))
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let model = model_for(&state, &path_segment)?;
    let body = body_to_map(body)?;
    let row = state.crud().create(model, &body).await?;
    Ok(success_one(row))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let model = model_for(&state, &path_segment)?;
    let row = state.crud().read(model, &id).await?;
    Ok(success_one_ok(row))
}

pub async fn replace(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let model = model_for(&state, &path_segment)?;
    let body = body_to_map(body)?;
    let row = state.crud().update(model, &id, &body, false).await?;
    Ok(success_one_ok(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let model = model_for(&state, &path_segment)?;
    let body = body_to_map(body)?;
    let row = state.crud().update(model, &id, &body, true).await?;
    Ok(success_one_ok(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let model = model_for(&state, &path_segment)?;
    state.crud().delete(model, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
