//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Compile-time failures of the JSON-to-SQL layer. On error no statement text is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("expected exactly one of select, insert, update, delete; found [{}]", .found.join(", "))]
    AmbiguousOperationVariant { found: Vec<&'static str> },
    #[error("unknown operator '{code}'")]
    UnknownOperator { code: String },
    #[error("invalid numeric literal for {field}: '{value}'")]
    InvalidNumericLiteral { field: String, value: String },
    #[error("empty identifier: {context}")]
    EmptyIdentifier { context: String },
    #[error("malformed join: {reason}")]
    MalformedJoin { reason: String },
    #[error("{operation} on {table} has no values")]
    EmptyAssignments { operation: &'static str, table: String },
    #[error("{clause} is not supported for {operation}")]
    UnsupportedClause { clause: &'static str, operation: &'static str },
    #[error("unknown table '{table}'")]
    UnknownTable { table: String },
    #[error("unknown column '{column}' on {table}")]
    UnknownColumn { table: String, column: String },
    #[error("raw literals are not accepted in query documents ({field})")]
    RawLiteral { field: String },
    #[error("operator {operator} does not take {found} operand for {field}")]
    OperandMismatch {
        field: String,
        operator: String,
        found: &'static str,
    },
    #[error("invalid query document: {0}")]
    InvalidDocument(String),
}

impl QueryError {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::AmbiguousOperationVariant { .. } => "ambiguous_operation_variant",
            QueryError::UnknownOperator { .. } => "unknown_operator",
            QueryError::InvalidNumericLiteral { .. } => "invalid_numeric_literal",
            QueryError::EmptyIdentifier { .. } => "empty_identifier",
            QueryError::MalformedJoin { .. } => "malformed_join",
            QueryError::EmptyAssignments { .. } => "empty_assignments",
            QueryError::UnsupportedClause { .. } => "unsupported_clause",
            QueryError::UnknownTable { .. } => "unknown_table",
            QueryError::UnknownColumn { .. } => "unknown_column",
            QueryError::RawLiteral { .. } => "raw_literal",
            QueryError::OperandMismatch { .. } => "operand_mismatch",
            QueryError::InvalidDocument(_) => "invalid_document",
        }
    }

    /// The offending field, operator, or context when there is one.
    pub fn field(&self) -> Option<String> {
        match self {
            QueryError::AmbiguousOperationVariant { found } => Some(found.join(",")),
            QueryError::UnknownOperator { code } => Some(code.clone()),
            QueryError::InvalidNumericLiteral { field, .. } => Some(field.clone()),
            QueryError::EmptyIdentifier { context } => Some(context.clone()),
            QueryError::MalformedJoin { .. } => Some("join".into()),
            QueryError::EmptyAssignments { table, .. } => Some(table.clone()),
            QueryError::UnsupportedClause { clause, .. } => Some((*clause).to_string()),
            QueryError::UnknownTable { table } => Some(table.clone()),
            QueryError::UnknownColumn { table, column } => Some(format!("{}.{}", table, column)),
            QueryError::RawLiteral { field } => Some(field.clone()),
            QueryError::OperandMismatch { field, .. } => Some(field.clone()),
            QueryError::InvalidDocument(_) => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reserved word '{0}' cannot be used as a table or column name")]
    ReservedWord(String),
    #[error("duplicate model: {0}")]
    DuplicateModel(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("forbidden")]
    Forbidden,
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Query(_) => (StatusCode::BAD_REQUEST, "query_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        };
        let details = match &self {
            AppError::Query(e) => Some(serde_json::json!({
                "kind": e.kind(),
                "field": e.field(),
            })),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
