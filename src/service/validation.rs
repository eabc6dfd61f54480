//! Request body validation against a resolved model.

use crate::config::{ColumnInfo, ResolvedModel};
use crate::error::AppError;
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Create/replace: every field must be a column and every required property present and non-null.
    pub fn validate(body: &Map<String, Value>, model: &ResolvedModel) -> Result<(), AppError> {
        Self::validate_partial(body, model)?;
        for col in model.required_columns() {
            if body.get(&col.name).map_or(true, Value::is_null) {
                return Err(AppError::Validation(format!("{} is required", col.name)));
            }
        }
        Ok(())
    }

    /// Only the fields present in the body are checked (PATCH).
    pub fn validate_partial(body: &Map<String, Value>, model: &ResolvedModel) -> Result<(), AppError> {
        for (field, v) in body {
            let col = model.column(field).ok_or_else(|| {
                AppError::Validation(format!("{} is not a property of {}", field, model.name))
            })?;
            validate_field(col, v)?;
        }
        Ok(())
    }
}

fn validate_field(col: &ColumnInfo, v: &Value) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    let ok = match col.sql_type.as_str() {
        "integer" | "bigint" => v.is_i64() || v.is_u64(),
        "numeric" => v.is_number(),
        "boolean" => v.is_boolean(),
        "jsonb" => true,
        "timestamptz" => v
            .as_str()
            .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok()),
        "date" => v
            .as_str()
            .is_some_and(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()),
        "uuid" => v.as_str().is_some_and(|s| uuid::Uuid::parse_str(s).is_ok()),
        _ => v.is_string(),
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{} must be a valid {}",
            col.name, col.sql_type
        )))
    }
}
