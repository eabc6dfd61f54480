//! Statement execution. Compiled statements go through [`StatementExecutor`] so the HTTP layer
//! can run against PostgreSQL or an in-memory double.

use crate::error::AppError;
use crate::sql::{PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};

#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Run a statement and return every row as a JSON object.
    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, AppError>;

    /// Run a statement and return the number of affected rows.
    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn bind(q: &QueryBuf) -> Query<'_, Postgres, PgArguments> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        q.params
            .iter()
            .fold(sqlx::query(&q.sql), |query, p| query.bind(PgBindValue::from_json(p)))
    }
}

#[async_trait]
impl StatementExecutor for PgExecutor {
    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        let rows = Self::bind(q).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError> {
        let done = Self::bind(q).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub fn row_to_json(row: &PgRow) -> Value {
    use sqlx::{Column, Row};
    let map = row
        .columns()
        .iter()
        .map(|col| (col.name().to_string(), cell_to_value(row, col.ordinal())))
        .collect();
    Value::Object(map)
}

/// Decode by trying the column types models can produce; SQL NULL or anything undecodable is `null`.
fn cell_to_value(row: &PgRow, idx: usize) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(idx) {
        return Value::from(n);
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(idx) {
        return Value::from(n);
    }
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(idx) {
        return Value::from(n);
    }
    if let Ok(Some(d)) = row.try_get::<Option<rust_decimal::Decimal>, _>(idx) {
        let text = d.normalize().to_string();
        return serde_json::from_str::<serde_json::Number>(&text)
            .map(Value::Number)
            .unwrap_or(Value::String(text));
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(idx) {
        return serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number);
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(idx) {
        return Value::Bool(b);
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(idx) {
        return Value::String(s);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(idx) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(idx) {
        return j;
    }
    Value::Null
}
