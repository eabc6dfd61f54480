//! Apply the catalog to the database: the `base_type` parent table, then one child table per model.
//! Table and column names are validated identifiers and emitted unquoted so they fold the same way
//! the compiler's statements do.

use crate::config::{Catalog, ResolvedModel, BASE_COLUMNS, PRIMARY_KEY};
use crate::error::{AppError, ConfigError};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;

pub const BASE_TABLE: &str = "base_type";

pub fn base_table_ddl() -> String {
    let cols: Vec<String> = BASE_COLUMNS
        .iter()
        .map(|(name, ty)| {
            if *name == PRIMARY_KEY {
                format!("{} {} PRIMARY KEY", name, ty)
            } else {
                format!("{} {} DEFAULT NOW()", name, ty)
            }
        })
        .collect();
    format!("CREATE TABLE IF NOT EXISTS {} ({});", BASE_TABLE, cols.join(", "))
}

/// Child table DDL. Inherited columns are not repeated; the primary key is restated because
/// PostgreSQL does not inherit it.
pub fn create_table_ddl(model: &ResolvedModel) -> String {
    let mut defs: Vec<String> = model
        .own_columns()
        .map(|c| format!("{} {}", c.name, c.sql_type))
        .collect();
    defs.push(format!("PRIMARY KEY ({})", PRIMARY_KEY));
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({}) INHERITS ({});",
        model.table_name,
        defs.join(", "),
        BASE_TABLE
    )
}

/// All statements in dependency order.
pub fn migration_statements(catalog: &Catalog) -> Vec<String> {
    std::iter::once(base_table_ddl())
        .chain(catalog.models.iter().map(create_table_ddl))
        .collect()
}

/// Idempotent: every statement is `IF NOT EXISTS`.
pub async fn apply_migrations(pool: &PgPool, catalog: &Catalog) -> Result<(), AppError> {
    sqlx::query(&base_table_ddl()).execute(pool).await?;
    for model in &catalog.models {
        let sql = create_table_ddl(model);
        tracing::debug!(sql = %sql, "migration");
        sqlx::query(&sql).execute(pool).await?;
        tracing::info!(table = %model.table_name, "table ready");
    }
    Ok(())
}

/// Connect to the `postgres` maintenance database and create the target database when missing.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = split_database_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| ConfigError::Validation(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&db_name)
            .fetch_one(&mut conn)
            .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "database created");
    }
    Ok(())
}

/// `postgres://u@h/app?sslmode=disable` -> (`postgres://u@h/postgres?sslmode=disable`, `app`).
fn split_database_url(url: &str) -> Result<(String, String), AppError> {
    let (without_query, query) = match url.split_once('?') {
        Some((u, q)) => (u, Some(q)),
        None => (url, None),
    };
    let path_start = without_query
        .rfind('/')
        .filter(|i| *i > without_query.find("//").map_or(0, |s| s + 1))
        .ok_or_else(|| ConfigError::Validation("DATABASE_URL: no database path".into()))?
        + 1;
    let db_name = without_query[path_start..].trim().to_string();
    let mut admin_url = format!("{}postgres", &without_query[..path_start]);
    if let Some(q) = query {
        admin_url.push('?');
        admin_url.push_str(q);
    }
    Ok((admin_url, db_name))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
