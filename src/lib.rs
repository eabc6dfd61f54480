//! OpenApe: an API document (OpenAPI or RAML) in, PostgreSQL tables and REST routes out, plus a
//! JSON-to-SQL query compiler.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod migration;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{load_catalog, Catalog, DocFormat, ResolvedModel, Settings};
pub use error::{AppError, ConfigError, QueryError};
pub use migration::{apply_migrations, ensure_database_exists};
pub use response::{success_many, success_one};
pub use routes::{api_routes, app_router, common_routes};
pub use service::{CrudService, PgExecutor, QueryService, StatementExecutor};
pub use sql::{parse_query, Compiler, QueryIr};
pub use state::AppState;
