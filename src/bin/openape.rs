//! OpenApe server: load the API document, create tables, serve model and query routes.

use openape::{
    app_router, apply_migrations, ensure_database_exists, load_catalog, AppState, PgExecutor,
    Settings,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("openape=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let catalog = load_catalog(&settings.api_doc_path, settings.api_doc_format).await?;

    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await?;
    apply_migrations(&pool, &catalog).await?;

    let state = AppState::new(Arc::new(PgExecutor::new(pool)), catalog)
        .with_auth(settings.auth_enabled)
        .with_raw_literals(settings.allow_raw_literals);
    let mut app = app_router(state, &settings.api_prefix);
    if let Some(dir) = &settings.static_dir {
        app = app.nest_service("/static", ServeDir::new(dir));
    }
    let app = app.layer(RequestBodyLimitLayer::new(settings.body_limit_bytes));

    let listener = TcpListener::bind(settings.listen_addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        prefix = %settings.api_prefix,
        auth = settings.auth_enabled,
        raw_literals = settings.allow_raw_literals,
        "openape listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
