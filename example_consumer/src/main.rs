//! Example consumer: a separate Rust project that serves resources from PostgreSQL.
//!
//! Set `SUPINE_RESOURCES` to a declaration file (see `demos/resources.json`) and run from the
//! repo root: `cargo run -p example-consumer`.

use std::sync::Arc;

use supine::{
    common_routes, connect, create_tables, ensure_database_exists, load_from_path, resolve,
    ConfigError, PgSessionFactory, SessionFactory, Settings, SupineRouter,
};
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("supine=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let path = settings
        .resources_path
        .clone()
        .ok_or_else(|| ConfigError::Settings("SUPINE_RESOURCES is not set".into()))?;
    let registry = resolve(&load_from_path(&path).await?)?;

    ensure_database_exists(&settings.database_url).await?;
    let pool = connect(&settings).await?;
    create_tables(&pool, &registry).await?;

    let sessions: Arc<dyn SessionFactory> = Arc::new(PgSessionFactory::new(pool));
    let app = SupineRouter::new(registry, sessions.clone())
        .with_pagination(settings.pagination)
        .include_all()?
        .into_router()
        .merge(common_routes(sessions))
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
