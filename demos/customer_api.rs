//! Customer API over the in-memory session store.
//!
//! Run: `cargo run --example customer_api`, then
//! `curl 'http://127.0.0.1:8000/customers?first_name=Sherlock'`.

use std::sync::Arc;

use serde_json::json;
use supine::{
    common_routes, parse_resources, resolve, MemorySessionFactory, SessionFactory, Settings,
    SupineRouter,
};
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("supine=debug,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let registry = resolve(&parse_resources(include_str!("resources.json"))?)?;

    let store = MemorySessionFactory::new();
    if let Some(territories) = registry.get("territories") {
        store
            .seed(&territories, [json!({ "territory_id": 1, "name": "London", "version": "v1" })])
            .await?;
    }
    if let Some(customers) = registry.get("customers") {
        store
            .seed(
                &customers,
                [
                    json!({ "first_name": "Sherlock", "last_name": "Holmes", "territory_id": 1 }),
                    json!({ "first_name": "John", "last_name": "Watson", "territory_id": 1 }),
                ],
            )
            .await?;
    }
    let sessions: Arc<dyn SessionFactory> = Arc::new(store);

    let api = SupineRouter::new(registry, sessions.clone())
        .with_pagination(settings.pagination)
        .include_all()?
        .into_router();
    let app = api
        .merge(common_routes(sessions))
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("customer api listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
