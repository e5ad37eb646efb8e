#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use supine::{
    common_routes, parse_resources, resolve, MemorySessionFactory, PaginationSettings,
    ResourceRegistry, SessionFactory, SupineRouter,
};
use tower::ServiceExt;

pub const RESOURCES: &str = include_str!("../../demos/resources.json");

pub fn registry() -> ResourceRegistry {
    resolve(&parse_resources(RESOURCES).unwrap()).unwrap()
}

/// London, plus Sherlock Holmes (1) and John Watson (2) living there.
pub async fn seeded_store(registry: &ResourceRegistry) -> MemorySessionFactory {
    let store = MemorySessionFactory::new();
    store
        .seed(
            &registry.get("territories").unwrap(),
            [json!({ "territory_id": 1, "name": "London", "version": "v1" })],
        )
        .await
        .unwrap();
    store
        .seed(
            &registry.get("customers").unwrap(),
            [
                json!({
                    "first_name": "Sherlock",
                    "last_name": "Holmes",
                    "territory_id": 1,
                    "updated_at": "2020-01-01T00:00:00+00:00"
                }),
                json!({ "first_name": "John", "last_name": "Watson", "territory_id": 1 }),
            ],
        )
        .await
        .unwrap();
    store
}

pub fn app_with(registry: ResourceRegistry, store: MemorySessionFactory, pagination: PaginationSettings) -> Router {
    let sessions: Arc<dyn SessionFactory> = Arc::new(store);
    SupineRouter::new(registry, sessions.clone())
        .with_pagination(pagination)
        .include_all()
        .unwrap()
        .into_router()
        .merge(common_routes(sessions))
}

pub async fn app() -> Router {
    let registry = registry();
    let store = seeded_store(&registry).await;
    app_with(registry, store, PaginationSettings::default())
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>, headers: &[(&str, &str)]) -> Reply {
    let mut req = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
        req = req.header(*k, *v);
    }
    let req = match body {
        Some(b) => req
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply { status, headers, body }
}

pub async fn get(app: &Router, uri: &str) -> Reply {
    send(app, Method::GET, uri, None, &[]).await
}
