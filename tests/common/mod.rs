#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use products_api::{
    build_router,
    store::{MemoryProductStore, ProductStore},
    AppState,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

pub fn memory_app() -> Router {
    app_with(Arc::new(MemoryProductStore::new()))
}

pub fn app_with(store: Arc<dyn ProductStore>) -> Router {
    build_router(AppState::new(store))
}

/// Sends one request and decodes the JSON response body.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub fn product_body(name: &str, category: &str, price: f64) -> Value {
    json!({
        "name": name,
        "description": format!("{name} for everyday use"),
        "price": price,
        "category": category,
        "stock": 10,
    })
}

/// Creates a product and returns it as rendered by the API.
pub async fn create(app: &Router, body: Value) -> Value {
    let (status, value) = send(app, "POST", "/products/", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{value}");
    value["product"].clone()
}
