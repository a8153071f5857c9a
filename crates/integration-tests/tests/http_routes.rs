//! Router wiring against in-memory stores.
//!
//! The session store's pool is lazy and never connected: these requests
//! carry no session cookie and queue no flash messages, so the session layer
//! never reaches the database.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use streetlab_integration_tests::{memory_state, size, tee};
use streetlab_storefront::db::InMemoryStore;

async fn app() -> axum::Router {
    let store = InMemoryStore::new();
    store.insert_product(tee(1, 8990)).await;
    store.set_stock(tee(1, 0).id, size("M"), 4).await;
    store.set_stock(tee(1, 0).id, size("G"), 1).await;

    let mut hoodie = tee(2, 21990);
    hoodie.slug = "moletom-logo".to_owned();
    hoodie.category = Some("moletons".to_owned());
    store.insert_product(hoodie).await;

    streetlab_storefront::app(memory_state(Arc::new(store)))
}

async fn send(request: Request<Body>) -> axum::response::Response {
    app().await.oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = send(get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let request = Request::get("/health")
        .header("x-request-id", "edge-42")
        .body(Body::empty())
        .unwrap();
    let response = send(request).await;
    assert_eq!(response.headers()["x-request-id"], "edge-42");

    let response = send(get("/health")).await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_cart_and_checkout_require_login() {
    let response = send(get("/cart")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=/cart");

    let request = Request::post("/checkout")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("action=finish_order"))
        .unwrap();
    let response = send(request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=/checkout");
}

#[tokio::test]
async fn test_nested_cart_routes_return_to_full_path() {
    let request = Request::post("/cart/add/tee-1")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("size=M"))
        .unwrap();
    let response = send(request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=/cart/add/tee-1");

    let request = Request::post("/cart/remove/0").body(Body::empty()).unwrap();
    let response = send(request).await;
    assert_eq!(location(&response), "/login?next=/cart/remove/0");
}

#[tokio::test]
async fn test_admin_requires_admin() {
    let response = send(get("/admin")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=/admin");
}

#[tokio::test]
async fn test_home_lists_newest_first() {
    let response = send(get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json(response).await;
    let slugs: Vec<_> = body["featured"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["slug"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(slugs, ["moletom-logo", "tee-1"]);
    assert_eq!(body["user_name"], Value::Null);
    assert_eq!(body["cart_count"], 0);
}

#[tokio::test]
async fn test_shop_filters_by_category() {
    let body = json(send(get("/shop?category=moletons")).await).await;
    assert_eq!(body["products"].as_array().unwrap().len(), 1);
    assert_eq!(body["products"][0]["slug"], "moletom-logo");
    assert_eq!(body["categories"], serde_json::json!(["camisetas", "moletons"]));
}

#[tokio::test]
async fn test_product_shows_stock_per_size() {
    let response = send(get("/product/tee-1")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json(response).await;
    let sizes: Vec<_> = body["sizes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| (s["size"].as_str().unwrap().to_owned(), s["quantity"].as_u64().unwrap()))
        .collect();
    assert_eq!(
        sizes,
        [("P".to_owned(), 0), ("M".to_owned(), 4), ("G".to_owned(), 1)]
    );
}
