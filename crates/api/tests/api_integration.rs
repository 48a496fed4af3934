//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use cart_store::{Category, InMemoryCartRepository, InMemoryProductStore, Product, ProductStore};
use chrono::NaiveDate;
use common::{Money, ProductModel};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

type State = Arc<AppState<InMemoryCartRepository, InMemoryProductStore>>;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn product(model: &str, quantity: u32, price_cents: i64) -> Product {
    Product::new(
        model,
        Category::Smartphone,
        quantity,
        Money::from_cents(price_cents),
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
    )
}

fn setup_with_state() -> (axum::Router, State) {
    let state = api::create_state(
        InMemoryCartRepository::new(),
        InMemoryProductStore::with_products([
            product("iPhone13", 3, 79900),
            product("Pixel8", 1, 59900),
            product("SoldOut", 0, 1000),
        ]),
    );
    let system = api::SystemState {
        backend: "memory",
        metrics: get_metrics_handle(),
    };
    (api::create_app(state.clone(), system), state)
}

fn setup() -> axum::Router {
    setup_with_state().0
}

fn request(method: &str, uri: &str, user: Option<(&str, &str)>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match user {
        Some((username, role)) => builder
            .header("x-username", username)
            .header("x-user-role", role),
        None => builder,
    }
}

fn empty_request(method: &str, uri: &str, user: Option<(&str, &str)>) -> Request<Body> {
    request(method, uri, user).body(Body::empty()).unwrap()
}

const ALICE: Option<(&str, &str)> = Some(("alice", "Customer"));
const ADMIN: Option<(&str, &str)> = Some(("root", "Admin"));

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

async fn post_cart(
    app: &axum::Router,
    user: Option<(&str, &str)>,
    body: &str,
) -> (StatusCode, serde_json::Value) {
    let req = request("POST", "/carts", user)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

async fn add(
    app: &axum::Router,
    user: Option<(&str, &str)>,
    model: &str,
) -> (StatusCode, serde_json::Value) {
    post_cart(app, user, &serde_json::json!({ "model": model }).to_string()).await
}

async fn get_cart(app: &axum::Router, user: Option<(&str, &str)>) -> serde_json::Value {
    let (status, json) = send(app, empty_request("GET", "/carts", user)).await;
    assert_eq!(status, StatusCode::OK);
    json
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = send(&app, empty_request("GET", "/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["backend"], "memory");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    add(&app, ALICE, "iPhone13").await;

    let response = app
        .oneshot(empty_request("GET", "/metrics", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("cart_items_added_total"));
}

#[tokio::test]
async fn test_get_cart_without_cart_is_empty() {
    let app = setup();

    let json = get_cart(&app, ALICE).await;

    assert_eq!(json["id"], serde_json::Value::Null);
    assert_eq!(json["customer"], "alice");
    assert_eq!(json["paid"], false);
    assert_eq!(json["total_cents"], 0);
    assert_eq!(json["products"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_add_to_cart_then_get() {
    let app = setup();

    let (status, json) = add(&app, ALICE, "iPhone13").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::Value::Bool(true));
    add(&app, ALICE, "iPhone13").await;

    let cart = get_cart(&app, ALICE).await;
    assert!(cart["id"].is_i64());
    assert_eq!(cart["total_cents"], 159800);
    assert_eq!(cart["products"][0]["model"], "iPhone13");
    assert_eq!(cart["products"][0]["quantity"], 2);
    assert_eq!(cart["products"][0]["category"], "Smartphone");
    assert_eq!(cart["products"][0]["price_cents"], 79900);
}

#[tokio::test]
async fn test_add_unknown_product_is_not_found() {
    let app = setup();

    let (status, json) = add(&app, ALICE, "Nokia3310").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "ProductNotFound");
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_add_sold_out_product_is_conflict() {
    let app = setup();

    let (status, json) = add(&app, ALICE, "SoldOut").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "EmptyStock");
}

#[tokio::test]
async fn test_add_blank_model_is_unprocessable() {
    let app = setup();

    let (status, json) = add(&app, ALICE, "   ").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["kind"], "ValidationError");
}

#[tokio::test]
async fn test_malformed_add_body_is_unprocessable() {
    let app = setup();

    for body in ["{}", r#"{"model":5}"#, "not json"] {
        let (status, json) = post_cart(&app, ALICE, body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body: {body}");
        assert_eq!(json["kind"], "ValidationError", "body: {body}");
        assert!(json["error"].is_string(), "body: {body}");
    }
}

#[tokio::test]
async fn test_add_without_content_type_is_unprocessable() {
    let app = setup();
    let req = request("POST", "/carts", ALICE)
        .body(Body::from(r#"{"model":"iPhone13"}"#))
        .unwrap();

    let (status, json) = send(&app, req).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["kind"], "ValidationError");
    assert_eq!(get_cart(&app, ALICE).await["id"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = setup();

    let (status, json) = send(&app, empty_request("GET", "/carts", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["kind"], "Unauthorized");
}

#[tokio::test]
async fn test_manager_cannot_use_customer_routes() {
    let app = setup();

    let (status, _) = add(&app, Some(("bob", "Manager")), "iPhone13").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_checkout_flow() {
    let (app, state) = setup_with_state();
    add(&app, ALICE, "iPhone13").await;
    add(&app, ALICE, "iPhone13").await;

    let (status, json) = send(&app, empty_request("PATCH", "/carts", ALICE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::Value::Bool(true));

    let stock = state
        .cart_service
        .products()
        .get_product(&ProductModel::new("iPhone13"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stock.quantity, 1);

    let (status, history) = send(&app, empty_request("GET", "/carts/history", ALICE)).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["paid"], true);
    assert!(history[0]["payment_date"].is_string());

    let fresh = get_cart(&app, ALICE).await;
    assert_eq!(fresh["id"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_checkout_over_stock_is_conflict() {
    let (app, state) = setup_with_state();
    add(&app, ALICE, "Pixel8").await;
    add(&app, ALICE, "Pixel8").await;

    let (status, json) = send(&app, empty_request("PATCH", "/carts", ALICE)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "LowStock");
    let stock = state
        .cart_service
        .products()
        .get_product(&ProductModel::new("Pixel8"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stock.quantity, 1);
    assert_eq!(get_cart(&app, ALICE).await["paid"], false);
}

#[tokio::test]
async fn test_checkout_without_cart_is_not_found() {
    let app = setup();

    let (status, json) = send(&app, empty_request("PATCH", "/carts", ALICE)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "CartNotFound");
}

#[tokio::test]
async fn test_checkout_emptied_cart_is_bad_request() {
    let app = setup();
    add(&app, ALICE, "iPhone13").await;
    send(&app, empty_request("DELETE", "/carts/products/iPhone13", ALICE)).await;

    let (status, json) = send(&app, empty_request("PATCH", "/carts", ALICE)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "EmptyCart");
}

#[tokio::test]
async fn test_remove_product() {
    let app = setup();
    add(&app, ALICE, "iPhone13").await;
    add(&app, ALICE, "Pixel8").await;

    let (status, _) = send(&app, empty_request("DELETE", "/carts/products/iPhone13", ALICE)).await;
    assert_eq!(status, StatusCode::OK);

    let cart = get_cart(&app, ALICE).await;
    assert_eq!(cart["total_cents"], 59900);
    assert_eq!(cart["products"].as_array().unwrap().len(), 1);

    let (status, json) = send(
        &app,
        empty_request("DELETE", "/carts/products/iPhone13", ALICE),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "ProductNotInCart");
}

#[tokio::test]
async fn test_clear_cart() {
    let app = setup();
    add(&app, ALICE, "iPhone13").await;
    add(&app, ALICE, "Pixel8").await;

    let (status, _) = send(&app, empty_request("DELETE", "/carts/current", ALICE)).await;
    assert_eq!(status, StatusCode::OK);

    let cart = get_cart(&app, ALICE).await;
    assert!(cart["id"].is_i64());
    assert_eq!(cart["total_cents"], 0);
    assert_eq!(cart["products"].as_array().unwrap().len(), 0);

    let (status, json) = send(&app, empty_request("DELETE", "/carts/current", ALICE)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "CartNotFound");
}

#[tokio::test]
async fn test_admin_lists_and_deletes_all_carts() {
    let app = setup();
    add(&app, ALICE, "iPhone13").await;
    add(&app, Some(("carol", "Customer")), "Pixel8").await;

    let (status, all) = send(&app, empty_request("GET", "/carts/all", ADMIN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, _) = send(&app, empty_request("DELETE", "/carts", ADMIN)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = send(&app, empty_request("GET", "/carts/all", ADMIN)).await;
    assert_eq!(all.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_customer_cannot_use_admin_routes() {
    let app = setup();

    let (status, _) = send(&app, empty_request("GET", "/carts/all", ALICE)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, empty_request("DELETE", "/carts", ALICE)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
