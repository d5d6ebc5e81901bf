//! Integration tests for the order API server.

use std::sync::OnceLock;

use api::StateHandles;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain::Money;
use domain::ProductId;
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::topics;
use tower::ServiceExt;

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

fn setup() -> (axum::Router, StateHandles, uuid::Uuid) {
    let (state, handles) = api::create_default_state();
    let app = api::create_app(state, get_metrics_handle());
    (app, handles, uuid::Uuid::new_v4())
}

/// Seeds a product and returns its id.
fn seed_product(handles: &StateHandles, price_cents: i64, stock: u32) -> ProductId {
    let product = ProductId::new();
    handles
        .catalog
        .add_product(product, Money::from_cents(price_cents), stock);
    product
}

fn create_order_request(user: &uuid::Uuid, product: ProductId, quantity: u32) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/orders")
        .header("content-type", "application/json")
        .header("x-user-id", user.to_string())
        .body(Body::from(
            serde_json::to_string(&serde_json::json!({
                "items": [{
                    "product_id": product.to_string(),
                    "quantity": quantity
                }],
                "shipping_address": "1 Ship St",
                "billing_address": "2 Bill Ave"
            }))
            .unwrap(),
        ))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_order() {
    let (app, handles, user) = setup();
    let product = seed_product(&handles, 1000, 10);

    let response = app
        .oneshot(create_order_request(&user, product, 2))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["status"], "Pending");
    assert_eq!(json["payment_status"], "Pending");
    assert_eq!(json["total_cents"], 2000);
    assert_eq!(json["items"].as_array().unwrap().len(), 1);
    assert_eq!(json["items"][0]["total_cents"], 2000);

    // Exactly one creation event reached the bus.
    assert_eq!(handles.bus.published_on(topics::ORDER_CREATED).len(), 1);
}

#[tokio::test]
async fn test_create_and_get_order() {
    let (app, handles, user) = setup();
    let product = seed_product(&handles, 1000, 10);

    let create_response = app
        .clone()
        .oneshot(create_order_request(&user, product, 2))
        .await
        .unwrap();
    let created = body_json(create_response).await;
    let order_id = created["id"].as_str().unwrap().to_string();

    let get_response = app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{order_id}"))
                .header("x-user-id", user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(get_response.status(), StatusCode::OK);
    let order = body_json(get_response).await;
    assert_eq!(order["id"], order_id);
    assert_eq!(order["status"], "Pending");
    assert_eq!(order["total_cents"], 2000);
}

#[tokio::test]
async fn test_unavailable_item_creates_nothing() {
    let (app, handles, user) = setup();
    let product = seed_product(&handles, 1000, 1);

    let response = app
        .clone()
        .oneshot(create_order_request(&user, product, 5))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["kind"], "item_unavailable");

    // No row was written, no event published.
    assert_eq!(handles.store.order_count().await, 0);
    assert!(handles.bus.published().is_empty());

    let list_response = app
        .oneshot(
            Request::builder()
                .uri("/orders")
                .header("x-user-id", user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let orders = body_json(list_response).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_order_is_rejected() {
    let (app, _, user) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .header("x-user-id", user.to_string())
                .body(Body::from(r#"{"items": []}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["kind"], "validation");
}

#[tokio::test]
async fn test_missing_user_header_is_unauthorized() {
    let (app, handles, _) = setup();
    let product = seed_product(&handles, 1000, 10);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_string(&serde_json::json!({
                        "items": [{"product_id": product.to_string(), "quantity": 1}]
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_nonexistent_order() {
    let (app, _, user) = setup();
    let fake_id = uuid::Uuid::new_v4();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{fake_id}"))
                .header("x-user-id", user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_orders_are_scoped_to_their_owner() {
    let (app, handles, user) = setup();
    let product = seed_product(&handles, 1000, 10);

    let create_response = app
        .clone()
        .oneshot(create_order_request(&user, product, 1))
        .await
        .unwrap();
    let created = body_json(create_response).await;
    let order_id = created["id"].as_str().unwrap().to_string();

    let other_user = uuid::Uuid::new_v4();
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{order_id}"))
                .header("x-user-id", other_user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_order_id_format() {
    let (app, _, user) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/orders/not-a-uuid")
                .header("x-user-id", user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_orders_with_pagination_header() {
    let (app, handles, user) = setup();
    let product = seed_product(&handles, 500, 100);

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(create_order_request(&user, product, 1))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri("/orders?page=1&page_size=2")
                .header("x-user-id", user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let pagination: serde_json::Value = serde_json::from_str(
        response
            .headers()
            .get("x-pagination")
            .unwrap()
            .to_str()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(pagination["totalItems"], 3);
    assert_eq!(pagination["pageSize"], 2);
    assert_eq!(pagination["currentPage"], 1);
    assert_eq!(pagination["totalPages"], 2);

    let orders = body_json(response).await;
    assert_eq!(orders.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_orders_filtered_by_status() {
    let (app, handles, user) = setup();
    let product = seed_product(&handles, 500, 100);

    let create_response = app
        .clone()
        .oneshot(create_order_request(&user, product, 1))
        .await
        .unwrap();
    let created = body_json(create_response).await;
    let order_id = created["id"].as_str().unwrap().to_string();

    // Move it out of Pending.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/orders/{order_id}/status"))
                .header("content-type", "application/json")
                .header("x-user-id", user.to_string())
                .body(Body::from(r#"{"status": "Processing"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/orders?status=Pending")
                .header("x-user-id", user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let pending = body_json(response).await;
    assert!(pending.as_array().unwrap().is_empty());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/orders?status=Processing")
                .header("x-user-id", user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let processing = body_json(response).await;
    assert_eq!(processing.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_status_publishes_event() {
    let (app, handles, user) = setup();
    let product = seed_product(&handles, 1000, 10);

    let create_response = app
        .clone()
        .oneshot(create_order_request(&user, product, 1))
        .await
        .unwrap();
    let created = body_json(create_response).await;
    let order_id = created["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/orders/{order_id}/status"))
                .header("content-type", "application/json")
                .header("x-user-id", user.to_string())
                .body(Body::from(r#"{"status": "Processing"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let order = body_json(response).await;
    assert_eq!(order["status"], "Processing");
    assert!(order["updated_at"].is_string());

    let events = handles.bus.published_on(topics::ORDER_STATUS_UPDATED);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["previousStatus"], "Pending");
    assert_eq!(events[0].payload["status"], "Processing");
}

#[tokio::test]
async fn test_illegal_transition_is_rejected() {
    let (app, handles, user) = setup();
    let product = seed_product(&handles, 1000, 10);

    let create_response = app
        .clone()
        .oneshot(create_order_request(&user, product, 1))
        .await
        .unwrap();
    let created = body_json(create_response).await;
    let order_id = created["id"].as_str().unwrap().to_string();

    // Pending -> Completed skips Processing.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/orders/{order_id}/status"))
                .header("content-type", "application/json")
                .header("x-user-id", user.to_string())
                .body(Body::from(r#"{"status": "Completed"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["kind"], "invalid_transition");

    // Stored status is unchanged.
    let get_response = app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{order_id}"))
                .header("x-user-id", user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let order = body_json(get_response).await;
    assert_eq!(order["status"], "Pending");
}

#[tokio::test]
async fn test_unknown_status_string_is_rejected() {
    let (app, handles, user) = setup();
    let product = seed_product(&handles, 1000, 10);

    let create_response = app
        .clone()
        .oneshot(create_order_request(&user, product, 1))
        .await
        .unwrap();
    let created = body_json(create_response).await;
    let order_id = created["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/orders/{order_id}/status"))
                .header("content-type", "application/json")
                .header("x-user-id", user.to_string())
                .body(Body::from(r#"{"status": "Shipped"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_status_of_missing_order() {
    let (app, _, user) = setup();
    let fake_id = uuid::Uuid::new_v4();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/orders/{fake_id}/status"))
                .header("content-type", "application/json")
                .header("x-user-id", user.to_string())
                .body(Body::from(r#"{"status": "Processing"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_storage_fault_maps_to_500() {
    let (app, handles, user) = setup();
    let product = seed_product(&handles, 1000, 10);
    handles.store.set_fail_on_write(true).await;

    let response = app
        .oneshot(create_order_request(&user, product, 1))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["kind"], "persistence_failed");
    assert!(handles.bus.published().is_empty());
}

#[tokio::test]
async fn test_lost_event_does_not_fail_creation() {
    let (app, handles, user) = setup();
    let product = seed_product(&handles, 1000, 10);
    handles.bus.set_fail_on_publish(true);

    let response = app
        .clone()
        .oneshot(create_order_request(&user, product, 1))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(handles.bus.published().is_empty());
    assert_eq!(handles.store.order_count().await, 1);
}
