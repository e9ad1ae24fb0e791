//! Integration tests for the registration API.

mod common;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    Router,
};
use common::{memory_store, MockStore};
use device_registry::{
    api::{create_router, create_router_with_rate_limit, AppState, RateLimitState},
    Directory, RecordStore, StoreError,
};
use registration_store::MemoryStore;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

/// Create a test app backed by a memory store the test can inspect.
fn create_test_app() -> (Router, Arc<MemoryStore>) {
    let store = memory_store();
    let state = AppState::new(Directory::new(store.clone()));
    (
        create_router_with_rate_limit(state, RateLimitState::permissive()),
        store,
    )
}

fn rpc(operation: &str, params: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/registration/v1/{}", operation))
        .header("content-type", "application/json")
        .body(Body::from(params.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn listed_tokens(app: &Router, count: i64) -> Vec<String> {
    let response = app
        .clone()
        .oneshot(rpc("listDevices", json!({ "count": count })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    json_body(response).await["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["regId"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _store) = create_test_app();

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

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["record_count"], 0);
    assert_eq!(
        json["operations"],
        json!(["register", "unregister", "listDevices"])
    );
}

#[tokio::test]
async fn test_register_creates_record() {
    let (app, store) = create_test_app();

    let response = app
        .oneshot(rpc("register", json!({ "regId": "device-abc" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let records = store.list(10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].reg_id, "device-abc");
}

#[tokio::test]
async fn test_register_twice_keeps_one_record() {
    let (app, store) = create_test_app();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(rpc("register", json!({ "regId": "device-abc" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_unregister_unknown_device() {
    let (app, store) = create_test_app();

    let response = app
        .oneshot(rpc("unregister", json!({ "regId": "device-xyz" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_register_then_unregister() {
    let (app, _store) = create_test_app();

    for (operation, token) in [
        ("register", "t"),
        ("register", "u"),
        ("unregister", "t"),
    ] {
        let response = app
            .clone()
            .oneshot(rpc(operation, json!({ "regId": token })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    assert_eq!(listed_tokens(&app, 10).await, vec!["u".to_string()]);
}

#[tokio::test]
async fn test_list_devices_is_bounded() {
    let (app, _store) = create_test_app();

    for token in ["a", "b", "c"] {
        app.clone()
            .oneshot(rpc("register", json!({ "regId": token })))
            .await
            .unwrap();
    }

    let all: HashSet<String> = listed_tokens(&app, 5).await.into_iter().collect();
    assert_eq!(all, HashSet::from(["a".into(), "b".into(), "c".into()]));

    let two = listed_tokens(&app, 2).await;
    assert_eq!(two.len(), 2);
    assert!(two.iter().all(|t| all.contains(t)));

    assert!(listed_tokens(&app, 0).await.is_empty());
}

#[tokio::test]
async fn test_list_devices_item_shape() {
    let (app, _store) = create_test_app();

    app.clone()
        .oneshot(rpc("register", json!({ "regId": "device-abc" })))
        .await
        .unwrap();

    let response = app
        .oneshot(rpc("listDevices", json!({ "count": 1 })))
        .await
        .unwrap();
    let json = json_body(response).await;
    let item = &json["items"][0];

    assert_eq!(item["regId"], "device-abc");
    assert!(item["id"].is_u64());
    assert!(item.get("registeredAt").is_none());
    assert_eq!(item.as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn test_negative_count_is_rejected() {
    let (app, _store) = create_test_app();

    let response = app
        .oneshot(rpc("listDevices", json!({ "count": -1 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "INVALID_PARAMS");
}

#[tokio::test]
async fn test_missing_body_is_rejected() {
    let (app, _store) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/registration/v1/register")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let (app, _store) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/registration/v1/register")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "INVALID_PARAMS");
}

#[tokio::test]
async fn test_unknown_operation() {
    let (app, _store) = create_test_app();

    let response = app
        .oneshot(rpc("purge", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "UNKNOWN_OPERATION");
}

#[tokio::test]
async fn test_store_failure_surfaces_as_unavailable() {
    let mut store = MockStore::new();
    store
        .expect_insert_if_absent()
        .times(1)
        .returning(|_| Err(StoreError::Unavailable("connection refused".into())));
    let app = create_router(AppState::new(Directory::new(Arc::new(store))));

    let response = app
        .oneshot(rpc("register", json!({ "regId": "device-abc" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(response).await;
    assert_eq!(json["code"], "STORE_UNAVAILABLE");
    assert_eq!(json["error"], "Store unavailable: connection refused");
}

fn rpc_from(operation: &str, params: Value, client: [u8; 4]) -> Request<Body> {
    let mut request = rpc(operation, params);
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((client, 40000))));
    request
}

#[tokio::test]
async fn test_per_client_rate_limiting() {
    let store = memory_store();
    let state = AppState::new(Directory::new(store));
    // One request per minute per client, no global cap
    let app = create_router_with_rate_limit(state, RateLimitState::new(0, 1));

    let response = app
        .clone()
        .oneshot(rpc_from("register", json!({ "regId": "a" }), [10, 0, 0, 1]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(rpc_from("register", json!({ "regId": "a" }), [10, 0, 0, 1]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(response).await["code"], "RATE_LIMIT_EXCEEDED");

    // A different device still gets through
    let response = app
        .clone()
        .oneshot(rpc_from("register", json!({ "regId": "b" }), [10, 0, 0, 2]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Health checks are not rate limited
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
}

#[tokio::test]
async fn test_global_rate_limiting() {
    let store = memory_store();
    let state = AppState::new(Directory::new(store));
    let app = create_router_with_rate_limit(state, RateLimitState::new(1, 0));

    let response = app
        .clone()
        .oneshot(rpc_from("listDevices", json!({ "count": 1 }), [10, 0, 0, 1]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(rpc_from("listDevices", json!({ "count": 1 }), [10, 0, 0, 2]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
