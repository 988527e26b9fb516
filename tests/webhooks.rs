//! Signature verification and webhook dispatcher tests

#[path = "common/mod.rs"]
mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::*;
use serde_json::Value;
use std::time::Duration;
use storesync::handlers::webhooks::verify;
use tower::ServiceExt;

// ============ Signature Verification ============

#[test]
fn test_valid_signature_accepted() {
    let payload = b"{\"id\":100,\"title\":\"Sunset Print\"}";
    let signature = sign_payload(payload, TEST_SECRET);

    assert!(verify(payload, &signature, TEST_SECRET));
}

#[test]
fn test_wrong_secret_rejected() {
    let payload = b"{\"id\":100}";
    let signature = sign_payload(payload, "some_other_secret");

    assert!(!verify(payload, &signature, TEST_SECRET));
}

#[test]
fn test_modified_payload_rejected() {
    let payload = b"{\"id\":100}";
    let signature = sign_payload(payload, TEST_SECRET);

    assert!(!verify(b"{\"id\":101}", &signature, TEST_SECRET));
}

#[test]
fn test_mutated_signature_rejected() {
    let payload = b"{\"id\":100}";
    let signature = sign_payload(payload, TEST_SECRET);

    // Flip one character without changing the length
    let mut chars: Vec<char> = signature.chars().collect();
    chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
    let mutated: String = chars.into_iter().collect();

    assert!(!verify(payload, &mutated, TEST_SECRET));
}

#[test]
fn test_malformed_signature_rejected() {
    let payload = b"{\"id\":100}";

    assert!(!verify(payload, "", TEST_SECRET));
    assert!(!verify(payload, "not-base64-at-all!!!", TEST_SECRET));
    assert!(!verify(payload, "dG9vLXNob3J0", TEST_SECRET));
}

// ============ Dispatcher ============

fn webhook_request(
    path: &str,
    topic: &str,
    event_id: Option<&str>,
    body: Vec<u8>,
    signature: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .header("x-topic", topic)
        .header("x-triggered-at", "2026-01-10T12:00:00Z")
        .header("x-api-version", "2026-01")
        .header("x-shop-domain", "test-shop.example.com");
    if let Some(id) = event_id {
        builder = builder.header("x-event-id", id);
    }
    if let Some(sig) = signature {
        builder = builder.header("x-hmac-sha256", sig);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn ack_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll until the detached catalog mutation lands
async fn wait_for_count(state: &AppState, table: &str, expected: i64) {
    for _ in 0..200 {
        {
            let conn = state.db.get().unwrap();
            if count_rows(&conn, table) == expected {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {} rows in {}", expected, table);
}

#[tokio::test]
async fn test_missing_secret_returns_500() {
    let mut state = create_test_app_state();
    state.webhook_secret = None;

    let body = product_payload(100, "sunset-print", "Sunset Print", "120.00").to_string();
    let signature = sign_payload(body.as_bytes(), TEST_SECRET);
    let request = webhook_request(
        "/webhooks/products",
        "products/create",
        Some("evt_1"),
        body.into_bytes(),
        Some(&signature),
    );

    let response = webhook_app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let ack = ack_body(response).await;
    assert_eq!(ack["success"], false);
}

#[tokio::test]
async fn test_missing_signature_returns_400() {
    let state = create_test_app_state();

    let body = product_payload(100, "sunset-print", "Sunset Print", "120.00").to_string();
    let request = webhook_request(
        "/webhooks/products",
        "products/create",
        Some("evt_1"),
        body.into_bytes(),
        None,
    );

    let response = webhook_app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_signature_returns_401() {
    let state = create_test_app_state();

    let body = product_payload(100, "sunset-print", "Sunset Print", "120.00").to_string();
    let signature = sign_payload(body.as_bytes(), "wrong_secret");
    let request = webhook_request(
        "/webhooks/products",
        "products/create",
        Some("evt_1"),
        body.into_bytes(),
        Some(&signature),
    );

    let response = webhook_app(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Nothing was applied
    let conn = state.db.get().unwrap();
    assert_eq!(count_rows(&conn, "products"), 0);
}

#[tokio::test]
async fn test_malformed_body_returns_400() {
    let state = create_test_app_state();

    let body = b"this is not json".to_vec();
    let signature = sign_payload(&body, TEST_SECRET);
    let request = webhook_request(
        "/webhooks/products",
        "products/create",
        Some("evt_1"),
        body,
        Some(&signature),
    );

    let response = webhook_app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_identity_headers_returns_400() {
    let state = create_test_app_state();

    let body = product_payload(100, "sunset-print", "Sunset Print", "120.00").to_string();
    let signature = sign_payload(body.as_bytes(), TEST_SECRET);
    // No x-event-id and no x-webhook-id
    let request = webhook_request(
        "/webhooks/products",
        "products/create",
        None,
        body.into_bytes(),
        Some(&signature),
    );

    let response = webhook_app(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let conn = state.db.get().unwrap();
    assert_eq!(count_rows(&conn, "products"), 0);
}

#[tokio::test]
async fn test_wrong_topic_for_endpoint_returns_400() {
    let state = create_test_app_state();

    let body = collection_payload(500, "spring", "Spring").to_string();
    let signature = sign_payload(body.as_bytes(), TEST_SECRET);
    let request = webhook_request(
        "/webhooks/products",
        "collections/create",
        Some("evt_1"),
        body.into_bytes(),
        Some(&signature),
    );

    let response = webhook_app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_product_create_end_to_end() {
    let state = create_test_app_state();

    let body = product_payload(100, "sunset-print", "Sunset Print", "120.00").to_string();
    let signature = sign_payload(body.as_bytes(), TEST_SECRET);
    let request = webhook_request(
        "/webhooks/products",
        "products/create",
        Some("evt_p100"),
        body.into_bytes(),
        Some(&signature),
    );

    let response = webhook_app(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let ack = ack_body(response).await;
    assert_eq!(ack["success"], true);
    assert_eq!(ack["message"], "accepted");
    assert!(ack["timestamp"].as_str().is_some());

    wait_for_count(&state, "products", 1).await;
    wait_for_count(&state, "variants", 1).await;

    let conn = state.db.get().unwrap();
    let product = queries::get_active_product_by_external_id(&conn, "100")
        .unwrap()
        .expect("product should exist");
    assert_eq!(product.handle, "sunset-print");
    assert_eq!(product.title, "Sunset Print");
    assert!(product.linkage_id.is_none());

    let variants = queries::list_variants_for_product(&conn, &product.id).unwrap();
    assert_eq!(variants.len(), 1);
    assert_eq!(variants[0].price_amount, 120.00);
    assert_eq!(variants[0].price_currency, "USD");
}

#[tokio::test]
async fn test_duplicate_delivery_short_circuits() {
    let state = create_test_app_state();
    let app = webhook_app(state.clone());

    let body = product_payload(100, "sunset-print", "Sunset Print", "120.00").to_string();
    let signature = sign_payload(body.as_bytes(), TEST_SECRET);

    let first = app
        .clone()
        .oneshot(webhook_request(
            "/webhooks/products",
            "products/create",
            Some("evt_p100"),
            body.clone().into_bytes(),
            Some(&signature),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(ack_body(first).await["message"], "accepted");

    // Identical redelivery: same event id, same body
    let second = app
        .oneshot(webhook_request(
            "/webhooks/products",
            "products/create",
            Some("evt_p100"),
            body.into_bytes(),
            Some(&signature),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(ack_body(second).await["message"], "duplicate delivery");

    wait_for_count(&state, "products", 1).await;
    wait_for_count(&state, "variants", 1).await;

    // Give any stray second apply a chance to land, then re-check
    tokio::time::sleep(Duration::from_millis(50)).await;
    let conn = state.db.get().unwrap();
    assert_eq!(count_rows(&conn, "products"), 1);
    assert_eq!(count_rows(&conn, "variants"), 1);
}

#[tokio::test]
async fn test_collection_create_end_to_end() {
    let state = create_test_app_state();

    let body = collection_payload(500, "spring-2026", "Spring 2026").to_string();
    let signature = sign_payload(body.as_bytes(), TEST_SECRET);
    let request = webhook_request(
        "/webhooks/collections",
        "collections/create",
        Some("evt_c500"),
        body.into_bytes(),
        Some(&signature),
    );

    let response = webhook_app(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    wait_for_count(&state, "collections", 1).await;

    let conn = state.db.get().unwrap();
    let collection = queries::get_collection_by_external_id(&conn, "500")
        .unwrap()
        .expect("collection should exist");
    assert_eq!(collection.handle, "spring-2026");
}

#[tokio::test]
async fn test_delivery_id_accepted_when_event_id_absent() {
    let state = create_test_app_state();
    let app = webhook_app(state.clone());

    let body = product_payload(100, "sunset-print", "Sunset Print", "120.00").to_string();
    let signature = sign_payload(body.as_bytes(), TEST_SECRET);

    let make_request = || {
        Request::builder()
            .method("POST")
            .uri("/webhooks/products")
            .header("content-type", "application/json")
            .header("x-topic", "products/create")
            .header("x-webhook-id", "delivery_42")
            .header("x-hmac-sha256", signature.as_str())
            .body(Body::from(body.clone()))
            .unwrap()
    };

    let first = app.clone().oneshot(make_request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(ack_body(first).await["message"], "accepted");

    let second = app.oneshot(make_request()).await.unwrap();
    assert_eq!(ack_body(second).await["message"], "duplicate delivery");
}
