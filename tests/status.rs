//! Sync status reporter tests

#[path = "common/mod.rs"]
mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::*;
use serde_json::Value;
use tower::ServiceExt;

#[test]
fn test_empty_catalog_reports_zero() {
    let conn = setup_test_db();

    let status = queries::sync_status(&conn).unwrap();
    assert_eq!(status.total_publishable, 0);
    assert_eq!(status.linked, 0);
    assert!(status.last_linked_update.is_none());
}

#[test]
fn test_counts_linked_and_publishable() {
    let conn = setup_test_db();

    let linked = insert_test_product(&conn, "P1", "linked-product", "active");
    queries::set_product_linkage(&conn, &linked.id, "prod_1").unwrap();
    insert_test_product(&conn, "P2", "unlinked-product", "active");

    let status = queries::sync_status(&conn).unwrap();
    assert_eq!(status.total_publishable, 2);
    assert_eq!(status.linked, 1);
    assert!(status.last_linked_update.is_some());
}

#[test]
fn test_excludes_deleted_and_unpublishable() {
    let conn = setup_test_db();

    insert_test_product(&conn, "P1", "draft-product", "draft");
    let deleted = insert_test_product(&conn, "P2", "gone-product", "active");
    queries::set_product_linkage(&conn, &deleted.id, "prod_2").unwrap();
    queries::soft_delete_product(&conn, "P2").unwrap();
    insert_test_product(&conn, "P3", "live-product", "active");

    let status = queries::sync_status(&conn).unwrap();
    assert_eq!(status.total_publishable, 1);
    assert_eq!(status.linked, 0);
    assert!(status.last_linked_update.is_none());
}

#[test]
fn test_last_linked_update_is_most_recent() {
    let conn = setup_test_db();

    let a = insert_test_product(&conn, "P1", "first", "active");
    let b = insert_test_product(&conn, "P2", "second", "active");
    queries::set_product_linkage(&conn, &a.id, "prod_1").unwrap();
    queries::set_product_linkage(&conn, &b.id, "prod_2").unwrap();

    // Force distinct timestamps
    conn.execute("UPDATE products SET updated_at = 1000 WHERE external_id = 'P1'", [])
        .unwrap();
    conn.execute("UPDATE products SET updated_at = 2000 WHERE external_id = 'P2'", [])
        .unwrap();

    let status = queries::sync_status(&conn).unwrap();
    assert_eq!(status.last_linked_update, Some(2000));
}

#[tokio::test]
async fn test_status_endpoint_reports_drift_fields() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        let linked = insert_test_product(&conn, "P1", "linked-product", "active");
        queries::set_product_linkage(&conn, &linked.id, "prod_1").unwrap();
        insert_test_product(&conn, "P2", "unlinked-product", "active");
    }
    state
        .apply_failures
        .record("products/update", &"simulated write failure");

    let app = storesync::handlers::status::router().with_state(state);
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/sync/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["total_publishable"], 2);
    assert_eq!(body["linked"], 1);
    assert_eq!(body["linked_percent"], 50.0);
    assert!(body["last_linked_update"].as_str().is_some());
    assert_eq!(body["apply_failures"], 1);
    assert!(
        body["last_apply_error"]
            .as_str()
            .unwrap()
            .contains("simulated write failure")
    );
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = create_test_app_state();
    let app = storesync::handlers::status::router().with_state(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}
