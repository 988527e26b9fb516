//! Test utilities and fixtures for storesync integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde_json::json;

pub use storesync::db::{AppState, DbPool, init_db, queries};
pub use storesync::dedup::{Clock, DedupCache};
pub use storesync::handlers::webhooks::{EntityKind, EventAction, InboundEvent, Topic};
pub use storesync::models::*;
pub use storesync::sync::ApplyFailureSink;

pub const TEST_SECRET: &str = "whsec_test_shared_secret";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Create an in-memory pool. max_size(1) so every checkout sees the same
/// in-memory database.
pub fn create_test_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }
    pool
}

/// Create an AppState for testing with an in-memory database
pub fn create_test_app_state() -> AppState {
    AppState {
        db: create_test_pool(),
        webhook_secret: Some(TEST_SECRET.to_string()),
        dedup: Arc::new(DedupCache::with_system_clock(86_400)),
        apply_failures: Arc::new(ApplyFailureSink::default()),
    }
}

/// Create a Router with the webhook endpoints
pub fn webhook_app(state: AppState) -> Router {
    storesync::handlers::webhooks::router().with_state(state)
}

/// Compute the signature the upstream platform would send for a payload
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    use base64::Engine;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// A product payload in the upstream platform's webhook shape, with one
/// variant, one option, and one media item.
pub fn product_payload(external_id: i64, handle: &str, title: &str, price: &str) -> serde_json::Value {
    json!({
        "id": external_id,
        "title": title,
        "handle": handle,
        "body_html": format!("<p>{}</p>", title),
        "vendor": "Test Vendor",
        "product_type": "Print",
        "status": "active",
        "published_at": "2026-01-10T12:00:00Z",
        "updated_at": "2026-01-10T12:00:00Z",
        "variants": [
            {
                "id": external_id * 10,
                "title": "Default",
                "sku": format!("SKU-{}", external_id),
                "price": price,
                "position": 1,
                "inventory_policy": "deny",
                "taxable": true,
                "updated_at": "2026-01-10T12:00:00Z"
            }
        ],
        "options": [
            { "name": "Size", "position": 1, "values": ["A2"] }
        ],
        "media": [
            { "src": "https://cdn.example.com/a.jpg", "alt": "front", "position": 1 }
        ]
    })
}

pub fn collection_payload(external_id: i64, handle: &str, title: &str) -> serde_json::Value {
    json!({
        "id": external_id,
        "title": title,
        "handle": handle,
        "body_html": format!("<p>{}</p>", title),
        "sort_order": "manual",
        "updated_at": "2026-01-10T12:00:00Z"
    })
}

/// Build a normalized event as the dispatcher would after parsing
pub fn make_event(
    entity: EntityKind,
    action: EventAction,
    payload: serde_json::Value,
) -> InboundEvent {
    InboundEvent {
        delivery_id: Some(uuid::Uuid::new_v4().to_string()),
        event_id: Some(uuid::Uuid::new_v4().to_string()),
        topic: Topic { entity, action },
        triggered_at: None,
        api_version: Some("2026-01".to_string()),
        shop_domain: Some("test-shop.example.com".to_string()),
        payload,
    }
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })
    .unwrap()
}

/// Insert a product directly, bypassing the webhook path. Returns the row.
pub fn insert_test_product(
    conn: &Connection,
    external_id: &str,
    handle: &str,
    status: &str,
) -> CatalogProduct {
    queries::insert_product(
        conn,
        &UpsertProduct {
            external_id: external_id.to_string(),
            handle: handle.to_string(),
            title: format!("Product {}", handle),
            description_html: None,
            vendor: Some("Test Vendor".to_string()),
            product_type: None,
            status: status.to_string(),
            published_at: Some(1_767_000_000),
            source_updated_at: None,
        },
    )
    .expect("Failed to insert test product")
}

pub fn insert_test_variant(
    conn: &Connection,
    product_id: &str,
    external_id: &str,
    price: f64,
) {
    queries::upsert_variant(
        conn,
        product_id,
        &UpsertVariant {
            external_id: external_id.to_string(),
            title: Some("Default".to_string()),
            sku: None,
            price_amount: price,
            price_currency: "USD".to_string(),
            compare_at_price_amount: None,
            position: 1,
            inventory_policy: Some("deny".to_string()),
            taxable: true,
            source_updated_at: None,
        },
    )
    .expect("Failed to insert test variant")
}
