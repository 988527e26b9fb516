pub mod dispatch;
pub mod event;
pub mod signature;

pub use dispatch::{WebhookAck, handle_collection_webhook, handle_product_webhook};
pub use event::{EntityKind, EventAction, InboundEvent, ParseError, Topic};
pub use signature::verify;

use axum::{Router, routing::post};

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhooks/products", post(handle_product_webhook))
        .route("/webhooks/collections", post(handle_collection_webhook))
}
