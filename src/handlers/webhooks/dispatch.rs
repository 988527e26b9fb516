//! Webhook dispatcher for the upstream platform's change notifications.
//!
//! Per-delivery sequence, strictly ordered: extract headers, require the
//! configured shared secret (500), require the signature header (400), verify
//! the signature (401), short-circuit duplicates (200), parse (400), hand the
//! event to the catalog upsert engine WITHOUT waiting for it, mark the
//! delivery processed, acknowledge with 200.
//!
//! The ack means "accepted", not "applied": the upstream platform's response
//! budget is short, so the catalog mutation runs on a detached task and its
//! failures land in the apply-failure sink (visible via /sync/status) and the
//! logs, never in the HTTP response. A delivery is marked processed before its
//! mutation completes - never-reprocess is deliberately favored over
//! guaranteed-applied; a mutation lost this way shows up as sync drift, and
//! the upstream entity converges on its next change event.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;

use crate::db::AppState;
use crate::sync::apply;

use super::event::{self, EntityKind, EVENT_ID_HEADER, InboundEvent, SIGNATURE_HEADER, WEBHOOK_ID_HEADER};
use super::signature;

/// Acknowledgement body returned for every delivery.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
}

fn ack(status: StatusCode, success: bool, message: impl Into<String>) -> Response {
    (
        status,
        Json(WebhookAck {
            success,
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
        .into_response()
}

pub async fn handle_product_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(state, EntityKind::Product, headers, body).await
}

pub async fn handle_collection_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(state, EntityKind::Collection, headers, body).await
}

async fn dispatch(
    state: AppState,
    expected: EntityKind,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event_id = event::header_str(&headers, EVENT_ID_HEADER);
    let delivery_id = event::header_str(&headers, WEBHOOK_ID_HEADER);

    let Some(secret) = state.webhook_secret.clone() else {
        tracing::error!("webhook delivery received but no shared secret is configured");
        return ack(
            StatusCode::INTERNAL_SERVER_ERROR,
            false,
            "webhook secret not configured",
        );
    };

    let Some(provided) = event::header_str(&headers, SIGNATURE_HEADER) else {
        return ack(StatusCode::BAD_REQUEST, false, "missing X-Hmac-Sha256 header");
    };

    if !signature::verify(&body, &provided, &secret) {
        tracing::warn!(endpoint = expected.as_str(), "webhook rejected: invalid signature");
        return ack(StatusCode::UNAUTHORIZED, false, "invalid signature");
    }

    if state
        .dedup
        .is_duplicate(event_id.as_deref(), delivery_id.as_deref())
    {
        tracing::debug!(?event_id, ?delivery_id, "duplicate delivery short-circuited");
        return ack(StatusCode::OK, true, "duplicate delivery");
    }

    let event = match event::parse(expected, &headers, &body) {
        Ok(event) => event,
        Err(err) => {
            // Raw headers are the diagnostic trail for malformed deliveries.
            tracing::warn!(headers = ?headers, "webhook rejected: {}", err);
            return ack(StatusCode::BAD_REQUEST, false, err.to_string());
        }
    };

    spawn_apply(state.clone(), event);

    state
        .dedup
        .mark_processed(event_id.as_deref(), delivery_id.as_deref());

    ack(StatusCode::OK, true, "accepted")
}

/// Run the catalog mutation detached from the request. Failures are logged
/// and recorded in the apply-failure sink; the delivery was already
/// acknowledged.
fn spawn_apply(state: AppState, event: InboundEvent) {
    tokio::spawn(async move {
        let mut conn = match state.db.get() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(topic = %event.topic, "catalog apply failed: no db connection: {}", e);
                state.apply_failures.record(&event.topic.to_string(), &e);
                return;
            }
        };

        match apply::apply_event(&mut conn, &event) {
            Ok(applied) => {
                tracing::info!(topic = %event.topic, outcome = ?applied, "catalog mutation applied");
            }
            Err(e) => {
                tracing::error!(topic = %event.topic, "catalog mutation failed after ack: {}", e);
                state.apply_failures.record(&event.topic.to_string(), &e);
            }
        }
    });
}
