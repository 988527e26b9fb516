//! Catalog upsert engine: applies a normalized webhook event to the local
//! catalog.
//!
//! Each event resolves through a transition table over the row's state
//! (absent / active / soft-deleted) and the event's action:
//!
//! | row state    | create             | update            | delete         |
//! |--------------|--------------------|-------------------|----------------|
//! | absent       | insert             | insert (fallback) | no-op success  |
//! | active       | update (idempotent)| update            | soft delete    |
//! | soft-deleted | revive + update    | revive + update   | no-op success  |
//!
//! The fallbacks make the engine safe under at-least-once, out-of-order
//! delivery: an update arriving before its create inserts, a replayed create
//! updates, and deleting an unknown row succeeds. Heavily reordered
//! deliveries can still leave the catalog behind the upstream's final state
//! until the next event for that entity arrives.
//!
//! The engine writes to the database only; it never calls the payment
//! platform. Concurrent upserts for the same entity are serialized by the
//! store's uniqueness constraints - a constraint violation is retried once,
//! not treated as fatal.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::handlers::webhooks::event::{EntityKind, EventAction, InboundEvent};
use crate::models::{CollectionPayload, DeletePayload, ProductPayload};

/// What an event did to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    ProductCreated { id: String },
    ProductUpdated { id: String },
    ProductDeleted { existed: bool },
    CollectionCreated { id: String },
    CollectionUpdated { id: String },
    CollectionDeleted { existed: bool },
}

pub fn apply_event(conn: &mut Connection, event: &InboundEvent) -> Result<Applied> {
    match (event.topic.entity, event.topic.action) {
        (EntityKind::Product, EventAction::Create | EventAction::Update) => {
            let payload: ProductPayload = serde_json::from_value(event.payload.clone())?;
            with_constraint_retry(|| upsert_product(conn, &payload))
        }
        (EntityKind::Product, EventAction::Delete) => {
            let payload: DeletePayload = serde_json::from_value(event.payload.clone())?;
            let existed = queries::soft_delete_product(conn, &payload.id.to_string())?;
            Ok(Applied::ProductDeleted { existed })
        }
        (EntityKind::Collection, EventAction::Create | EventAction::Update) => {
            let payload: CollectionPayload = serde_json::from_value(event.payload.clone())?;
            with_constraint_retry(|| upsert_collection(conn, &payload))
        }
        (EntityKind::Collection, EventAction::Delete) => {
            let payload: DeletePayload = serde_json::from_value(event.payload.clone())?;
            let existed = queries::soft_delete_collection(conn, &payload.id.to_string())?;
            Ok(Applied::CollectionDeleted { existed })
        }
    }
}

/// Concurrent deliveries for the same entity can race to insert; the losing
/// side hits a uniqueness constraint and finds the row on retry.
fn with_constraint_retry(mut op: impl FnMut() -> Result<Applied>) -> Result<Applied> {
    match op() {
        Err(AppError::Database(ref e)) if is_constraint_violation(e) => {
            tracing::warn!("constraint race during upsert, retrying once");
            op()
        }
        other => other,
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Product create and update share one path: both overwrite the row with the
/// payload's field values, and both fall through to an insert when the row is
/// absent. Variants are upserted individually by external id; options and
/// media are replaced wholesale (the payload carries no per-item diff), with
/// positions reassigned from array order where the payload omits them. All of
/// it commits atomically with the product row.
fn upsert_product(conn: &mut Connection, payload: &ProductPayload) -> Result<Applied> {
    let fields = payload.to_upsert();
    let tx = conn.transaction()?;

    let existing = queries::get_product_by_external_id(&tx, &fields.external_id)?;
    let (product_id, created) = match existing {
        None => (queries::insert_product(&tx, &fields)?.id, true),
        Some(product) => {
            queries::update_product(&tx, &product.id, &fields)?;
            (product.id, false)
        }
    };

    for variant in payload.variant_upserts() {
        queries::upsert_variant(&tx, &product_id, &variant)?;
    }
    queries::replace_options(&tx, &product_id, &payload.option_upserts())?;
    queries::replace_media(&tx, &product_id, &payload.media_upserts())?;

    tx.commit()?;

    Ok(if created {
        Applied::ProductCreated { id: product_id }
    } else {
        Applied::ProductUpdated { id: product_id }
    })
}

fn upsert_collection(conn: &mut Connection, payload: &CollectionPayload) -> Result<Applied> {
    let fields = payload.to_upsert();

    let existing = queries::get_collection_by_external_id(conn, &fields.external_id)?;
    match existing {
        None => {
            let collection = queries::insert_collection(conn, &fields)?;
            Ok(Applied::CollectionCreated { id: collection.id })
        }
        Some(collection) => {
            queries::update_collection(conn, &collection.id, &fields)?;
            Ok(Applied::CollectionUpdated { id: collection.id })
        }
    }
}
