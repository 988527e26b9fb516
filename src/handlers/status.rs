//! Operator-facing read endpoints: health and sync status.

use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use chrono::{TimeZone, Utc};
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::AppError;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// How in-sync the catalog is with the payment platform, plus failures from
/// detached webhook mutations. This is the operator's drift signal: webhook
/// deliveries are acknowledged before their catalog writes complete, so write
/// failures only ever surface here and in the logs.
#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    pub total_publishable: i64,
    pub linked: i64,
    pub linked_percent: f64,
    pub last_linked_update: Option<String>,
    pub apply_failures: u64,
    pub last_apply_error: Option<String>,
}

pub async fn sync_status(
    State(state): State<AppState>,
) -> Result<Json<SyncStatusResponse>, AppError> {
    let conn = state.db.get()?;
    let status = queries::sync_status(&conn)?;

    let linked_percent = if status.total_publishable > 0 {
        (status.linked as f64) * 100.0 / (status.total_publishable as f64)
    } else {
        0.0
    };

    let last_linked_update = status
        .last_linked_update
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .map(|t| t.to_rfc3339());

    Ok(Json(SyncStatusResponse {
        total_publishable: status.total_publishable,
        linked: status.linked,
        linked_percent,
        last_linked_update,
        apply_failures: state.apply_failures.failure_count(),
        last_apply_error: state.apply_failures.last_error(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/sync/status", get(sync_status))
}
