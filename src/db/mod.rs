mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::dedup::DedupCache;
use crate::sync::ApplyFailureSink;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Catalog database pool
    pub db: DbPool,
    /// Shared secret for inbound webhook signatures.
    /// None = fatal configuration error, every delivery gets a 500.
    pub webhook_secret: Option<String>,
    /// Idempotency ledger for webhook deliveries
    pub dedup: Arc<DedupCache>,
    /// Failures from detached catalog mutations, surfaced in /sync/status
    pub apply_failures: Arc<ApplyFailureSink>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
