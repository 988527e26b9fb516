pub mod apply;
pub mod reconcile;

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Collects failures from detached catalog mutations.
///
/// The dispatcher acknowledges a delivery before its catalog write finishes,
/// so a failed write has nowhere to report but the logs. This sink keeps the
/// count and the most recent error so /sync/status can surface them to
/// operators.
#[derive(Debug, Default)]
pub struct ApplyFailureSink {
    failures: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl ApplyFailureSink {
    pub fn record(&self, context: &str, err: &dyn std::fmt::Display) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock().unwrap() = Some(format!("{}: {}", context, err));
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }
}
