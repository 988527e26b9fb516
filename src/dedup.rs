//! Time-bounded idempotency ledger for webhook deliveries.
//!
//! The upstream platform delivers at-least-once; this ledger lets the dispatcher
//! short-circuit replays without touching the catalog. It is a bounded-memory
//! safeguard, not a correctness guarantee: a redelivery arriving after the
//! retention window will be processed again, which the upsert engine tolerates.
//!
//! Expired entries are swept lazily at the top of each lookup, so no background
//! timer is needed. The clock is injected so retention behavior is testable.

use std::collections::HashMap;
use std::sync::Mutex;

/// Retention window for dedup records: 24 hours.
pub const DEFAULT_TTL_SECS: i64 = 24 * 60 * 60;

pub trait Clock: Send + Sync + 'static {
    /// Current Unix timestamp in seconds.
    fn now_ts(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now_ts(&self) -> i64 {
        (**self).now_ts()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ts(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[derive(Debug)]
struct DedupEntry {
    first_seen_at: i64,
    processed: bool,
}

/// Concurrent dedup ledger keyed by event id, falling back to delivery id.
pub struct DedupCache {
    ttl_secs: i64,
    clock: Box<dyn Clock>,
    entries: Mutex<HashMap<String, DedupEntry>>,
}

impl DedupCache {
    pub fn new(ttl_secs: i64, clock: impl Clock) -> Self {
        Self {
            ttl_secs,
            clock: Box::new(clock),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_system_clock(ttl_secs: i64) -> Self {
        Self::new(ttl_secs, SystemClock)
    }

    /// The dedup key for a delivery: the event id when present, else the
    /// delivery id. Deliveries carrying neither cannot be deduplicated and
    /// are rejected upstream of this cache by the event parser.
    fn key(event_id: Option<&str>, delivery_id: Option<&str>) -> Option<String> {
        event_id
            .filter(|s| !s.is_empty())
            .or(delivery_id.filter(|s| !s.is_empty()))
            .map(String::from)
    }

    /// Whether this delivery was already marked processed. Records a first
    /// sighting (unprocessed) for unknown keys so `first_seen_at` anchors the
    /// retention window at the initial delivery.
    pub fn is_duplicate(&self, event_id: Option<&str>, delivery_id: Option<&str>) -> bool {
        let Some(key) = Self::key(event_id, delivery_id) else {
            return false;
        };
        let now = self.clock.now_ts();
        let mut entries = self.entries.lock().unwrap();
        Self::sweep(&mut entries, now, self.ttl_secs);
        match entries.get(&key) {
            Some(entry) => entry.processed,
            None => {
                entries.insert(
                    key,
                    DedupEntry {
                        first_seen_at: now,
                        processed: false,
                    },
                );
                false
            }
        }
    }

    /// Mark a delivery processed so later redeliveries short-circuit.
    pub fn mark_processed(&self, event_id: Option<&str>, delivery_id: Option<&str>) {
        let Some(key) = Self::key(event_id, delivery_id) else {
            return;
        };
        let now = self.clock.now_ts();
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(key).or_insert(DedupEntry {
            first_seen_at: now,
            processed: false,
        });
        entry.processed = true;
    }

    /// Number of live (unswept) entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(entries: &mut HashMap<String, DedupEntry>, now: i64, ttl_secs: i64) {
        entries.retain(|_, entry| now - entry.first_seen_at < ttl_secs);
    }
}
