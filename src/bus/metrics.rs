//! `BusMetrics`: monotonic counters and the active-subscriber gauge.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of bus-wide counters, taken at the moment `EventBus::metrics()`
/// is called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusMetrics {
    pub published_total: u64,
    pub delivered_total: u64,
    pub dropped_total: u64,
    pub active_subscribers: u64,
}

/// The live, atomically-updated counters backing `BusMetrics` snapshots.
#[derive(Debug, Default)]
pub(crate) struct BusCounters {
    published_total: AtomicU64,
    delivered_total: AtomicU64,
    dropped_total: AtomicU64,
}

impl BusCounters {
    pub(crate) fn record_published(&self) {
        self.published_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, active_subscribers: u64) -> BusMetrics {
        BusMetrics {
            published_total: self.published_total.load(Ordering::Relaxed),
            delivered_total: self.delivered_total.load(Ordering::Relaxed),
            dropped_total: self.dropped_total.load(Ordering::Relaxed),
            active_subscribers,
        }
    }
}
