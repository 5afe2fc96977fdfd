//! Subscriptions: filters, ids, and the consumer-facing handle.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::mpsc;

use crate::event::Event;

/// Opaque, bus-assigned subscription identity, unique for the bus's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn next(counter: &AtomicU64) -> Self {
        SubscriptionId(counter.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A subscription's event filter. An empty set in any dimension matches
/// everything in that dimension.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_types: HashSet<crate::event::EventType>,
    pub label_any_of: HashSet<String>,
    pub cid_any_of: HashSet<String>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        let type_ok = self.event_types.is_empty() || self.event_types.contains(&event.event_type);
        let label_ok = self.label_any_of.is_empty()
            || event.labels.iter().any(|l| self.label_any_of.contains(l));
        let cid_ok = self.cid_any_of.is_empty() || self.cid_any_of.contains(&event.resource_id);
        type_ok && label_ok && cid_ok
    }
}

/// Per-subscription delivery/drop counters.
#[derive(Debug, Default)]
pub struct SubscriptionCounters {
    delivered: AtomicUsize,
    dropped: AtomicUsize,
}

impl SubscriptionCounters {
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Bus-side state for one subscriber. Owns the sending half of the bounded
/// channel the bus dispatches into; the matching `ConsumerHandle` owns the
/// receiving half.
pub(crate) struct Subscriber {
    pub(crate) filter: EventFilter,
    pub(crate) sender: mpsc::Sender<Event>,
    pub(crate) counters: std::sync::Arc<SubscriptionCounters>,
}

/// Consumer-side handle returned from `EventBus::subscribe`. Exactly one
/// task may drain it.
#[derive(Debug)]
pub struct ConsumerHandle {
    pub id: SubscriptionId,
    pub(crate) receiver: mpsc::Receiver<Event>,
    pub(crate) counters: std::sync::Arc<SubscriptionCounters>,
}

impl ConsumerHandle {
    /// Pull the next event, or `None` once the subscription is closed and
    /// drained (end-of-stream).
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    pub fn counters(&self) -> &SubscriptionCounters {
        &self.counters
    }
}
