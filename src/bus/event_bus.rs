//! The in-process fan-out event bus.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::Notify;

use crate::error::DirectoryError;
use crate::event::Event;

use super::config::EventBusConfig;
use super::metrics::{BusCounters, BusMetrics};
use super::subscription::{ConsumerHandle, EventFilter, SubscriptionCounters, SubscriptionId, Subscriber};

/// In-memory, fan-out publish/subscribe core.
///
/// Cheap to clone (internals are `Arc`-backed); typically constructed once
/// and shared via `Arc<EventBus>` or handed out by `clone()`.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

struct Inner {
    config: EventBusConfig,
    subscribers: DashMap<SubscriptionId, Subscriber>,
    next_id: AtomicU64,
    counters: BusCounters,
    closed: AtomicBool,
    /// Bumped after each dispatch loop completes; `wait_for_async_publish`
    /// polls this instead of holding a lock across the whole dispatch.
    dispatch_generation: AtomicU64,
    dispatch_done: Notify,
}

impl EventBus {
    pub fn new(config: EventBusConfig) -> Self {
        EventBus {
            inner: Arc::new(Inner {
                config,
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(1),
                counters: BusCounters::default(),
                closed: AtomicBool::new(false),
                dispatch_generation: AtomicU64::new(0),
                dispatch_done: Notify::new(),
            }),
        }
    }

    /// Validate and dispatch `event` to every matching, active subscriber.
    /// Returns as soon as the event has been validated and handed to the
    /// dispatch task; never waits for delivery to complete.
    pub fn publish(&self, event: Event) -> Result<(), DirectoryError> {
        event.validate()?;

        if self.inner.closed.load(Ordering::Acquire) {
            return Err(DirectoryError::BusClosed);
        }

        self.inner.counters.record_published();
        if self.inner.config.log_published_events {
            tracing::info!(event_id = %event.id, event_type = %event.event_type, "event published");
        } else {
            tracing::trace!(event_id = %event.id, event_type = %event.event_type, "event published");
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            dispatch(&inner, &event).await;
            inner.dispatch_generation.fetch_add(1, Ordering::AcqRel);
            inner.dispatch_done.notify_waiters();
        });

        Ok(())
    }

    /// Register a new subscription. Fails with `BusClosed` after shutdown.
    pub fn subscribe(&self, filter: EventFilter) -> Result<ConsumerHandle, DirectoryError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(DirectoryError::BusClosed);
        }

        let id = SubscriptionId::next(&self.inner.next_id);
        let (tx, rx) = mpsc::channel(self.inner.config.subscriber_buffer_size);
        let counters = Arc::new(SubscriptionCounters::default());

        self.inner.subscribers.insert(
            id,
            Subscriber {
                filter,
                sender: tx,
                counters: counters.clone(),
            },
        );

        tracing::info!(subscription_id = %id, "subscription created");

        Ok(ConsumerHandle {
            id,
            receiver: rx,
            counters,
        })
    }

    /// Idempotent: terminates the subscription so its `ConsumerHandle`
    /// reaches end-of-stream in finite time. Safe to call from any task.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if self.inner.subscribers.remove(&id).is_some() {
            tracing::info!(subscription_id = %id, "subscription removed");
        }
    }

    pub fn metrics(&self) -> BusMetrics {
        self.inner
            .counters
            .snapshot(self.inner.subscribers.len() as u64)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Test/diagnostic hook: block until every dispatch started before this
    /// call returns has been attempted against every subscriber.
    pub async fn wait_for_async_publish(&self) {
        let target = self.inner.dispatch_generation.load(Ordering::Acquire);
        // A publish bumps the generation once its dispatch finishes; if no
        // dispatch is in flight the generation is already at or past any
        // prior publish, so this is a no-op in the common case.
        loop {
            let notified = self.inner.dispatch_done.notified();
            if self.inner.dispatch_generation.load(Ordering::Acquire) > target {
                return;
            }
            tokio::select! {
                _ = notified => return,
                _ = tokio::time::sleep(std::time::Duration::from_millis(5)) => {
                    if self.inner.dispatch_generation.load(Ordering::Acquire) > target {
                        return;
                    }
                }
            }
        }
    }

    /// Mark the bus closed. Existing subscriptions drain whatever is
    /// already buffered and then end; new `publish`/`subscribe` calls fail.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.subscribers.clear();
        tracing::info!("event bus shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

async fn dispatch(inner: &Inner, event: &Event) {
    for entry in inner.subscribers.iter() {
        let (id, subscriber) = (entry.key(), entry.value());

        // Each subscriber is dispatched inside its own panic guard: one
        // misbehaving filter must not stop delivery to the rest.
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            if !subscriber.filter.matches(event) {
                return None;
            }
            // try_send drops the newest event (this one) and keeps any
            // already-queued events when the buffer is full, matching the
            // chosen "drop newest" policy.
            Some(subscriber.sender.try_send(event.clone()))
        }));

        match outcome {
            Ok(None) => {}
            Ok(Some(Ok(()))) => {
                subscriber.counters.record_delivered();
                inner.counters.record_delivered();
            }
            Ok(Some(Err(mpsc::error::TrySendError::Full(_)))) => {
                subscriber.counters.record_dropped();
                inner.counters.record_dropped();
                if inner.config.log_slow_consumers {
                    tracing::info!(subscription_id = %id, event_id = %event.id, "subscriber buffer full, event dropped");
                } else {
                    tracing::debug!(subscription_id = %id, event_id = %event.id, "subscriber buffer full, event dropped");
                }
            }
            Ok(Some(Err(mpsc::error::TrySendError::Closed(_)))) => {
                // Consumer dropped its handle without calling
                // unsubscribe; nothing to count, the entry will be
                // reaped on the next explicit unsubscribe/shutdown.
            }
            Err(_) => {
                tracing::error!(subscription_id = %id, event_id = %event.id, "panic while dispatching to subscriber, skipped");
            }
        }
    }
}
