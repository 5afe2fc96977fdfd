//! Safe Publisher: a panic-safe façade producers use to emit events
//! without knowing whether a bus is even configured.

use std::collections::HashMap;
use std::sync::Arc;

use crate::event::{Event, EventType};

use super::event_bus::EventBus;

/// Wraps an optional `EventBus` and exposes typed helpers for every event
/// kind. Each helper is a no-op if the bus is absent, and recovers from a
/// bus panic instead of propagating it into the caller's happy path.
#[derive(Clone, Default)]
pub struct SafePublisher {
    bus: Option<EventBus>,
}

impl SafePublisher {
    pub fn new(bus: EventBus) -> Self {
        SafePublisher { bus: Some(bus) }
    }

    pub fn disabled() -> Self {
        SafePublisher { bus: None }
    }

    fn emit(&self, event_type: EventType, resource_id: &str, labels: Vec<String>, metadata: HashMap<String, String>) {
        let Some(bus) = self.bus.clone() else {
            return;
        };
        let resource_id = resource_id.to_string();

        // publish() itself cannot panic on well-formed input, but the bus
        // may be user-extended in the future (custom loggers, etc.), so we
        // keep the recovery boundary here rather than assuming it never will.
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            match Event::new(event_type, resource_id, labels, metadata) {
                Ok(event) => {
                    if let Err(err) = bus.publish(event) {
                        tracing::debug!(error = %err, "safe publisher: publish failed, ignored");
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "safe publisher: refused to build malformed event");
                }
            }
        }));

        if outcome.is_err() {
            tracing::error!("safe publisher: recovered from a panic while publishing");
        }
    }

    pub fn record_pushed(&self, resource_id: &str) {
        self.emit(EventType::RecordPushed, resource_id, vec![], HashMap::new());
    }

    pub fn record_pulled(&self, resource_id: &str) {
        self.emit(EventType::RecordPulled, resource_id, vec![], HashMap::new());
    }

    pub fn record_deleted(&self, resource_id: &str) {
        self.emit(EventType::RecordDeleted, resource_id, vec![], HashMap::new());
    }

    pub fn record_published(&self, resource_id: &str, labels: Vec<String>) {
        self.emit(EventType::RecordPublished, resource_id, labels, HashMap::new());
    }

    pub fn record_unpublished(&self, resource_id: &str) {
        self.emit(EventType::RecordUnpublished, resource_id, vec![], HashMap::new());
    }

    pub fn sync_created(&self, sync_id: &str) {
        self.emit(EventType::SyncCreated, sync_id, vec![], HashMap::new());
    }

    pub fn sync_completed(&self, sync_id: &str) {
        self.emit(EventType::SyncCompleted, sync_id, vec![], HashMap::new());
    }

    pub fn sync_failed(&self, sync_id: &str, reason: &str) {
        let mut metadata = HashMap::new();
        metadata.insert("reason".to_string(), reason.to_string());
        self.emit(EventType::SyncFailed, sync_id, vec![], metadata);
    }

    pub fn record_signed(&self, resource_id: &str, signer: &str) {
        let mut metadata = HashMap::new();
        metadata.insert("signer".to_string(), signer.to_string());
        self.emit(EventType::RecordSigned, resource_id, vec![], metadata);
    }
}

/// Shared, cloneable handle producers stash in their own state, for call
/// sites that want the raw bus alongside `SafePublisher`.
pub type SharedBus = Option<Arc<EventBus>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::config::EventBusConfig;
    use crate::bus::subscription::EventFilter;

    #[tokio::test]
    async fn disabled_publisher_is_a_no_op() {
        let publisher = SafePublisher::disabled();
        publisher.record_pushed("cid1");
    }

    #[tokio::test]
    async fn enabled_publisher_delivers_to_subscribers() {
        let bus = EventBus::new(EventBusConfig::default());
        let mut sub = bus.subscribe(EventFilter::default()).unwrap();
        let publisher = SafePublisher::new(bus.clone());

        publisher.record_signed("cid1", "signer-a");
        bus.wait_for_async_publish().await;

        let event = sub.recv().await.unwrap();
        assert_eq!(event.event_type, EventType::RecordSigned);
        assert_eq!(event.metadata.get("signer"), Some(&"signer-a".to_string()));
    }
}
