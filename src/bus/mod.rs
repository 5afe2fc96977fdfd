//! Event Bus: in-process, fan-out publish/subscribe with per-subscriber
//! bounded buffers, filtering, and metrics.
//!
//! ## Architecture
//!
//! ```text
//! producer -> SafePublisher -> EventBus -> per-subscriber filter
//!                                        -> per-subscriber buffer -> ConsumerHandle
//! ```
//!
//! A slow consumer never blocks publishers or other subscribers: when a
//! subscriber's buffer is full, the newest event is dropped for that
//! subscriber only, and its drop counter (and the bus-wide `dropped_total`)
//! is incremented.

pub mod config;
pub mod event_bus;
pub mod metrics;
pub mod publisher;
pub mod subscription;

pub use config::EventBusConfig;
pub use event_bus::EventBus;
pub use metrics::BusMetrics;
pub use publisher::SafePublisher;
pub use subscription::{ConsumerHandle, EventFilter, SubscriptionId};
