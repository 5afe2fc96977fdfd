//! Directory service core: an in-process event bus with listen streams,
//! token-bucket rate limiting, panic recovery, and a bounded-concurrency
//! import pipeline.
//!
//! Persistence, content-addressing, record signing, and schema validation
//! are external collaborators — this crate only implements the Event Bus
//! / Listen Stream subsystem, the Import Pipeline, and the cross-cutting
//! admission-control and panic-recovery boundaries around them.
//!
//! ## Composition
//!
//! This is a library: wiring an `EventBus`, a `RateLimiter`, a `Store`
//! impl, and the `grpc` transport together into a running server is the
//! job of a binary crate's composition root, not this crate. In
//! particular:
//!
//! - `tracing_subscriber::fmt().init()` is never called here; the binary
//!   that embeds this crate owns subscriber setup.
//! - The importer registry (`import::ImporterRegistry`) starts empty;
//!   call `register` for each supported `registry_type` explicitly.

pub mod bus;
pub mod error;
pub mod event;
pub mod import;
pub mod listener;
pub mod panic_recovery;
pub mod rate_limit;
pub mod store;

#[cfg(feature = "grpc")]
pub mod transport;

pub use bus::{BusMetrics, ConsumerHandle, EventBus, EventBusConfig, EventFilter, SafePublisher, SubscriptionId};
pub use error::DirectoryError;
pub use event::{Event, EventType};
pub use listener::{ListenStep, ListenStream};
pub use rate_limit::{RateLimitConfig, RateLimiter, RequestContext};
pub use store::{Record, SearchPage, Store};
