//! Token-bucket admission control at the request boundary.

pub mod config;
pub mod limiter;

pub use config::RateLimitConfig;
pub use limiter::{RateLimiter, RequestContext};
