//! Error taxonomy shared by the event bus, rate limiter, panic recovery, and
//! import pipeline. One enum, one place to map onto transport-level status
//! codes.

use thiserror::Error;

/// Errors that can cross a component boundary and reach a caller.
///
/// `Capacity` (buffer-full drops) is deliberately absent here: per the bus
/// contract it is never surfaced to a publisher, only counted in
/// `BusMetrics::dropped_total` and the subscription's own drop counter.
#[derive(Debug, Error, Clone)]
pub enum DirectoryError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("transient error: {0}")]
    Transient(String),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("bus closed")]
    BusClosed,

    #[error("internal server error")]
    Internal,
}

impl DirectoryError {
    /// `Display` for the rate-limit variant always contains this substring,
    /// so callers can detect it in transports that don't preserve the variant.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, DirectoryError::RateLimited)
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        DirectoryError::Validation(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        DirectoryError::Transient(msg.into())
    }
}

#[cfg(feature = "grpc")]
impl From<DirectoryError> for tonic::Status {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Validation(msg) => tonic::Status::invalid_argument(msg),
            DirectoryError::Transient(msg) => tonic::Status::unavailable(msg),
            DirectoryError::RateLimited => {
                tonic::Status::resource_exhausted("rate limit exceeded")
            }
            DirectoryError::Cancelled(cause) => tonic::Status::cancelled(cause),
            DirectoryError::BusClosed => tonic::Status::failed_precondition("bus closed"),
            DirectoryError::Internal => tonic::Status::internal("internal server error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_message_contains_substring() {
        let err = DirectoryError::RateLimited;
        assert!(err.to_string().contains("rate limit"));
        assert!(err.is_rate_limited());
    }

    #[test]
    fn internal_message_is_exact() {
        let err = DirectoryError::Internal;
        assert_eq!(err.to_string(), "internal server error");
    }
}
