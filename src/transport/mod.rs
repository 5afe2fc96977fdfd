//! Wire transports for the directory service's in-process components.

#[cfg(feature = "grpc")]
pub mod grpc;
