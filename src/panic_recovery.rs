//! Panic Recovery: the per-call boundary that converts an unexpected
//! panic into a sanitized `Internal` error, logging full context
//! server-side.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use crate::error::DirectoryError;

/// Run `handler`, catching any panic and converting it to
/// `DirectoryError::Internal`. `method` and `client_id` are only used for
/// the server-side log line; neither reaches the client.
///
/// `handler` must be `UnwindSafe` in spirit even though we assert it here:
/// callers are request handlers that own their state for the duration of
/// one call, so a panic mid-call leaving that state half-updated is fine
/// to discard.
pub fn guard<T>(
    method: &str,
    client_id: Option<&str>,
    handler: impl FnOnce() -> Result<T, DirectoryError>,
) -> Result<T, DirectoryError> {
    match std::panic::catch_unwind(AssertUnwindSafe(handler)) {
        Ok(result) => result,
        Err(payload) => {
            let panic_value = panic_message(&payload);
            let backtrace = std::backtrace::Backtrace::force_capture();
            tracing::error!(
                panic_value = %panic_value,
                stack_trace = %backtrace,
                method = %method,
                client_id = client_id.unwrap_or(""),
                "panic recovered at request boundary"
            );
            Err(DirectoryError::Internal)
        }
    }
}

/// Same as `guard`, but for an async handler. `tokio::spawn` + `JoinHandle`
/// is the idiomatic way to observe a panic inside an `.await`-ing task
/// without `catch_unwind`, which cannot safely wrap a `Future` across
/// await points.
pub async fn guard_async<T, F>(
    method: &str,
    client_id: Option<&str>,
    handler: F,
) -> Result<T, DirectoryError>
where
    T: Send + 'static,
    F: std::future::Future<Output = Result<T, DirectoryError>> + Send + 'static,
{
    let method = method.to_string();
    let client_id = client_id.map(|s| s.to_string());

    match tokio::spawn(handler).await {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => {
            let panic_value = panic_message(join_err.into_panic().as_ref());
            tracing::error!(
                panic_value = %panic_value,
                method = %method,
                client_id = client_id.as_deref().unwrap_or(""),
                "panic recovered at request boundary"
            );
            Err(DirectoryError::Internal)
        }
        Err(join_err) => {
            // Task was cancelled (aborted), not panicked: propagate as
            // Cancelled rather than masking it as Internal.
            Err(DirectoryError::Cancelled(join_err.to_string()))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
