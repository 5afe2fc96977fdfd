//! `EventBusConfig`: tunables for subscriber buffering and logging.

/// Configuration for an `EventBus` instance.
///
/// Defaults to a 256-slot per-subscriber buffer with both logging flags
/// off (logging every publish/drop is opt-in, since a busy bus can publish
/// thousands of events per second).
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Capacity of each subscriber's bounded buffer. Must be at least 1.
    pub subscriber_buffer_size: usize,
    /// Log (at info level) whenever a subscriber's buffer is full and an
    /// event is dropped for it.
    pub log_slow_consumers: bool,
    /// Log (at info level) every successful publish.
    pub log_published_events: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        EventBusConfig {
            subscriber_buffer_size: 256,
            log_slow_consumers: false,
            log_published_events: false,
        }
    }
}

impl EventBusConfig {
    /// Load from `DIRECTORY_BUS_*` environment variables, falling back to
    /// the default for any variable that is absent or fails to parse.
    /// Never panics: a malformed env var is logged and ignored.
    pub fn from_env() -> Self {
        let mut cfg = EventBusConfig::default();

        if let Ok(raw) = std::env::var("DIRECTORY_BUS_BUFFER_SIZE") {
            match raw.parse::<usize>() {
                Ok(n) if n >= 1 => cfg.subscriber_buffer_size = n,
                _ => tracing::warn!(value = %raw, "invalid DIRECTORY_BUS_BUFFER_SIZE, using default"),
            }
        }
        if let Ok(raw) = std::env::var("DIRECTORY_BUS_LOG_SLOW_CONSUMERS") {
            cfg.log_slow_consumers = parse_bool(&raw, "DIRECTORY_BUS_LOG_SLOW_CONSUMERS");
        }
        if let Ok(raw) = std::env::var("DIRECTORY_BUS_LOG_PUBLISHED") {
            cfg.log_published_events = parse_bool(&raw, "DIRECTORY_BUS_LOG_PUBLISHED");
        }

        cfg
    }
}

fn parse_bool(raw: &str, var_name: &str) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => true,
        "0" | "false" | "no" => false,
        _ => {
            tracing::warn!(value = %raw, var = var_name, "invalid boolean env var, defaulting to false");
            false
        }
    }
}
