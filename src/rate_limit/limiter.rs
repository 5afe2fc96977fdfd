//! Token-bucket admission control.

use std::num::NonZeroU32;
use std::sync::Arc;

use dashmap::DashMap;
use governor::{Quota, RateLimiter as GovernorLimiter};

use crate::error::DirectoryError;

use super::config::RateLimitConfig;

type DirectLimiter = GovernorLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Identifies one per-key limiter: either the global bucket, a per-client
/// bucket, or a per-`(client, method)` bucket when a method override is
/// configured.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LimiterKey {
    Global,
    Client(String),
    ClientMethod(String, String),
}

/// What the caller needs to supply per incoming call.
pub struct RequestContext<'a> {
    pub method: &'a str,
    /// Authenticated identity, empty if unauthenticated.
    pub client_id: &'a str,
}

/// Lazily-created, process-lifetime token buckets keyed by method override,
/// then client, then the global bucket. Creation races are resolved by
/// `DashMap::entry().or_insert`, which acts as compare-and-insert: only one
/// limiter survives per key.
pub struct RateLimiter {
    config: RateLimitConfig,
    limiters: DashMap<LimiterKey, Arc<DirectLimiter>>,
    global: Option<Arc<DirectLimiter>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let global = build_limiter(config.global_rps, config.global_burst);
        RateLimiter {
            config,
            limiters: DashMap::new(),
            global,
        }
    }

    /// Admission decision for one incoming call. Pure: the only side
    /// effect is consuming a token from the resolved bucket.
    pub fn check(&self, ctx: RequestContext<'_>) -> Result<(), DirectoryError> {
        if !self.config.enabled {
            return Ok(());
        }

        if let Some(&(rps, burst)) = self.config.method_limits.get(ctx.method) {
            let key = LimiterKey::ClientMethod(ctx.client_id.to_string(), ctx.method.to_string());
            return self.check_keyed(key, rps, burst);
        }

        if !ctx.client_id.is_empty() && self.config.per_client_rps > 0 {
            let key = LimiterKey::Client(ctx.client_id.to_string());
            return self.check_keyed(key, self.config.per_client_rps, self.config.per_client_burst);
        }

        match &self.global {
            Some(limiter) => allow(limiter),
            None => Ok(()),
        }
    }

    fn check_keyed(&self, key: LimiterKey, rps: u32, burst: u32) -> Result<(), DirectoryError> {
        let Some(limiter) = build_limiter(rps, burst) else {
            return Ok(());
        };

        self.evict_if_needed();

        let entry = self
            .limiters
            .entry(key)
            .or_insert_with(|| limiter)
            .clone();
        allow(&entry)
    }

    /// Best-effort bound on the limiter map. Evicts an arbitrary entry once
    /// the configured ceiling is exceeded; `0` (the default) disables this
    /// entirely.
    fn evict_if_needed(&self) {
        let cap = self.config.max_tracked_clients;
        if cap == 0 || self.limiters.len() < cap {
            return;
        }
        if let Some(victim) = self.limiters.iter().next().map(|e| e.key().clone()) {
            self.limiters.remove(&victim);
        }
    }
}

fn build_limiter(rps: u32, burst: u32) -> Option<Arc<DirectLimiter>> {
    if rps == 0 {
        return None;
    }
    let rps = NonZeroU32::new(rps)?;
    let burst = NonZeroU32::new(burst.max(1)).unwrap_or(rps);
    let quota = Quota::per_second(rps).allow_burst(burst);
    Some(Arc::new(GovernorLimiter::direct(quota)))
}

fn allow(limiter: &DirectLimiter) -> Result<(), DirectoryError> {
    match limiter.check() {
        Ok(()) => {
            tracing::debug!("rate limit: allowed");
            Ok(())
        }
        Err(_) => {
            tracing::debug!("rate limit: denied");
            Err(DirectoryError::RateLimited)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_always_allows() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        for _ in 0..10 {
            assert!(limiter
                .check(RequestContext { method: "Listen", client_id: "" })
                .is_ok());
        }
    }

    #[test]
    fn global_bucket_exhausts_then_recovers_on_idle() {
        let mut config = RateLimitConfig::default();
        config.enabled = true;
        config.global_rps = 100;
        config.global_burst = 5;
        let limiter = RateLimiter::new(config);

        let mut successes = 0;
        let mut rejections = 0;
        for _ in 0..250 {
            match limiter.check(RequestContext { method: "Listen", client_id: "" }) {
                Ok(()) => successes += 1,
                Err(err) => {
                    assert!(err.to_string().contains("rate limit"));
                    rejections += 1;
                }
            }
        }
        assert!(successes >= 1);
        assert!(rejections >= 1);

        std::thread::sleep(std::time::Duration::from_millis(100));
        assert!(limiter
            .check(RequestContext { method: "Listen", client_id: "" })
            .is_ok());
    }

    #[test]
    fn method_override_takes_precedence_over_per_client() {
        let mut config = RateLimitConfig::default();
        config.enabled = true;
        config.per_client_rps = 1000;
        config.per_client_burst = 1000;
        config.method_limits.insert("Import".to_string(), (1, 1));
        let limiter = RateLimiter::new(config);

        assert!(limiter
            .check(RequestContext { method: "Import", client_id: "client-a" })
            .is_ok());
        assert!(limiter
            .check(RequestContext { method: "Import", client_id: "client-a" })
            .is_err());
    }

    #[test]
    fn distinct_clients_get_distinct_buckets() {
        let mut config = RateLimitConfig::default();
        config.enabled = true;
        config.per_client_rps = 1;
        config.per_client_burst = 1;
        let limiter = RateLimiter::new(config);

        assert!(limiter
            .check(RequestContext { method: "Listen", client_id: "a" })
            .is_ok());
        assert!(limiter
            .check(RequestContext { method: "Listen", client_id: "b" })
            .is_ok());
        assert!(limiter
            .check(RequestContext { method: "Listen", client_id: "a" })
            .is_err());
    }
}
