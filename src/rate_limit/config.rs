//! `RateLimitConfig`: global, per-client, and per-method token-bucket
//! parameters.

use std::collections::HashMap;

/// `rps = 0` means "no limiter applied" at that tier.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub global_rps: u32,
    pub global_burst: u32,
    pub per_client_rps: u32,
    pub per_client_burst: u32,
    pub method_limits: HashMap<String, (u32, u32)>,
    /// Bound on the number of distinct client/method limiter keys retained.
    /// `0` means unbounded, since identities are normally bounded by issued
    /// credentials; operators expecting unbounded identities should set this.
    pub max_tracked_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            enabled: false,
            global_rps: 0,
            global_burst: 0,
            per_client_rps: 0,
            per_client_burst: 0,
            method_limits: HashMap::new(),
            max_tracked_clients: 0,
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let mut cfg = RateLimitConfig::default();

        if let Ok(raw) = std::env::var("DIRECTORY_RATE_LIMIT_ENABLED") {
            cfg.enabled = matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        cfg.global_rps = env_u32("DIRECTORY_RATE_LIMIT_GLOBAL_RPS", cfg.global_rps);
        cfg.global_burst = env_u32("DIRECTORY_RATE_LIMIT_GLOBAL_BURST", cfg.global_burst);
        cfg.per_client_rps = env_u32("DIRECTORY_RATE_LIMIT_CLIENT_RPS", cfg.per_client_rps);
        cfg.per_client_burst = env_u32("DIRECTORY_RATE_LIMIT_CLIENT_BURST", cfg.per_client_burst);

        cfg
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    match std::env::var(name) {
        Ok(raw) => raw.parse::<u32>().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %raw, "invalid u32 env var, using default");
            default
        }),
        Err(_) => default,
    }
}
