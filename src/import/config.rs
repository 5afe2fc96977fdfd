//! `ImportConfig`: one run's worth of import pipeline parameters.

use std::collections::HashMap;

use crate::error::DirectoryError;

/// Default Transformer worker count when `concurrency` is 0 or negative.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default registry page size, kept independent of the caller-facing
/// `limit` so pagination doesn't have to track an external request size.
pub const DEFAULT_PAGE_SIZE: usize = 30;

#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub registry_type: String,
    pub registry_url: String,
    pub filters: HashMap<String, String>,
    /// 0 means no limit on total items fetched.
    pub limit: usize,
    /// Transformer worker count; 0 falls back to `DEFAULT_CONCURRENCY`.
    pub concurrency: usize,
    pub dry_run: bool,
    pub force: bool,
    pub debug: bool,
    pub enrich: bool,
    pub enricher_config: Option<String>,
}

impl ImportConfig {
    /// `concurrency > 0` is enforced elsewhere; this is the cheap,
    /// programmer-facing sanity check run before a registry client is built.
    pub fn validate(&self) -> Result<(), DirectoryError> {
        if self.registry_type.is_empty() {
            return Err(DirectoryError::validation("registry_type must not be empty"));
        }
        if self.registry_url.is_empty() {
            return Err(DirectoryError::validation("registry_url must not be empty"));
        }
        Ok(())
    }

    /// Effective worker count after applying the documented default.
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency == 0 {
            DEFAULT_CONCURRENCY
        } else {
            self.concurrency
        }
    }

    /// MCP filters supported by the registry protocol.
    /// Unknown keys fail fast.
    pub fn validate_mcp_filters(&self) -> Result<(), DirectoryError> {
        const SUPPORTED: &[&str] = &["search", "version", "updated_since", "limit", "cursor"];
        for key in self.filters.keys() {
            if !SUPPORTED.contains(&key.as_str()) {
                return Err(DirectoryError::validation(format!(
                    "unsupported filter key: {key}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ImportConfig {
        ImportConfig {
            registry_type: "mcp".to_string(),
            registry_url: "https://registry.example".to_string(),
            filters: HashMap::new(),
            limit: 0,
            concurrency: 0,
            dry_run: false,
            force: false,
            debug: false,
            enrich: false,
            enricher_config: None,
        }
    }

    #[test]
    fn concurrency_zero_defaults_to_five() {
        assert_eq!(base_config().effective_concurrency(), DEFAULT_CONCURRENCY);
    }

    #[test]
    fn validate_rejects_empty_registry_type() {
        let mut config = base_config();
        config.registry_type.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_filter_key_fails_fast() {
        let mut config = base_config();
        config.filters.insert("bogus".to_string(), "x".to_string());
        assert!(config.validate_mcp_filters().is_err());
    }
}
