//! MCP registry client: a `RegistryClient` hitting `${registry_url}/servers`
//! over HTTP, following `next_cursor`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::DirectoryError;

use super::config::ImportConfig;
use super::fetcher::{FetchPage, RegistryClient};

#[derive(Deserialize)]
struct ServersResponse {
    servers: Vec<serde_json::Value>,
    metadata: ResponseMetadata,
}

#[derive(Deserialize, Default)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

/// Talks to an MCP-compatible registry's `/servers` listing endpoint.
#[derive(Debug)]
pub struct McpRegistryClient {
    http: Client,
    base_url: String,
}

impl McpRegistryClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        McpRegistryClient {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RegistryClient for McpRegistryClient {
    async fn fetch_page(
        &self,
        config: &ImportConfig,
        cursor: Option<String>,
        page_size: usize,
    ) -> Result<FetchPage, DirectoryError> {
        config.validate_mcp_filters()?;

        let url = format!("{}/servers", self.base_url.trim_end_matches('/'));
        let mut request = self.http.get(&url).query(&[("limit", page_size.to_string())]);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        for (key, value) in &config.filters {
            if key == "limit" || key == "cursor" {
                continue;
            }
            request = request.query(&[(key.as_str(), value.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|err| DirectoryError::transient(format!("mcp registry request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(DirectoryError::transient(format!(
                "mcp registry returned status {}",
                response.status()
            )));
        }

        let body: ServersResponse = response
            .json()
            .await
            .map_err(|err| DirectoryError::transient(format!("mcp registry response malformed: {err}")))?;

        Ok(FetchPage {
            items: body.servers,
            next_cursor: body.metadata.next_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ImportConfig {
        ImportConfig {
            registry_type: "mcp".to_string(),
            registry_url: "https://registry.example".to_string(),
            filters: Default::default(),
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
    fn unsupported_filter_is_rejected_before_any_request() {
        let mut cfg = config();
        cfg.filters.insert("bogus".to_string(), "x".to_string());
        assert!(cfg.validate_mcp_filters().is_err());
    }

    #[test]
    fn response_shape_deserializes() {
        let raw = serde_json::json!({
            "servers": [{"name": "a"}],
            "metadata": {"next_cursor": "abc"}
        });
        let parsed: ServersResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.servers.len(), 1);
        assert_eq!(parsed.metadata.next_cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn missing_next_cursor_defaults_to_none() {
        let raw = serde_json::json!({
            "servers": [],
            "metadata": {}
        });
        let parsed: ServersResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.metadata.next_cursor, None);
    }
}
