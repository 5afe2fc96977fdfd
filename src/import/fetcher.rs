//! Fetcher: paginates an external registry into a buffered channel of
//! opaque source items.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::DirectoryError;

use super::config::{ImportConfig, DEFAULT_PAGE_SIZE};

/// One page of raw, opaque source items plus the cursor for the next page.
pub struct FetchPage {
    pub items: Vec<serde_json::Value>,
    pub next_cursor: Option<String>,
}

/// Pluggable registry client: the thing a `registry_type` resolves to via
/// the importer registry.
#[async_trait]
pub trait RegistryClient: Send + Sync + std::fmt::Debug {
    async fn fetch_page(
        &self,
        config: &ImportConfig,
        cursor: Option<String>,
        page_size: usize,
    ) -> Result<FetchPage, DirectoryError>;
}

/// Output of `spawn_fetcher`: a channel of source items and a channel of
/// per-page fetch errors, both closed when fetching ends.
pub struct FetchChannels {
    pub items: mpsc::Receiver<serde_json::Value>,
    pub errors: mpsc::Receiver<DirectoryError>,
}

/// Paginate `client`, honoring `config.limit` as a caller cap independent
/// of the fixed page size, and stopping early on cancellation.
pub fn spawn_fetcher(
    client: Arc<dyn RegistryClient>,
    config: ImportConfig,
    cancellation: CancellationToken,
    channel_capacity: usize,
) -> FetchChannels {
    let (item_tx, item_rx) = mpsc::channel(channel_capacity);
    let (err_tx, err_rx) = mpsc::channel(channel_capacity);

    tokio::spawn(async move {
        let mut cursor: Option<String> = None;
        let mut fetched = 0usize;

        loop {
            if cancellation.is_cancelled() {
                let _ = err_tx
                    .send(DirectoryError::Cancelled("fetch cancelled".to_string()))
                    .await;
                break;
            }

            let page = tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    let _ = err_tx.send(DirectoryError::Cancelled("fetch cancelled".to_string())).await;
                    break;
                }
                page = client.fetch_page(&config, cursor.clone(), DEFAULT_PAGE_SIZE) => page,
            };

            let page = match page {
                Ok(page) => page,
                Err(err) => {
                    tracing::debug!(error = %err, "fetcher: page fetch failed");
                    let _ = err_tx.send(err).await;
                    break;
                }
            };

            for item in page.items {
                if config.limit != 0 && fetched >= config.limit {
                    return;
                }
                // Backpressure: a full buffered channel makes the fetcher
                // work ahead only up to `channel_capacity`, then wait.
                tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => {
                        let _ = err_tx.send(DirectoryError::Cancelled("fetch cancelled".to_string())).await;
                        return;
                    }
                    send_result = item_tx.send(item) => {
                        if send_result.is_err() {
                            return;
                        }
                        fetched += 1;
                    }
                }
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
    });

    FetchChannels {
        items: item_rx,
        errors: err_rx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    #[derive(Debug)]
    struct FakeClient {
        pages: Vec<Vec<serde_json::Value>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RegistryClient for FakeClient {
        async fn fetch_page(
            &self,
            _config: &ImportConfig,
            _cursor: Option<String>,
            _page_size: usize,
        ) -> Result<FetchPage, DirectoryError> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            if idx >= self.pages.len() {
                return Ok(FetchPage { items: vec![], next_cursor: None });
            }
            let next_cursor = if idx + 1 < self.pages.len() {
                Some((idx + 1).to_string())
            } else {
                None
            };
            Ok(FetchPage {
                items: self.pages[idx].clone(),
                next_cursor,
            })
        }
    }

    fn config(limit: usize) -> ImportConfig {
        ImportConfig {
            registry_type: "mcp".to_string(),
            registry_url: "https://registry.example".to_string(),
            filters: Default::default(),
            limit,
            concurrency: 0,
            dry_run: false,
            force: false,
            debug: false,
            enrich: false,
            enricher_config: None,
        }
    }

    #[tokio::test]
    async fn paginates_until_cursor_is_empty() {
        let client = StdArc::new(FakeClient {
            pages: vec![
                vec![serde_json::json!({"name": "a"})],
                vec![serde_json::json!({"name": "b"}), serde_json::json!({"name": "c"})],
            ],
            calls: AtomicUsize::new(0),
        });
        let mut channels = spawn_fetcher(client, config(0), CancellationToken::new(), 8);

        let mut names = vec![];
        while let Some(item) = channels.items.recv().await {
            names.push(item["name"].as_str().unwrap().to_string());
        }
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn caller_limit_stops_early_independent_of_page_size() {
        let client = StdArc::new(FakeClient {
            pages: vec![vec![
                serde_json::json!({"name": "a"}),
                serde_json::json!({"name": "b"}),
                serde_json::json!({"name": "c"}),
            ]],
            calls: AtomicUsize::new(0),
        });
        let mut channels = spawn_fetcher(client, config(2), CancellationToken::new(), 8);

        let mut names = vec![];
        while let Some(item) = channels.items.recv().await {
            names.push(item["name"].as_str().unwrap().to_string());
        }
        assert_eq!(names.len(), 2);
    }

    #[tokio::test]
    async fn cancellation_emits_cancelled_error() {
        let client = StdArc::new(FakeClient {
            pages: vec![vec![serde_json::json!({"name": "a"})]],
            calls: AtomicUsize::new(0),
        });
        let token = CancellationToken::new();
        token.cancel();
        let mut channels = spawn_fetcher(client, config(0), token, 8);

        let err = channels.errors.recv().await.unwrap();
        assert!(matches!(err, DirectoryError::Cancelled(_)));
    }
}
