//! Import Pipeline: Fetcher → Transformer → Pusher, wired into a single
//! `run_import` entry point.

pub mod config;
pub mod fetcher;
pub mod mcp;
pub mod pusher;
pub mod registry;
pub mod result;
pub mod transformer;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::DirectoryError;
use crate::store::Store;

pub use config::{ImportConfig, DEFAULT_CONCURRENCY, DEFAULT_PAGE_SIZE};
pub use fetcher::{FetchPage, RegistryClient};
pub use mcp::McpRegistryClient;
pub use pusher::{DedupCache, MCP_MODULE_TAG};
pub use registry::{ImporterConstructor, ImporterRegistry};
pub use result::{ImportResult, ResultAccumulator};
pub use transformer::{Enricher, Suggestion, TransformFn, ENRICHMENT_CONFIDENCE_THRESHOLD, ENRICHMENT_DEADLINE};

/// Channel capacity between pipeline stages.
const STAGE_CHANNEL_CAPACITY: usize = 64;

/// Run one import end to end: paginate the registry, transform + optionally
/// enrich each item, then push (or, for a dry run, discard) the result.
///
/// Per-item failures at any stage are isolated into `ImportResult.errors`
/// and do not abort the run; only a fetch-level error or cancellation
/// short-circuits the whole pipeline.
pub async fn run_import(
    config: ImportConfig,
    registry_client: Arc<dyn RegistryClient>,
    store: Arc<dyn Store>,
    enricher: Option<Arc<dyn Enricher>>,
    transform: TransformFn,
    cancellation: CancellationToken,
) -> Result<ImportResult, DirectoryError> {
    config.validate()?;

    let accumulator = Arc::new(ResultAccumulator::new());

    let mut channels = fetcher::spawn_fetcher(
        registry_client,
        config.clone(),
        cancellation.clone(),
        STAGE_CHANNEL_CAPACITY,
    );

    let error_drain = {
        let accumulator = accumulator.clone();
        tokio::spawn(async move {
            while let Some(err) = channels.errors.recv().await {
                tracing::debug!(error = %err, "import: fetch stage reported an error");
                accumulator.record_failed(err);
            }
        })
    };

    let transformed = transformer::spawn_transformer(
        channels.items,
        transform,
        enricher,
        config.enrich,
        config.effective_concurrency(),
        accumulator.clone(),
        STAGE_CHANNEL_CAPACITY,
    );

    if config.dry_run {
        pusher::run_dry_run_drain(transformed).await;
    } else {
        let dedup = if config.force {
            DedupCache::empty()
        } else {
            DedupCache::build(store.as_ref(), MCP_MODULE_TAG).await?
        };
        pusher::run_pusher(
            transformed,
            store,
            Arc::new(dedup),
            config.force,
            config.debug,
            accumulator.clone(),
        )
        .await;
    }

    let _ = error_drain.await;

    Ok(accumulator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, Record};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct SinglePageClient {
        items: Vec<serde_json::Value>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RegistryClient for SinglePageClient {
        async fn fetch_page(
            &self,
            _config: &ImportConfig,
            _cursor: Option<String>,
            _page_size: usize,
        ) -> Result<FetchPage, DirectoryError> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            if idx == 0 {
                Ok(FetchPage { items: self.items.clone(), next_cursor: None })
            } else {
                Ok(FetchPage { items: vec![], next_cursor: None })
            }
        }
    }

    fn config(dry_run: bool, force: bool) -> ImportConfig {
        ImportConfig {
            registry_type: "mcp".to_string(),
            registry_url: "https://registry.example".to_string(),
            filters: HashMap::new(),
            limit: 0,
            concurrency: 0,
            dry_run,
            force,
            debug: false,
            enrich: false,
            enricher_config: None,
        }
    }

    fn transform() -> TransformFn {
        Arc::new(|item: serde_json::Value| {
            let name = item["name"].as_str().unwrap_or_default().to_string();
            Ok(Record {
                name,
                version: "1.0".to_string(),
                skills: vec![],
                domains: vec![],
                metadata: HashMap::new(),
            })
        })
    }

    #[tokio::test]
    async fn end_to_end_import_pushes_new_records() {
        let client = Arc::new(SinglePageClient {
            items: vec![
                serde_json::json!({"name": "svc-a"}),
                serde_json::json!({"name": "svc-b"}),
            ],
            calls: AtomicUsize::new(0),
        });
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());

        let result = run_import(
            config(false, false),
            client,
            store.clone(),
            None,
            transform(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.total_records, 2);
        assert_eq!(result.imported_count, 2);
        assert_eq!(result.failed_count, 0);
    }

    #[tokio::test]
    async fn dry_run_does_not_touch_the_store() {
        let client = Arc::new(SinglePageClient {
            items: vec![serde_json::json!({"name": "svc-a"})],
            calls: AtomicUsize::new(0),
        });
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());

        let result = run_import(
            config(true, false),
            client,
            store.clone(),
            None,
            transform(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.total_records, 1);
        assert_eq!(result.imported_count, 0);
    }
}
