//! Pusher: dedup-aware sequential writes into the `Store`, plus the
//! Pusher Dedup Cache and the dry-run drain variant.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::DirectoryError;
use crate::store::{Record, Store};

use super::result::ResultAccumulator;

/// Batch size for the dedup cache's paginated search over existing
/// records, and the safety ceiling on total records scanned.
const DEDUP_BATCH_SIZE: usize = 1000;
const DEDUP_SAFETY_CEILING: usize = 50_000;

/// The module tag existing MCP-imported records are searched under.
pub const MCP_MODULE_TAG: &str = "integration/mcp";

/// Name-and-version set used to skip already-stored records during import.
/// Built once at construction, then read-only during push.
pub struct DedupCache {
    keys: HashSet<String>,
}

impl DedupCache {
    pub fn empty() -> Self {
        DedupCache { keys: HashSet::new() }
    }

    /// Enumerate existing records under `module_tag` via paginated search
    /// and populate the set from each record's `name@version`.
    pub async fn build(store: &dyn Store, module_tag: &str) -> Result<Self, DirectoryError> {
        let mut keys = HashSet::new();
        let mut cursor = None;
        let mut scanned = 0usize;

        loop {
            let page = store.search(module_tag, cursor, DEDUP_BATCH_SIZE).await?;
            for record in &page.records {
                keys.insert(record.dedup_key());
            }
            scanned += page.records.len();
            if scanned >= DEDUP_SAFETY_CEILING {
                tracing::warn!(scanned, "dedup cache: hit safety ceiling, stopping early");
                break;
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(DedupCache { keys })
    }

    pub fn contains(&self, record: &Record) -> bool {
        self.keys.contains(&record.dedup_key())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Drain `input` sequentially, pushing each record unless it's a dedup hit
/// (and `force` is false). One unary write at a time: the store's
/// streaming push terminates on first validation failure, so this is how
/// per-record isolation is achieved.
pub async fn run_pusher(
    mut input: mpsc::Receiver<Record>,
    store: Arc<dyn Store>,
    dedup: Arc<DedupCache>,
    force: bool,
    debug: bool,
    accumulator: Arc<ResultAccumulator>,
) {
    while let Some(record) = input.recv().await {
        if !force && dedup.contains(&record) {
            if debug {
                tracing::info!(key = %record.dedup_key(), "pusher: skipped duplicate");
            } else {
                tracing::debug!(key = %record.dedup_key(), "pusher: skipped duplicate");
            }
            continue;
        }

        match store.push(&record).await {
            Ok(reference) => {
                accumulator.record_imported();
                tracing::debug!(reference = %reference, "pusher: pushed record");
            }
            Err(err) => {
                if debug {
                    tracing::info!(error = %err, key = %record.dedup_key(), "pusher: push failed");
                }
                accumulator.record_failed(err);
            }
        }
    }
}

/// Dry-run variant: counts and discards transformed records without
/// touching the store.
pub async fn run_dry_run_drain(mut input: mpsc::Receiver<Record>) {
    while input.recv().await.is_some() {
        // Counting already happened in the Transformer stage
        // (`ResultAccumulator::record_total`); nothing left to do here.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use std::collections::HashMap;

    fn record(name: &str, version: &str) -> Record {
        Record {
            name: name.to_string(),
            version: version.to_string(),
            skills: vec![],
            domains: vec![],
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn s6_dedup_skips_preexisting_records() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let mut seeded = HashSet::new();
        seeded.insert("svc-a@1.0".to_string());
        seeded.insert("svc-b@2.0".to_string());
        let dedup = Arc::new(DedupCache { keys: seeded });

        let (tx, rx) = mpsc::channel(8);
        tx.send(record("svc-a", "1.0")).await.unwrap();
        tx.send(record("svc-b", "2.1")).await.unwrap();
        tx.send(record("svc-c", "0.1")).await.unwrap();
        drop(tx);

        let accumulator = Arc::new(ResultAccumulator::new());
        accumulator.record_total();
        accumulator.record_total();
        accumulator.record_total();

        run_pusher(rx, store.clone(), dedup, false, false, accumulator.clone()).await;

        let result = accumulator.finish();
        assert_eq!(result.total_records, 3);
        assert_eq!(result.imported_count, 2);
        assert_eq!(result.failed_count, 0);
        assert_eq!(result.skipped_count, 1);
    }

    #[tokio::test]
    async fn force_bypasses_dedup() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let mut seeded = HashSet::new();
        seeded.insert("svc-a@1.0".to_string());
        let dedup = Arc::new(DedupCache { keys: seeded });

        let (tx, rx) = mpsc::channel(8);
        tx.send(record("svc-a", "1.0")).await.unwrap();
        drop(tx);

        let accumulator = Arc::new(ResultAccumulator::new());
        accumulator.record_total();
        run_pusher(rx, store, dedup, true, false, accumulator.clone()).await;

        assert_eq!(accumulator.finish().imported_count, 1);
    }

    #[tokio::test]
    async fn dedup_cache_builds_from_store_search() {
        let store = InMemoryStore::seed(vec![record("svc-a", "1.0"), record("svc-b", "2.0")]);
        let cache = DedupCache::build(&store, MCP_MODULE_TAG).await.unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&record("svc-a", "1.0")));
        assert!(!cache.contains(&record("svc-c", "0.1")));
    }
}
