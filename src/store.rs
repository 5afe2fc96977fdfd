//! The canonical record shape and the `Store` collaborator the importer
//! pushes into. Persistence, content-addressing, and schema validation are
//! out of scope — `Store` is the narrow seam the
//! pipeline needs, with an in-memory fake for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::DirectoryError;

/// A canonical, content-addressed description of an agent, as produced by
/// the Transformer stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub version: String,
    pub skills: Vec<String>,
    pub domains: Vec<String>,
    pub metadata: HashMap<String, String>,
}

impl Record {
    /// The `name@version` key used by the dedup cache.
    pub fn dedup_key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// One page of a paginated store search.
pub struct SearchPage {
    pub records: Vec<Record>,
    pub next_cursor: Option<String>,
}

/// The local store's push/search surface, as seen by the import pipeline.
#[async_trait]
pub trait Store: Send + Sync {
    /// Unary write; returns an opaque reference (e.g. a CID) on success.
    async fn push(&self, record: &Record) -> Result<String, DirectoryError>;

    /// One page of existing records tagged with `module_tag`.
    async fn search(
        &self,
        module_tag: &str,
        cursor: Option<String>,
        batch_size: usize,
    ) -> Result<SearchPage, DirectoryError>;
}

/// In-memory `Store` fake for tests and dry runs without a real backend.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<Vec<Record>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    pub fn seed(records: Vec<Record>) -> Self {
        InMemoryStore {
            records: Mutex::new(records),
        }
    }

    pub fn pushed(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn push(&self, record: &Record) -> Result<String, DirectoryError> {
        let mut records = self.records.lock().unwrap();
        records.push(record.clone());
        Ok(record.dedup_key())
    }

    async fn search(
        &self,
        _module_tag: &str,
        cursor: Option<String>,
        batch_size: usize,
    ) -> Result<SearchPage, DirectoryError> {
        let records = self.records.lock().unwrap();
        let start: usize = cursor.as_deref().and_then(|c| c.parse().ok()).unwrap_or(0);
        let end = (start + batch_size).min(records.len());
        let page = records[start.min(records.len())..end].to_vec();
        let next_cursor = if end < records.len() {
            Some(end.to_string())
        } else {
            None
        };
        Ok(SearchPage {
            records: page,
            next_cursor,
        })
    }
}
