//! Transformer: a worker pool converting opaque source items into
//! canonical records, with per-record error isolation and optional
//! enrichment.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::error::DirectoryError;
use crate::store::Record;

use super::result::ResultAccumulator;

pub type TransformFn =
    Arc<dyn Fn(serde_json::Value) -> Result<Record, DirectoryError> + Send + Sync>;

/// A confidence-scored suggestion returned by the enrichment capability.
pub struct Suggestion {
    pub value: String,
    pub confidence: f64,
}

/// Minimum confidence for a suggestion to be merged into a record.
pub const ENRICHMENT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Per-call deadline for each enrichment invocation.
pub const ENRICHMENT_DEADLINE: Duration = Duration::from_secs(5 * 60);

/// External enrichment collaborator: best-effort, called twice per record
/// (skills, then domains), each under its own deadline.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn suggest_skills(&self, record: &Record) -> Result<Vec<Suggestion>, DirectoryError>;
    async fn suggest_domains(&self, record: &Record) -> Result<Vec<Suggestion>, DirectoryError>;
}

/// Apply enrichment to `record` in place. Enrichment failure (including
/// timeout) is fatal only for this record's enrichment step, not the
/// record itself: the transformer still forwards the (unenriched) record.
async fn enrich(record: &mut Record, enricher: &dyn Enricher) {
    record.skills.clear();
    record.domains.clear();

    match tokio::time::timeout(ENRICHMENT_DEADLINE, enricher.suggest_skills(record)).await {
        Ok(Ok(suggestions)) => merge_confident(&mut record.skills, suggestions),
        Ok(Err(err)) => tracing::debug!(error = %err, "enrichment: skills suggestion failed"),
        Err(_) => tracing::debug!("enrichment: skills suggestion timed out"),
    }

    match tokio::time::timeout(ENRICHMENT_DEADLINE, enricher.suggest_domains(record)).await {
        Ok(Ok(suggestions)) => merge_confident(&mut record.domains, suggestions),
        Ok(Err(err)) => tracing::debug!(error = %err, "enrichment: domains suggestion failed"),
        Err(_) => tracing::debug!("enrichment: domains suggestion timed out"),
    }
}

fn merge_confident(target: &mut Vec<String>, suggestions: Vec<Suggestion>) {
    for suggestion in suggestions {
        if suggestion.confidence >= ENRICHMENT_CONFIDENCE_THRESHOLD {
            target.push(suggestion.value);
        } else {
            tracing::debug!(
                value = %suggestion.value,
                confidence = suggestion.confidence,
                "enrichment: dropped low-confidence suggestion"
            );
        }
    }
}

/// Spawn `worker_count` transformer workers sharing `input`. Returns the
/// output channel of successfully transformed records; it closes once
/// every worker has exited (input channel closed).
pub fn spawn_transformer(
    input: mpsc::Receiver<serde_json::Value>,
    transform: TransformFn,
    enricher: Option<Arc<dyn Enricher>>,
    enrich_enabled: bool,
    worker_count: usize,
    accumulator: Arc<ResultAccumulator>,
    output_capacity: usize,
) -> mpsc::Receiver<Record> {
    let (out_tx, out_rx) = mpsc::channel(output_capacity);
    let shared_input = Arc::new(Mutex::new(input));
    let mut handles = Vec::with_capacity(worker_count);

    for _ in 0..worker_count.max(1) {
        let shared_input = shared_input.clone();
        let transform = transform.clone();
        let enricher = enricher.clone();
        let accumulator = accumulator.clone();
        let out_tx = out_tx.clone();

        handles.push(tokio::spawn(async move {
            loop {
                let item = {
                    let mut guard = shared_input.lock().await;
                    guard.recv().await
                };
                let Some(item) = item else { break };

                accumulator.record_total();

                let mut record = match transform(item) {
                    Ok(record) => record,
                    Err(err) => {
                        tracing::debug!(error = %err, "transformer: record failed");
                        accumulator.record_failed(err);
                        continue;
                    }
                };

                if enrich_enabled {
                    if let Some(enricher) = &enricher {
                        enrich(&mut record, enricher.as_ref()).await;
                    }
                }

                if out_tx.send(record).await.is_err() {
                    break;
                }
            }
        }));
    }

    // Join task: waits for every worker to exit, then drops `out_tx`'s
    // last clone so the output channel closes.
    drop(out_tx);
    tokio::spawn(async move {
        for handle in handles {
            let _ = handle.await;
        }
    });

    out_rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn fake_transform() -> TransformFn {
        Arc::new(|item: serde_json::Value| {
            let name = item["name"].as_str().unwrap_or_default();
            if name == "bad" {
                return Err(DirectoryError::validation("bad record"));
            }
            Ok(Record {
                name: name.to_string(),
                version: "1.0".to_string(),
                skills: vec![],
                domains: vec![],
                metadata: HashMap::new(),
            })
        })
    }

    #[tokio::test]
    async fn isolates_per_record_errors_and_continues() {
        let (tx, rx) = mpsc::channel(8);
        for name in ["a", "bad", "b"] {
            tx.send(serde_json::json!({"name": name})).await.unwrap();
        }
        drop(tx);

        let accumulator = Arc::new(ResultAccumulator::new());
        let mut output = spawn_transformer(rx, fake_transform(), None, false, 2, accumulator.clone(), 8);

        let mut names = vec![];
        while let Some(record) = output.recv().await {
            names.push(record.name);
        }
        names.sort();
        assert_eq!(names, vec!["a", "b"]);

        let result = accumulator.finish();
        assert_eq!(result.total_records, 3);
        assert_eq!(result.failed_count, 1);
    }

    struct FakeEnricher;

    #[async_trait]
    impl Enricher for FakeEnricher {
        async fn suggest_skills(&self, _record: &Record) -> Result<Vec<Suggestion>, DirectoryError> {
            Ok(vec![
                Suggestion { value: "ai".to_string(), confidence: 0.9 },
                Suggestion { value: "noise".to_string(), confidence: 0.1 },
            ])
        }

        async fn suggest_domains(&self, _record: &Record) -> Result<Vec<Suggestion>, DirectoryError> {
            Ok(vec![Suggestion { value: "search".to_string(), confidence: 0.5 }])
        }
    }

    #[tokio::test]
    async fn enrichment_merges_only_confident_suggestions() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(serde_json::json!({"name": "a"})).await.unwrap();
        drop(tx);

        let accumulator = Arc::new(ResultAccumulator::new());
        let mut output = spawn_transformer(
            rx,
            fake_transform(),
            Some(Arc::new(FakeEnricher)),
            true,
            1,
            accumulator,
            8,
        );

        let record = output.recv().await.unwrap();
        assert_eq!(record.skills, vec!["ai".to_string()]);
        assert_eq!(record.domains, vec!["search".to_string()]);
    }
}
