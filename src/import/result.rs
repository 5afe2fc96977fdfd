//! `ImportResult`: mutex-protected run aggregation.

use std::sync::Mutex;

use crate::error::DirectoryError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub total_records: usize,
    pub imported_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    pub errors: Vec<String>,
}

/// Accumulator shared across Fetcher/Transformer/Pusher tasks, guarded by a
/// single mutex held only while updating counters/errors.
#[derive(Default)]
pub struct ResultAccumulator {
    inner: Mutex<ImportResult>,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        ResultAccumulator::default()
    }

    pub fn record_total(&self) {
        self.inner.lock().unwrap().total_records += 1;
    }

    pub fn record_imported(&self) {
        self.inner.lock().unwrap().imported_count += 1;
    }

    pub fn record_failed(&self, err: DirectoryError) {
        let mut result = self.inner.lock().unwrap();
        result.failed_count += 1;
        result.errors.push(err.to_string());
    }

    pub fn record_failed_message(&self, msg: impl Into<String>) {
        let mut result = self.inner.lock().unwrap();
        result.failed_count += 1;
        result.errors.push(msg.into());
    }

    /// Finalize the run: `skipped = total - imported - failed`.
    pub fn finish(&self) -> ImportResult {
        let mut result = self.inner.lock().unwrap().clone();
        result.skipped_count = result
            .total_records
            .saturating_sub(result.imported_count)
            .saturating_sub(result.failed_count);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_arithmetic_holds() {
        let acc = ResultAccumulator::new();
        for _ in 0..3 {
            acc.record_total();
        }
        acc.record_imported();
        acc.record_imported();
        acc.record_failed_message("boom");

        let result = acc.finish();
        assert_eq!(result.total_records, 3);
        assert_eq!(result.imported_count, 2);
        assert_eq!(result.failed_count, 1);
        assert_eq!(result.skipped_count, 0);
        assert_eq!(
            result.total_records,
            result.imported_count + result.failed_count + result.skipped_count
        );
    }
}
