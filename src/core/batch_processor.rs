//! Batch processing for the async replay strategy
//!
//! This module provides the `BatchProcessor` struct, which applies a batch of
//! records with as much concurrency as the file's ordering allows.
//!
//! # Design
//!
//! A batch is split into runs of consecutive records of the same kind:
//!
//! - a run of `open` records is applied sequentially, so account ids are
//!   assigned in file order
//! - a run of `transfer` records is applied concurrently, one task per record
//!
//! A transfer therefore always sees exactly the accounts opened before it in
//! the file, as it would in a sequential replay. Transfers within a run
//! commute (there is no overdraft check) and the engine's canonical lock order
//! keeps opposite-direction transfers from deadlocking.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── RecordProcessor<S>  (validation + shared LedgerEngine)
//! ```

use tracing::error;

use super::processor::RecordProcessor;
use super::traits::TransactionalStore;
use crate::types::{LedgerError, LedgerRecord};

/// Result of processing a single record
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub record: LedgerRecord,
    pub result: Result<(), LedgerError>,
}

/// Split a batch into runs of consecutive records of the same kind, preserving order
pub fn partition_runs(batch: Vec<LedgerRecord>) -> Vec<Vec<LedgerRecord>> {
    let mut runs: Vec<Vec<LedgerRecord>> = Vec::new();

    for record in batch {
        match runs.last_mut() {
            Some(run) if run[0].is_open() == record.is_open() => run.push(record),
            _ => runs.push(vec![record]),
        }
    }

    runs
}

/// Batch processor over a shared record processor
#[derive(Debug)]
pub struct BatchProcessor<S> {
    processor: RecordProcessor<S>,
}

impl<S> Clone for BatchProcessor<S> {
    fn clone(&self) -> Self {
        Self {
            processor: self.processor.clone(),
        }
    }
}

impl<S> BatchProcessor<S>
where
    S: TransactionalStore + 'static,
{
    pub fn new(processor: RecordProcessor<S>) -> Self {
        Self { processor }
    }

    pub fn processor(&self) -> &RecordProcessor<S> {
        &self.processor
    }

    async fn process_sequential(&self, records: Vec<LedgerRecord>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(records.len());

        for record in records {
            let result = self.processor.process_record(record.clone()).await;
            results.push(ProcessingResult { record, result });
        }

        results
    }

    async fn process_concurrent(&self, records: Vec<LedgerRecord>) -> Vec<ProcessingResult> {
        let mut tasks = Vec::with_capacity(records.len());
        for record in records {
            let processor = self.processor.clone();
            tasks.push(tokio::spawn(async move {
                let result = processor.process_record(record.clone()).await;
                ProcessingResult { record, result }
            }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(result) => results.push(result),
                Err(e) => error!(error = %e, "record task panicked"),
            }
        }

        results
    }

    /// Process a batch and wait for every record in it to finish
    ///
    /// Results of a transfer run come back in file order even though the
    /// transfers ran concurrently. A panicking task is logged and has no result.
    pub async fn process_batch(&self, batch: Vec<LedgerRecord>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(batch.len());

        for run in partition_runs(batch) {
            let run_results = if run[0].is_open() {
                self.process_sequential(run).await
            } else {
                self.process_concurrent(run).await
            };
            results.extend(run_results);
        }

        results
    }
}
