//! Asynchronous batch replay strategy
//!
//! Reads records in batches and applies each batch on a multi-threaded tokio
//! runtime, with every transfer run executing as concurrent tasks against one
//! shared ledger engine.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, worker_threads)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (open runs in order, transfer runs concurrently)
//!         └── RecordProcessor → LedgerEngine<MemoryStore>
//! ```
//!
//! Batches are processed one after another, so a record never overtakes one
//! from an earlier batch.

use crate::core::{BatchProcessor, LedgerEngine, RecordProcessor};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_accounts_csv;
use crate::storage::MemoryStore;
use crate::strategy::{ProcessingStrategy, ReplaySummary};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for batch processing
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of records per batch
    pub batch_size: usize,
    /// Number of runtime worker threads applying a batch
    pub worker_threads: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            worker_threads: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a BatchConfig, replacing zero values with the defaults
    pub fn new(batch_size: usize, worker_threads: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let worker_threads = if worker_threads == 0 {
            warn!(
                worker_threads,
                default = default.worker_threads,
                "invalid worker_threads, using default"
            );
            default.worker_threads
        } else {
            worker_threads
        };

        Self {
            batch_size,
            worker_threads,
        }
    }
}

/// Asynchronous batch replay strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    tx_timeout: Option<Duration>,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            tx_timeout: None,
        }
    }

    pub fn with_tx_timeout(mut self, tx_timeout: Option<Duration>) -> Self {
        self.tx_timeout = tx_timeout;
        self
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<ReplaySummary, String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.worker_threads)
            .enable_time()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let engine = LedgerEngine::new(Arc::new(MemoryStore::new()));
            let processor = RecordProcessor::new(engine).with_tx_timeout(self.tx_timeout);
            let batches = BatchProcessor::new(processor);

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // csv-async reads through the futures AsyncRead traits
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut summary = ReplaySummary::default();
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for outcome in batches.process_batch(batch).await {
                    match outcome.result {
                        Ok(()) => summary.applied += 1,
                        Err(e) => {
                            summary.rejected += 1;
                            warn!(record = %outcome.record.label(), error = %e, "record rejected");
                        }
                    }
                }
            }
            summary.rejected += reader.skipped();
            info!(
                applied = summary.applied,
                rejected = summary.rejected,
                "replay finished"
            );

            let accounts = batches
                .processor()
                .accounts()
                .await
                .map_err(|e| format!("Failed to read accounts: {}", e))?;
            write_accounts_csv(&accounts, output)?;
            Ok(summary)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_async_strategy_replays_opens_and_transfers() {
        let file = create_temp_csv(
            "type,from,to,amount,currency,owner\n\
             open,,,100,USD,alice\n\
             open,,,50,USD,bob\n\
             transfer,1,2,10,USD,\n\
             transfer,2,1,30,USD,\n",
        );
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default());
        let mut output = Vec::new();

        strategy.process(file.path(), &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,owner,currency,balance\n1,alice,USD,120\n2,bob,USD,30\n"
        );
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default());
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_async_strategy_maintains_ordering_across_batches() {
        // Account 2 is opened in the second batch; the transfer before it must fail
        let file = create_temp_csv(
            "type,from,to,amount,currency,owner\n\
             open,,,100,USD,alice\n\
             transfer,1,2,30,USD,\n\
             open,,,0,USD,bob\n\
             transfer,1,2,20,USD,\n\
             transfer,2,1,5,USD,\n",
        );
        let strategy = AsyncProcessingStrategy::new(BatchConfig::new(2, 2));
        let mut output = Vec::new();

        strategy.process(file.path(), &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,owner,currency,balance\n1,alice,USD,85\n2,bob,USD,15\n"
        );
    }

    #[rstest]
    #[case::zero_batch_size(0, 4, 1000, 4)]
    #[case::zero_workers(10, 0, 10, num_cpus::get())]
    #[case::custom(10, 4, 10, 4)]
    fn test_batch_config_new(
        #[case] batch_size: usize,
        #[case] workers: usize,
        #[case] expected_batch_size: usize,
        #[case] expected_workers: usize,
    ) {
        let config = BatchConfig::new(batch_size, workers);

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.worker_threads, expected_workers);
    }
}
