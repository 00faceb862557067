//! Synchronous replay strategy
//!
//! Replays records one at a time, in file order, on a single-threaded tokio
//! runtime. It orchestrates the flow between the SyncReader (CSV input), the
//! RecordProcessor (validation and the ledger engine) and the CSV writer.
//!
//! Memory use is O(accounts + ledger rows); the input is streamed.

use crate::core::{LedgerEngine, RecordProcessor};
use crate::io::csv_format::write_accounts_csv;
use crate::io::sync_reader::SyncReader;
use crate::storage::MemoryStore;
use crate::strategy::{ProcessingStrategy, ReplaySummary};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Synchronous replay strategy
///
/// ```no_run
/// use rust_ledger_engine::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::default();
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("ledger.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncProcessingStrategy {
    tx_timeout: Option<Duration>,
}

impl SyncProcessingStrategy {
    pub fn new(tx_timeout: Option<Duration>) -> Self {
        Self { tx_timeout }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<ReplaySummary, String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let engine = LedgerEngine::new(Arc::new(MemoryStore::new()));
            let processor = RecordProcessor::new(engine).with_tx_timeout(self.tx_timeout);

            let reader = SyncReader::new(input_path)?;

            let mut summary = ReplaySummary::default();
            for result in reader {
                match result {
                    Ok(record) => {
                        let label = record.label();
                        match processor.process_record(record).await {
                            Ok(()) => summary.applied += 1,
                            Err(e) => {
                                summary.rejected += 1;
                                warn!(record = %label, error = %e, "record rejected");
                            }
                        }
                    }
                    Err(e) => {
                        summary.rejected += 1;
                        warn!(error = %e, "skipping record");
                    }
                }
            }
            info!(
                applied = summary.applied,
                rejected = summary.rejected,
                "replay finished"
            );

            let accounts = processor
                .accounts()
                .await
                .map_err(|e| format!("Failed to read accounts: {}", e))?;
            write_accounts_csv(&accounts, output)?;
            Ok(summary)
        })
    }
}
