//! Processing strategy module for ledger replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! encompassing both CSV parsing and ledger processing. This allows different
//! implementations (sequential, concurrent batch) to be selected at runtime.

use crate::cli::StrategyType;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Record counts for one replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Records committed by the ledger
    pub applied: usize,
    /// Rows that failed to parse plus records the ledger rejected
    pub rejected: usize,
}

/// Processing strategy trait for complete replay pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Replay the records in `input_path` and write the final accounts to `output`
    ///
    /// Returns an error only for fatal problems: the input cannot be opened,
    /// the runtime cannot start, or output cannot be written. Records that fail
    /// to parse or are rejected by the ledger are logged, skipped and counted.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<ReplaySummary, String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// `config` is only used by the async strategy; `tx_timeout` bounds every
/// record's transaction in both.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
    tx_timeout: Option<Duration>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(tx_timeout)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config).with_tx_timeout(tx_timeout))
        }
    }
}
