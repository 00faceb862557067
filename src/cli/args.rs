use crate::logging::LogFormat;
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Replay a ledger file of account openings and transfers
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(about = "Replay account openings and money transfers through the ledger engine", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing ledger records
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Processing strategy to use for replaying records
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for concurrent batches"
    )]
    pub strategy: StrategyType,

    /// Number of records per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of records per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of worker threads (async mode only)
    #[arg(
        long = "worker-threads",
        value_name = "COUNT",
        help = "Number of worker threads applying a batch (default: CPU cores)"
    )]
    pub worker_threads: Option<usize>,

    /// Per-record transaction deadline
    #[arg(
        long = "tx-timeout-ms",
        value_name = "MS",
        help = "Abort and roll back any record whose transaction takes longer than MS milliseconds"
    )]
    pub tx_timeout_ms: Option<u64>,

    /// Log line format written to stderr
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// Enable debug logging for the ledger engine
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Available processing strategies
#[derive(Clone, Debug, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments, falling back to defaults
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.worker_threads.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.worker_threads.unwrap_or(default.worker_threads),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Per-record transaction timeout; zero means none
    pub fn tx_timeout(&self) -> Option<Duration> {
        self.tx_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}
