//! Rust Ledger Engine CLI
//!
//! Replays account openings and transfers from a CSV file and prints the final
//! account balances.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- ledger.csv > accounts.csv
//! cargo run -- --strategy sync ledger.csv > accounts.csv
//! cargo run -- --strategy async --batch-size 2000 --worker-threads 8 ledger.csv > accounts.csv
//! cargo run -- --tx-timeout-ms 500 --log-format json -v ledger.csv > accounts.csv
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use rust_ledger_engine::cli;
use rust_ledger_engine::logging;
use rust_ledger_engine::strategy;
use std::process;

fn main() {
    let args = cli::parse_args();

    if let Err(e) = logging::init_logging(args.log_format, args.verbose) {
        eprintln!("Warning: failed to initialise logging: {}", e);
    }

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy.clone(), config, args.tx_timeout())
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
