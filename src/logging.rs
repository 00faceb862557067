//! Tracing subscriber setup
//!
//! Logs go to stderr; stdout carries the account CSV.

use clap::ValueEnum;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output format for log lines
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "rust_ledger_engine=debug,ledger_engine=debug"
    } else {
        "rust_ledger_engine=info,ledger_engine=info"
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `verbose`. Fails if a global subscriber
/// is already installed.
pub fn init_logging(format: LogFormat, verbose: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_writer(std::io::stderr);
            registry.with(layer).try_init()
        }
        LogFormat::Text => {
            let layer = fmt::layer()
                .with_target(false)
                .compact()
                .with_writer(std::io::stderr);
            registry.with(layer).try_init()
        }
    }
}
