//! Core business logic module
//!
//! This module contains the transfer core and its caller:
//! - `context` - Per-call span, deadline and cancellation
//! - `traits` - Storage capabilities the core consumes
//! - `executor` - Commit-or-rollback wrapper around a unit of work
//! - `balance` - Canonically ordered balance updates
//! - `engine` - Transfer and account-opening orchestration
//! - `processor` - Validation and routing of replay records
//! - `batch_processor` - Ordered, concurrent application of record batches

pub mod balance;
pub mod batch_processor;
pub mod context;
pub mod engine;
pub mod executor;
pub mod processor;
pub mod traits;

pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use context::TxContext;
pub use engine::LedgerEngine;
pub use executor::run_in_transaction;
pub use processor::RecordProcessor;
pub use traits::{Mutator, Querier, Transaction, TransactionalStore};
