//! Storage adapters
//!
//! Each adapter composes the [`Querier`](crate::core::traits::Querier) and
//! [`TransactionalStore`](crate::core::traits::TransactionalStore) capabilities:
//!
//! - `memory` - in-process store with per-row exclusive locks
//! - `postgres` - PostgreSQL via sqlx (feature `postgres`)

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::{MemoryStore, MemoryTx};
#[cfg(feature = "postgres")]
pub use postgres::{PgStore, PgTx};
