//! Replay record types
//!
//! A `LedgerRecord` is one parsed row of a replay file. Records are produced
//! by the CSV readers and consumed by the record processor, which validates
//! them and calls the ledger engine.

use super::account::AccountId;
use serde::{Deserialize, Serialize};

/// One operation read from a replay file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerRecord {
    /// Open an account with an opening balance in minor units
    Open {
        owner: String,
        currency: String,
        balance: i64,
    },

    /// Move `amount` minor units between two existing accounts
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: i64,
        currency: String,
    },
}

impl LedgerRecord {
    /// Short label used to name the transaction in logs
    pub fn label(&self) -> String {
        match self {
            LedgerRecord::Open { owner, .. } => format!("open {}", owner),
            LedgerRecord::Transfer { from, to, .. } => format!("transfer {}->{}", from, to),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, LedgerRecord::Open { .. })
    }
}
