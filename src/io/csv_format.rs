//! CSV format handling for replay records and account output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to [`LedgerRecord`]s
//! - Account output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{Account, AccountId, LedgerRecord};
use serde::Deserialize;
use std::io::Write;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns: type, from, to, amount, currency, owner.
/// `open` rows leave `from`/`to` empty; `transfer` rows leave `owner` empty.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub from: Option<AccountId>,
    pub to: Option<AccountId>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub owner: Option<String>,
}

fn required<T>(value: Option<T>, field: &str, record_type: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("{} record requires '{}'", record_type, field))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_amount(amount: Option<String>, record_type: &str) -> Result<i64, String> {
    let amount = required(non_empty(amount), "amount", record_type)?;
    amount
        .parse::<i64>()
        .map_err(|_| format!("Invalid amount '{}' for {} record", amount, record_type))
}

/// Convert a CsvRecord to a LedgerRecord
///
/// Only the format is checked here: known type, required fields present,
/// integer amount. Business rules (signs, currencies, account existence) are
/// applied by the record processor.
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<LedgerRecord, String> {
    let record_type = csv_record.record_type.to_lowercase();

    match record_type.as_str() {
        "open" => Ok(LedgerRecord::Open {
            balance: parse_amount(csv_record.amount, "open")?,
            currency: required(non_empty(csv_record.currency), "currency", "open")?,
            owner: required(non_empty(csv_record.owner), "owner", "open")?,
        }),
        "transfer" => Ok(LedgerRecord::Transfer {
            from: required(csv_record.from, "from", "transfer")?,
            to: required(csv_record.to, "to", "transfer")?,
            amount: parse_amount(csv_record.amount, "transfer")?,
            currency: required(non_empty(csv_record.currency), "currency", "transfer")?,
        }),
        _ => Err(format!("Invalid record type: '{}'", csv_record.record_type)),
    }
}

/// Write account states to CSV format
///
/// Writes accounts in CSV format with columns: account, owner, currency, balance.
/// Accounts are sorted by id for deterministic output.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["account", "owner", "currency", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts: Vec<&Account> = accounts.iter().collect();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        writer
            .write_record(&[
                account.id.to_string(),
                account.owner_name.clone(),
                account.currency.clone(),
                account.balance.to_string(),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
