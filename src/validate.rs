//! Recipient validator — picks the rows that can actually be mailed.

use serde::Serialize;

use crate::config::DEFAULT_SAMPLE_SIZE;
use crate::ingest::CanonicalTable;
use crate::ingest::patterns::is_valid_address;

/// A row that passed validation, with its address resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    /// Index of the row in the source table.
    pub row: usize,
    pub address: String,
}

/// Outcome of validating one column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Column the caller designated.
    pub column: String,
    /// Valid rows in stable table order. Authoritative dispatch input.
    pub valid_recipients: Vec<Recipient>,
    pub valid_count: usize,
    pub total_rows: usize,
    /// First few valid addresses, for display.
    pub sample_addresses: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.valid_count > 0
    }
}

/// Validate `column` with the default sample size.
pub fn validate(table: &CanonicalTable, column: &str) -> ValidationReport {
    validate_with_sample(table, column, DEFAULT_SAMPLE_SIZE)
}

/// Keep rows whose `column` value is a strictly valid address.
///
/// Failing rows are excluded silently. Pure: the same table and column
/// always produce the same report.
pub fn validate_with_sample(
    table: &CanonicalTable,
    column: &str,
    sample_size: usize,
) -> ValidationReport {
    let valid_recipients: Vec<Recipient> = table
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(row, record)| {
            let address = record.get(column)?.to_string();
            is_valid_address(&address).then_some(Recipient { row, address })
        })
        .collect();

    let sample_addresses = valid_recipients
        .iter()
        .take(sample_size)
        .map(|r| r.address.clone())
        .collect();

    tracing::debug!(
        column,
        valid = valid_recipients.len(),
        total = table.len(),
        "Validated recipient column"
    );

    ValidationReport {
        column: column.to_string(),
        valid_count: valid_recipients.len(),
        total_rows: table.len(),
        valid_recipients,
        sample_addresses,
    }
}
