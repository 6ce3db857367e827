//! Tabular decode — cell grid to canonical table.
//!
//! Row 0 is treated as a header row unless it already holds an address, in
//! which case the whole grid is data and columns are named `Column 1..N`.

use std::collections::HashSet;

use tracing::debug;

use super::patterns::{contains_address, find_addresses};
use super::table::{CanonicalTable, Cell, ContactRecord, EMAIL_KEY, FieldValue, Grid};
use crate::error::IngestError;

/// How addresses found in a row map to records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractionMode {
    /// One record per non-empty row; `email` holds the first address found.
    #[default]
    SingleAddressPerRow,
    /// One record per distinct address in the row; rows without one are dropped.
    AddressFanOut,
}

/// Normalize a decoded grid into a [`CanonicalTable`].
pub fn normalize_grid(grid: &Grid, mode: ExtractionMode) -> Result<CanonicalTable, IngestError> {
    if grid.is_empty() {
        return Err(IngestError::EmptySource);
    }

    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    let has_header = !grid[0].iter().any(cell_has_address);
    let (headers, data) = if has_header {
        (header_names(&grid[0], width), &grid[1..])
    } else {
        (generic_names(width), &grid[..])
    };

    debug!(
        has_header,
        columns = headers.len(),
        data_rows = data.len(),
        ?mode,
        "Normalizing grid"
    );

    let mut rows = Vec::new();
    for row in data {
        let base = copy_cells(row, &headers);
        let addresses = row_addresses(row);

        match mode {
            ExtractionMode::SingleAddressPerRow => {
                if base.is_empty() && addresses.is_empty() {
                    continue;
                }
                let mut record = base;
                if let Some(first) = addresses.into_iter().next() {
                    record.set(EMAIL_KEY, first);
                }
                if !record.is_empty() {
                    rows.push(record);
                }
            }
            ExtractionMode::AddressFanOut => {
                for address in addresses {
                    let mut record = base.clone();
                    record.set(EMAIL_KEY, address);
                    rows.push(record);
                }
            }
        }
    }

    if !rows.iter().any(|r| r.email().is_some()) {
        return Err(IngestError::NoAddressesFound);
    }

    CanonicalTable::new(headers, rows)
}

fn cell_has_address(cell: &Cell) -> bool {
    matches!(cell, Some(FieldValue::Text(s)) if contains_address(s))
}

/// Distinct addresses across every string cell of a row, in column order.
fn row_addresses(row: &[Cell]) -> Vec<String> {
    let mut seen = HashSet::new();
    row.iter()
        .filter_map(|c| c.as_ref().and_then(FieldValue::as_text))
        .flat_map(find_addresses)
        .filter(|a| seen.insert(a.to_lowercase()))
        .collect()
}

/// Copy a row's non-empty cells under their header names.
///
/// A literal `email` header is not copied: the reserved key only ever holds
/// an address resolved by extraction.
fn copy_cells(row: &[Cell], headers: &[String]) -> ContactRecord {
    let mut record = ContactRecord::new();
    for (header, cell) in headers.iter().zip(row) {
        if header == EMAIL_KEY {
            continue;
        }
        if let Some(value) = cell {
            record.set(header.clone(), value.clone());
        }
    }
    record
}

fn generic_names(width: usize) -> Vec<String> {
    (1..=width).map(|i| format!("Column {i}")).collect()
}

/// Header names from row 0: blanks become `Column i`, duplicates get a
/// ` (k)` suffix, and missing trailing names are filled in up to `width`.
fn header_names(row: &[Cell], width: usize) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(width);
    let mut seen: HashSet<String> = HashSet::with_capacity(width);

    for i in 0..width {
        let raw = row
            .get(i)
            .and_then(|c| c.as_ref())
            .map(|v| v.to_string().trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("Column {}", i + 1));

        let mut name = raw.clone();
        let mut k = 2;
        while seen.contains(&name) {
            name = format!("{raw} ({k})");
            k += 1;
        }
        seen.insert(name.clone());
        names.push(name);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Some(FieldValue::from(s))
    }

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .map(|r| {
                r.iter()
                    .map(|s| if s.is_empty() { None } else { text(s) })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn header_row_single_address_keeps_every_row() {
        let g = grid(&[
            &["Name", "Email"],
            &["Alice", "alice@x.com"],
            &["Bob", "not-an-email"],
        ]);
        let table = normalize_grid(&g, ExtractionMode::SingleAddressPerRow).unwrap();
        assert_eq!(table.headers(), ["Name", "Email"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].email(), Some("alice@x.com"));
        assert_eq!(
            table.rows()[0].get("Email"),
            Some(&FieldValue::from("alice@x.com"))
        );
        assert_eq!(table.rows()[1].email(), None);
        assert_eq!(
            table.rows()[1].get("Name"),
            Some(&FieldValue::from("Bob"))
        );
    }

    #[test]
    fn fan_out_yields_one_record_per_distinct_address() {
        let g = grid(&[
            &["Company", "Contacts"],
            &["Acme", "a@acme.com; b@acme.com, a@acme.com"],
            &["Nobody", "n/a"],
        ]);
        let table = normalize_grid(&g, ExtractionMode::AddressFanOut).unwrap();
        assert_eq!(table.len(), 2);
        let emails: Vec<_> = table.rows().iter().filter_map(|r| r.email()).collect();
        assert_eq!(emails, ["a@acme.com", "b@acme.com"]);
        assert!(table
            .rows()
            .iter()
            .all(|r| r.get("Company") == Some(&FieldValue::from("Acme"))));
    }

    #[test]
    fn fan_out_scans_every_cell() {
        let g = grid(&[&["A", "B"], &["x@one.org", "y@two.org"]]);
        let table = normalize_grid(&g, ExtractionMode::AddressFanOut).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn headerless_grid_gets_generic_names() {
        let g = grid(&[&["Alice", "alice@x.com"], &["Bob", "bob@y.org"]]);
        let table = normalize_grid(&g, ExtractionMode::SingleAddressPerRow).unwrap();
        assert_eq!(table.headers(), ["Column 1", "Column 2"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].email(), Some("bob@y.org"));
    }

    #[test]
    fn blank_and_duplicate_headers_are_renamed() {
        let g = grid(&[&["Name", "", "Name"], &["Al", "al@x.com", "Jr"]]);
        let table = normalize_grid(&g, ExtractionMode::SingleAddressPerRow).unwrap();
        assert_eq!(table.headers(), ["Name", "Column 2", "Name (2)"]);
    }

    #[test]
    fn ragged_rows_extend_headers() {
        let g = grid(&[&["Name"], &["Al", "al@x.com"]]);
        let table = normalize_grid(&g, ExtractionMode::SingleAddressPerRow).unwrap();
        assert_eq!(table.headers(), ["Name", "Column 2"]);
        assert_eq!(
            table.rows()[0].get("Column 2"),
            Some(&FieldValue::from("al@x.com"))
        );
    }

    #[test]
    fn literal_email_header_never_holds_garbage() {
        let g = grid(&[&["Name", "email"], &["Al", "al@x.com"], &["Bo", "n/a"]]);
        let table = normalize_grid(&g, ExtractionMode::SingleAddressPerRow).unwrap();
        assert_eq!(table.rows()[0].email(), Some("al@x.com"));
        assert_eq!(table.rows()[1].email(), None);
    }

    #[test]
    fn empty_rows_are_skipped() {
        let g = grid(&[&["Name", "Email"], &["", ""], &["Al", "al@x.com"]]);
        let table = normalize_grid(&g, ExtractionMode::SingleAddressPerRow).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn numeric_cells_are_copied() {
        let g: Grid = vec![
            vec![text("Name"), text("Age"), text("Email")],
            vec![text("Al"), Some(FieldValue::Number(41.0)), text("al@x.com")],
        ];
        let table = normalize_grid(&g, ExtractionMode::SingleAddressPerRow).unwrap();
        assert_eq!(table.rows()[0].get("Age"), Some(&FieldValue::Number(41.0)));
    }

    #[test]
    fn empty_grid_is_rejected() {
        let err = normalize_grid(&Vec::new(), ExtractionMode::default()).unwrap_err();
        assert!(matches!(err, IngestError::EmptySource));
    }

    #[test]
    fn no_addresses_is_rejected_in_both_modes() {
        let g = grid(&[&["Name", "Phone"], &["Al", "555-1234"]]);
        for mode in [ExtractionMode::SingleAddressPerRow, ExtractionMode::AddressFanOut] {
            let err = normalize_grid(&g, mode).unwrap_err();
            assert!(matches!(err, IngestError::NoAddressesFound));
        }
    }

    #[test]
    fn every_resolved_email_is_taken_verbatim_from_its_row() {
        let g = grid(&[
            &["Who", "Notes"],
            &["Al", "reach me at al@x.com (work)"],
            &["Bo", "bo@y.co.uk."],
            &["Cy", "'cy.o'neil@z.io'"],
        ]);
        let table = normalize_grid(&g, ExtractionMode::AddressFanOut).unwrap();
        assert_eq!(table.len(), 3);
        for (record, source) in table.rows().iter().zip(&g[1..]) {
            let email = record.email().unwrap();
            let notes = source[1].as_ref().and_then(FieldValue::as_text).unwrap();
            assert!(notes.contains(email), "{email} not in {notes}");
            assert!(crate::ingest::patterns::is_valid_address(email));
        }
    }

    #[test]
    fn unusual_local_parts_survive_both_modes() {
        let g = grid(&[
            &["Name", "Email"],
            &["Pat", "o'brien@x.com"],
            &["Jo", "josé@x.com"],
        ]);
        for mode in [ExtractionMode::SingleAddressPerRow, ExtractionMode::AddressFanOut] {
            let table = normalize_grid(&g, mode).unwrap();
            let emails: Vec<_> = table.rows().iter().filter_map(ContactRecord::email).collect();
            assert_eq!(emails, ["o'brien@x.com", "josé@x.com"], "{mode:?}");
        }
    }
}
