//! Spreadsheet decoding over `calamine`.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};

use super::table::{Cell, FieldValue, Grid};
use crate::error::IngestError;

/// Upper bound on accepted spreadsheet size.
pub const MAX_SPREADSHEET_BYTES: u64 = 10 * 1024 * 1024;

/// File extensions recognized as spreadsheet containers.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

/// Turns raw spreadsheet bytes into a cell grid.
pub trait SpreadsheetDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Grid, IngestError>;
}

/// Decoder reading the first worksheet of any container `calamine` supports.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalamineDecoder;

impl SpreadsheetDecoder for CalamineDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Grid, IngestError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| IngestError::Decode(e.to_string()))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| IngestError::Decode("workbook has no worksheets".into()))?
            .map_err(|e| IngestError::Decode(e.to_string()))?;

        let grid: Grid = range
            .rows()
            .map(|row| row.iter().map(convert_cell).collect())
            .filter(|row: &Vec<Cell>| row.iter().any(Option::is_some))
            .collect();

        tracing::debug!(rows = grid.len(), "Decoded spreadsheet");
        Ok(grid)
    }
}

fn convert_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(FieldValue::Text(s.trim().to_string())),
        Data::Float(f) => Some(FieldValue::Number(*f)),
        Data::Int(i) => Some(FieldValue::Number(*i as f64)),
        Data::Bool(b) => Some(FieldValue::Bool(*b)),
        other => Some(FieldValue::Text(other.to_string())),
    }
}

/// Check the caller-boundary constraints for a spreadsheet upload.
pub fn check_upload(file_name: &str, size: u64) -> Result<(), IngestError> {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
        return Err(IngestError::UnsupportedFormat(format!(
            "{file_name}: expected one of {}",
            SPREADSHEET_EXTENSIONS.join(", ")
        )));
    }
    if size > MAX_SPREADSHEET_BYTES {
        return Err(IngestError::TooLarge {
            size,
            max: MAX_SPREADSHEET_BYTES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = CalamineDecoder.decode(b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, IngestError::Decode(_)));
    }

    #[test]
    fn cells_convert_to_primitives() {
        assert_eq!(convert_cell(&Data::Empty), None);
        assert_eq!(convert_cell(&Data::String("  ".into())), None);
        assert_eq!(
            convert_cell(&Data::String(" a@b.com ".into())),
            Some(FieldValue::Text("a@b.com".into()))
        );
        assert_eq!(convert_cell(&Data::Int(7)), Some(FieldValue::Number(7.0)));
        assert_eq!(convert_cell(&Data::Bool(false)), Some(FieldValue::Bool(false)));
    }

    #[test]
    fn upload_checks_extension_and_size() {
        assert!(check_upload("contacts.XLSX", 1024).is_ok());
        assert!(matches!(
            check_upload("contacts.csv", 1024),
            Err(IngestError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            check_upload("contacts.xls", MAX_SPREADSHEET_BYTES + 1),
            Err(IngestError::TooLarge { .. })
        ));
    }
}
