//! Contact ingestion — every source becomes a [`CanonicalTable`].
//!
//! Two entry paths:
//! 1. [`normalize_tabular`] — spreadsheet bytes → cell grid → table
//! 2. [`normalize_documents`] — source URIs → fetched pages → table
//!
//! [`normalize_source`] picks the path from a [`ContactSource`].

pub mod documents;
pub mod fetcher;
pub mod patterns;
pub mod spreadsheet;
pub mod table;
pub mod tabular;

pub use documents::{normalize_documents, read_uri_list};
pub use fetcher::{DocumentFetcher, HttpFetcher};
pub use spreadsheet::{CalamineDecoder, SpreadsheetDecoder};
pub use table::{CanonicalTable, Cell, ContactRecord, EMAIL_KEY, FieldValue, Grid};
pub use tabular::{ExtractionMode, normalize_grid};

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};

/// Raw contact input as handed over by a caller.
#[derive(Debug, Clone, Copy)]
pub enum ContactSource<'a> {
    /// Uploaded workbook bytes and the upload's file name.
    Spreadsheet { file_name: &'a str, bytes: &'a [u8] },
    /// Pages to fetch and scrape.
    Uris(&'a [String]),
}

/// Normalize any contact source with the default decoder and HTTP fetcher.
///
/// Spreadsheets are checked against the upload limits first.
pub async fn normalize_source(
    source: ContactSource<'_>,
    config: &IngestConfig,
) -> Result<CanonicalTable> {
    let table = match source {
        ContactSource::Spreadsheet { file_name, bytes } => {
            spreadsheet::check_upload(file_name, bytes.len() as u64)?;
            normalize_tabular(bytes, &CalamineDecoder, config.extraction_mode())?
        }
        ContactSource::Uris(uris) => {
            let fetcher = HttpFetcher::new(config)?;
            normalize_documents(uris, &fetcher, config).await?
        }
    };
    Ok(table)
}

/// Decode spreadsheet bytes and normalize the first sheet.
pub fn normalize_tabular(
    bytes: &[u8],
    decoder: &dyn SpreadsheetDecoder,
    mode: ExtractionMode,
) -> std::result::Result<CanonicalTable, IngestError> {
    let grid = decoder.decode(bytes)?;
    let table = normalize_grid(&grid, mode)?;
    tracing::info!(
        rows = table.len(),
        columns = table.headers().len(),
        "Normalized spreadsheet"
    );
    Ok(table)
}

impl IngestConfig {
    /// Extraction mode selected by the `fan_out` flag.
    pub fn extraction_mode(&self) -> ExtractionMode {
        if self.fan_out {
            ExtractionMode::AddressFanOut
        } else {
            ExtractionMode::SingleAddressPerRow
        }
    }
}
