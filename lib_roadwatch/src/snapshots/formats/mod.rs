//! # Snapshot Formats
//!
//! Pure byte-level codecs; none of them touch the filesystem.
//!
//! - **`structured`**: JSON array, lossless.
//! - **`flat`**: record ↔ header/row conversion shared by the tabular formats.
//! - **`tabular`**: CSV.
//! - **`spreadsheet`**: XLSX (a zip of SpreadsheetML parts).

use thiserror::Error;

use super::layout::SnapshotFormat;
use crate::roads::model::DisruptionRecord;

/// Record ↔ flat table conversion.
pub mod flat;
/// XLSX codec.
pub mod spreadsheet;
/// JSON codec.
pub mod structured;
/// CSV codec.
pub mod tabular;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XLSX XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("row {row}, column {column}: {message}")]
    Cell {
        row: usize,
        column: String,
        message: String,
    },

    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("workbook contains no worksheet")]
    MissingSheet,

    #[error("file has no header row")]
    MissingHeader,
}

pub fn encode(format: SnapshotFormat, records: &[DisruptionRecord]) -> Result<Vec<u8>, CodecError> {
    match format {
        SnapshotFormat::Json => structured::encode(records),
        SnapshotFormat::Csv => tabular::encode(records),
        SnapshotFormat::Xlsx => spreadsheet::encode(records),
    }
}

pub fn decode(format: SnapshotFormat, bytes: &[u8]) -> Result<Vec<DisruptionRecord>, CodecError> {
    match format {
        SnapshotFormat::Json => structured::decode(bytes),
        SnapshotFormat::Csv => tabular::decode(bytes),
        SnapshotFormat::Xlsx => spreadsheet::decode(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_without_fields_survive_every_format() {
        let records = vec![DisruptionRecord::default(); 2];

        for format in SnapshotFormat::ALL {
            let bytes = encode(format, &records).unwrap();
            let back = decode(format, &bytes).unwrap();
            assert_eq!(back, records, "{}", format);
        }
    }
}
