use csv::{ReaderBuilder, WriterBuilder};

use super::flat::{cell_text, records_from_rows, FlatTable};
use super::CodecError;
use crate::roads::model::DisruptionRecord;

/// CSV with a header row; every record is one line (fields with separators or
/// newlines are quoted).
pub fn encode(records: &[DisruptionRecord]) -> Result<Vec<u8>, CodecError> {
    let table = FlatTable::from_records(records)?;

    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.as_ref().map(cell_text).unwrap_or_default()))?;
    }

    writer.into_inner().map_err(|e| CodecError::Io(e.into_error()))
}

/// Rows shorter than the header are accepted; missing cells are absent fields.
pub fn decode(bytes: &[u8]) -> Result<Vec<DisruptionRecord>, CodecError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    records_from_rows(&headers, rows)
}
