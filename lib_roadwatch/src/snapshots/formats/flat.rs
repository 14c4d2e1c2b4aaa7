//! Flat field mappings for the tabular formats.
//!
//! Columns are the known record fields in a fixed order followed by every
//! extra key (sorted) seen in the collection. Reading a table back is lossy by
//! nature: empty cells become absent fields, free-text columns stay text, and
//! `point` plus extra columns are parsed as JSON when they look like it.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::CodecError;
use crate::roads::model::{DisruptionRecord, KNOWN_FIELDS};

const INTEGER_COLUMNS: [&str; 1] = ["severityLevel"];
const TEXT_COLUMNS: [&str; 7] = [
    "id",
    "severity",
    "category",
    "subCategory",
    "comments",
    "description",
    "startDateTime",
];

/// Header row plus one row of optional values per record.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<Value>>>,
}

impl FlatTable {
    pub fn from_records(records: &[DisruptionRecord]) -> Result<Self, CodecError> {
        let objects = records
            .iter()
            .map(|record| match serde_json::to_value(record)? {
                Value::Object(map) => Ok(map),
                // A struct always serializes to an object.
                _ => Ok(Map::new()),
            })
            .collect::<Result<Vec<Map<String, Value>>, serde_json::Error>>()?;

        let extras: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.extra.keys().map(String::as_str))
            .filter(|k| !KNOWN_FIELDS.contains(k))
            .collect();

        let headers: Vec<String> = KNOWN_FIELDS
            .iter()
            .copied()
            .chain(extras)
            .map(str::to_string)
            .collect();

        let rows = objects
            .into_iter()
            .map(|mut object| {
                headers
                    .iter()
                    .map(|h| object.remove(h).filter(|v| !v.is_null()))
                    .collect()
            })
            .collect();

        Ok(Self { headers, rows })
    }
}

/// Text written into a tabular cell.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Rebuilds records from a header row and text rows. `row` numbers in errors
/// are 1-based data rows (the header is row 0).
pub fn records_from_rows(
    headers: &[String],
    rows: Vec<Vec<String>>,
) -> Result<Vec<DisruptionRecord>, CodecError> {
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(CodecError::MissingHeader);
    }

    rows.into_iter()
        .enumerate()
        .map(|(index, cells)| {
            let row = index + 1;
            let mut object = Map::new();
            for (header, text) in headers.iter().zip(cells) {
                let header = header.trim();
                if header.is_empty() || text.is_empty() {
                    continue;
                }
                let value = infer_value(header, text).map_err(|message| CodecError::Cell {
                    row,
                    column: header.to_string(),
                    message,
                })?;
                object.insert(header.to_string(), value);
            }
            serde_json::from_value(Value::Object(object)).map_err(|source| CodecError::Row { row, source })
        })
        .collect()
}

fn infer_value(header: &str, text: String) -> Result<Value, String> {
    if INTEGER_COLUMNS.contains(&header) {
        let trimmed = text.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Ok(Value::from(n));
        }
        // Spreadsheet tools like to write integers as "7.0".
        return match trimmed.parse::<f64>() {
            Ok(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Value::from(f as i64)),
            _ => Err(format!("expected an integer, got {:?}", text)),
        };
    }

    if TEXT_COLUMNS.contains(&header) {
        return Ok(Value::String(text));
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(value) if !value.is_string() && !value.is_null() => Ok(value),
        _ => Ok(Value::String(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn headers_are_known_fields_then_sorted_extras() {
        let records: Vec<DisruptionRecord> = serde_json::from_value(json!([
            {"id": "a", "zeta": 1},
            {"alpha": true}
        ]))
        .unwrap();

        let table = FlatTable::from_records(&records).unwrap();

        assert_eq!(&table.headers[..9], &KNOWN_FIELDS.map(str::to_string)[..]);
        assert_eq!(&table.headers[9..], &["alpha".to_string(), "zeta".to_string()]);
        assert_eq!(table.rows[0][0], Some(json!("a")));
        assert_eq!(table.rows[0][10], Some(json!(1)));
        assert_eq!(table.rows[1][9], Some(json!(true)));
        assert_eq!(table.rows[1][0], None);
    }

    #[test]
    fn rows_are_typed_by_column() {
        let headers: Vec<String> = ["id", "severityLevel", "point", "comments", "corridorIds"]
            .map(str::to_string)
            .to_vec();
        let rows = vec![vec![
            "123".to_string(),
            "7.0".to_string(),
            "[-0.1,51.5]".to_string(),
            "42".to_string(),
            "[\"a2\"]".to_string(),
        ]];

        let records = records_from_rows(&headers, rows).unwrap();
        let r = &records[0];
        assert_eq!(r.id, Some(json!("123")));
        assert_eq!(r.severity_level, Some(7));
        assert_eq!(r.point, Some(json!([-0.1, 51.5])));
        assert_eq!(r.comments.as_deref(), Some("42"));
        assert_eq!(r.extra.get("corridorIds"), Some(&json!(["a2"])));
    }

    #[test]
    fn empty_cells_are_absent_fields() {
        let headers: Vec<String> = ["id", "severity"].map(str::to_string).to_vec();
        let records = records_from_rows(&headers, vec![vec![String::new(), String::new()]]).unwrap();
        assert_eq!(records, vec![DisruptionRecord::default()]);
    }

    #[test]
    fn bad_integer_names_the_cell() {
        let headers = vec!["severityLevel".to_string()];
        let err = records_from_rows(&headers, vec![vec!["high".to_string()]]).unwrap_err();
        assert!(matches!(err, CodecError::Cell { row: 1, ref column, .. } if column == "severityLevel"));
    }

    #[test]
    fn blank_header_row_is_rejected() {
        let err = records_from_rows(&[String::new()], vec![]).unwrap_err();
        assert!(matches!(err, CodecError::MissingHeader));
    }
}
