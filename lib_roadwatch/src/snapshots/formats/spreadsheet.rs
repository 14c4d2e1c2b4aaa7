//! # XLSX Codec
//!
//! Writes a minimal single-sheet workbook: header row, one row per record,
//! inline strings for text and plain numeric cells for numbers. Reading
//! understands inline strings, shared strings and numeric cells, which covers
//! both our own output and workbooks saved by common spreadsheet tools.

use std::io::{Cursor, Read, Write};

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use super::flat::{cell_text, records_from_rows, FlatTable};
use super::CodecError;
use crate::roads::model::DisruptionRecord;

const SHEET_PATH: &str = "xl/worksheets/sheet1.xml";
const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";
const SHEET_NAME: &str = "disruptions";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

fn workbook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        SHEET_NAME
    )
}

pub fn encode(records: &[DisruptionRecord]) -> Result<Vec<u8>, CodecError> {
    let table = FlatTable::from_records(records)?;
    let sheet = sheet_xml(&table);
    let workbook = workbook_xml();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    // Fixed timestamps keep the container free of wall-clock noise.
    let options = FileOptions::<'_, ()>::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let parts: [(&str, &[u8]); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", ROOT_RELS.as_bytes()),
        ("xl/workbook.xml", workbook.as_bytes()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
        (SHEET_PATH, sheet.as_bytes()),
    ];
    for (name, body) in parts {
        zip.start_file(name, options)?;
        zip.write_all(body)?;
    }

    Ok(zip.finish()?.into_inner())
}

fn sheet_xml(table: &FlatTable) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    push_row(&mut xml, 1, table.headers.iter().map(|h| Some(Value::String(h.clone()))));
    for (index, row) in table.rows.iter().enumerate() {
        push_row(&mut xml, index + 2, row.iter().cloned());
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn push_row(xml: &mut String, row_number: usize, cells: impl Iterator<Item = Option<Value>>) {
    xml.push_str(&format!(r#"<row r="{}">"#, row_number));
    for (col, cell) in cells.enumerate() {
        let reference = format!("{}{}", column_name(col), row_number);
        match cell {
            None => {}
            Some(Value::Number(n)) => {
                xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, n));
            }
            Some(value) => {
                let text = xml_safe(&cell_text(&value));
                xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    reference,
                    escape(text.as_str())
                ));
            }
        }
    }
    xml.push_str("</row>");
}

/// Drops characters XML 1.0 cannot carry.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}'))
        .collect()
}

/// 0 → "A", 25 → "Z", 26 → "AA".
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

/// Last column a worksheet can address (`XFD`).
const MAX_COLUMN: usize = 16_383;

/// "AB12" → `Some(27)`. `None` when the reference has no column letters or
/// names a column past `XFD`.
fn column_index(reference: &str) -> Option<usize> {
    let letters = reference.bytes().take_while(|b| b.is_ascii_alphabetic());
    let mut value = 0usize;
    let mut seen = false;
    for b in letters {
        seen = true;
        let digit = (b.to_ascii_uppercase() - b'A' + 1) as usize;
        value = value
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .filter(|&v| v <= MAX_COLUMN + 1)?;
    }
    seen.then(|| value - 1)
}

/// Column of a `<c>` element: its `r` reference, else the next free column.
fn cell_column(element: &BytesStart<'_>, row: usize, next_column: usize) -> Result<usize, CodecError> {
    let column = match attribute(element, b"r")? {
        Some(reference) if reference.starts_with(|c: char| c.is_ascii_alphabetic()) => {
            column_index(&reference).ok_or_else(|| CodecError::Cell {
                row,
                column: reference.clone(),
                message: "cell reference is past column XFD".to_string(),
            })?
        }
        _ => next_column,
    };
    if column > MAX_COLUMN {
        return Err(CodecError::Cell {
            row,
            column: column_name(column),
            message: "row has more cells than a worksheet allows".to_string(),
        });
    }
    Ok(column)
}

pub fn decode(bytes: &[u8]) -> Result<Vec<DisruptionRecord>, CodecError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let shared = match read_part(&mut archive, SHARED_STRINGS_PATH) {
        Ok(xml) => parse_shared_strings(&xml)?,
        Err(CodecError::Zip(zip::result::ZipError::FileNotFound)) => Vec::new(),
        Err(e) => return Err(e),
    };

    let sheet_path = first_sheet_path(&archive).ok_or(CodecError::MissingSheet)?;
    let sheet = read_part(&mut archive, &sheet_path)?;
    let mut rows = parse_sheet(&sheet, &shared)?;

    if rows.is_empty() {
        return Err(CodecError::MissingHeader);
    }
    let headers = rows.remove(0);
    records_from_rows(&headers, rows)
}

fn first_sheet_path<R: Read + std::io::Seek>(archive: &ZipArchive<R>) -> Option<String> {
    if archive.index_for_name(SHEET_PATH).is_some() {
        return Some(SHEET_PATH.to_string());
    }
    let mut sheets: Vec<&str> = archive
        .file_names()
        .filter(|name| name.starts_with("xl/worksheets/") && name.ends_with(".xml"))
        .collect();
    sheets.sort_unstable();
    sheets.first().map(|s| s.to_string())
}

fn read_part<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String, CodecError> {
    let mut part = archive.by_name(name)?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, CodecError> {
    match element.try_get_attribute(name).map_err(quick_xml::Error::from)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, CodecError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_item = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = true;
                    current.clear();
                }
                b"t" if in_item => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::CData(t) if in_text => current.push_str(&String::from_utf8_lossy(&t)),
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"si" => {
                    in_item = false;
                    strings.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

#[derive(Default)]
struct CellState {
    column: usize,
    kind: Option<String>,
    text: String,
}

fn parse_sheet(xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>, CodecError> {
    let mut reader = Reader::from_str(xml);
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut next_column = 0usize;
    let mut cell: Option<CellState> = None;
    let mut capture = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row = Vec::new();
                    next_column = 0;
                }
                b"c" => {
                    let column = cell_column(&e, rows.len(), next_column)?;
                    cell = Some(CellState {
                        column,
                        kind: attribute(&e, b"t")?,
                        text: String::new(),
                    });
                }
                b"v" | b"t" if cell.is_some() => capture = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => rows.push(Vec::new()),
                b"c" => {
                    next_column = cell_column(&e, rows.len(), next_column)? + 1;
                }
                _ => {}
            },
            Event::Text(t) if capture => {
                if let Some(state) = cell.as_mut() {
                    state.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(t) if capture => {
                if let Some(state) = cell.as_mut() {
                    state.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    if let Some(state) = cell.take() {
                        let value = match state.kind.as_deref() {
                            Some("s") => state
                                .text
                                .trim()
                                .parse::<usize>()
                                .ok()
                                .and_then(|i| shared.get(i).cloned())
                                .unwrap_or_default(),
                            _ => state.text,
                        };
                        if row.len() <= state.column {
                            row.resize(state.column + 1, String::new());
                        }
                        row[state.column] = value;
                        next_column = state.column + 1;
                    }
                }
                b"row" => rows.push(std::mem::take(&mut row)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn column_names_round_trip() {
        for (index, name) in [(0, "A"), (25, "Z"), (26, "AA"), (27, "AB"), (701, "ZZ"), (702, "AAA")] {
            assert_eq!(column_name(index), name);
            assert_eq!(column_index(&format!("{}7", name)), Some(index));
        }
        assert_eq!(column_index("12"), None);
        assert_eq!(column_index("XFD9"), Some(MAX_COLUMN));
        assert_eq!(column_index("XFE9"), None);
        assert_eq!(column_index("ZZZZZZZZZZZZZZZZ2"), None);
    }

    fn workbook_with_sheet(sheet: &str) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::<'_, ()>::default();
        zip.start_file(SHEET_PATH, options).unwrap();
        zip.write_all(sheet.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn oversized_cell_references_are_rejected() {
        for reference in ["ZZZZZZZZZZZZZZZZ2", "ZZZZZ2", "XFE2"] {
            let sheet = format!(
                r#"<worksheet><sheetData>
                    <row r="1"><c r="A1" t="inlineStr"><is><t>id</t></is></c></row>
                    <row r="2"><c r="{}" t="inlineStr"><is><t>TIMS-1</t></is></c></row>
                </sheetData></worksheet>"#,
                reference
            );
            let err = decode(&workbook_with_sheet(&sheet)).unwrap_err();
            assert!(
                matches!(err, CodecError::Cell { row: 1, ref column, .. } if column == reference),
                "{}: {:?}",
                reference,
                err
            );
        }
    }

    #[test]
    fn last_addressable_column_is_accepted() {
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="inlineStr"><is><t>id</t></is></c></row>
            <row r="2"><c r="A2" t="inlineStr"><is><t>TIMS-1</t></is></c><c r="XFD2"><v>1</v></c></row>
        </sheetData></worksheet>"#;
        let records = decode(&workbook_with_sheet(sheet)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label(), "TIMS-1");
    }

    #[test]
    fn workbook_round_trips_records() {
        let records: Vec<DisruptionRecord> = serde_json::from_value(json!([
            {"id": "TIMS-1", "severity": "Serious", "severityLevel": 2,
             "comments": "A & B <closed>", "point": [-0.1, 51.5]},
            {"id": "TIMS-2", "category": "Works"}
        ]))
        .unwrap();

        let bytes = encode(&records).unwrap();
        let back = decode(&bytes).unwrap();

        assert_eq!(back, records);
    }

    #[test]
    fn encoding_is_deterministic() {
        let records: Vec<DisruptionRecord> =
            serde_json::from_value(json!([{"id": "TIMS-1", "severityLevel": 4}])).unwrap();
        assert_eq!(encode(&records).unwrap(), encode(&records).unwrap());
    }

    #[test]
    fn shared_strings_and_sparse_cells_are_read() {
        let shared = parse_shared_strings(
            r#"<sst xmlns="x"><si><t>id</t></si><si><r><t>sev</t></r><r><t>erity</t></r></si><si><t>TIMS-9</t></si></sst>"#,
        )
        .unwrap();
        assert_eq!(shared, vec!["id", "severity", "TIMS-9"]);

        let rows = parse_sheet(
            r#"<worksheet><sheetData>
                <row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="s"><v>1</v></c></row>
                <row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"/><c r="C2" t="inlineStr"><is><t>Minimal</t></is></c></row>
            </sheetData></worksheet>"#,
            &shared,
        )
        .unwrap();

        assert_eq!(rows[0], vec!["id", "", "severity"]);
        assert_eq!(rows[1], vec!["TIMS-9", "", "Minimal"]);
    }

    #[test]
    fn garbage_is_a_container_error() {
        assert!(matches!(decode(b"not a zip"), Err(CodecError::Zip(_))));
    }

    #[test]
    fn control_characters_are_dropped() {
        assert_eq!(xml_safe("a\u{1}b\tc"), "ab\tc");
    }
}
