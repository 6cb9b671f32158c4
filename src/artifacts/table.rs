//! Data-table artifacts: required navigation, cell flattening, CSV output.
//!
//! The table lives at `record[18]`; the rows array sits at
//! `[18][0][0][0][0][4][2]`. Each row is `[start, end, [cells...]]` and each
//! cell is rich text: nested arrays mixing strings with numeric position
//! markers.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::nav;

const KIND: &str = "data_table";
const MAX_CELL_DEPTH: usize = 100;
const UTF8_BOM: &str = "\u{feff}";

/// Required steps down to the rows array, with the minimum length at each.
const ROW_PATH: [(&[usize], usize); 7] = [
    (&[18], 1),
    (&[18, 0], 1),
    (&[18, 0, 0], 1),
    (&[18, 0, 0, 0], 1),
    (&[18, 0, 0, 0, 0], 5),
    (&[18, 0, 0, 0, 0, 4], 3),
    (&[18, 0, 0, 0, 0, 4, 2], 1),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Flatten one rich-text cell to plain text.
///
/// Strings are trimmed and kept, numbers are position markers and dropped,
/// nulls are empty, arrays join their non-empty parts with one space.
/// Recursion stops at depth 100.
pub fn flatten_cell(cell: &Value) -> String {
    flatten_at(cell, 0)
}

fn flatten_at(cell: &Value, depth: usize) -> String {
    if depth > MAX_CELL_DEPTH {
        return String::new();
    }
    match cell {
        Value::Null | Value::Number(_) | Value::Bool(_) => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| flatten_at(item, depth + 1))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(_) => cell.to_string().trim().to_string(),
    }
}

/// Parse the table of a full studio record.
pub fn parse_data_table(record: &Value) -> Result<DataTable> {
    let mut rows_array: &[Value] = &[];
    for (path, min_len) in ROW_PATH {
        rows_array = nav::require_array(record, path, min_len, KIND)?;
    }

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (index, row) in rows_array.iter().enumerate() {
        let Some(cells) = nav::array_at(row, &[2]) else {
            if index == 0 {
                return Err(Error::structure(
                    KIND,
                    format!("{}[0]", nav::format_path(&[18, 0, 0, 0, 0, 4, 2])),
                    "first row (headers) is malformed",
                ));
            }
            skipped += 1;
            continue;
        };
        let mut values: Vec<String> = cells.iter().map(flatten_cell).collect();

        match &headers {
            None => {
                if values.iter().all(String::is_empty) {
                    return Err(Error::structure(
                        KIND,
                        format!("{}[0]", nav::format_path(&[18, 0, 0, 0, 0, 4, 2])),
                        "first row (headers) is empty",
                    ));
                }
                headers = Some(values);
            }
            Some(h) => {
                values.resize(h.len(), String::new());
                rows.push(values);
            }
        }
    }

    let headers = headers.unwrap_or_default();
    if rows.is_empty() {
        return Err(Error::structure(
            KIND,
            nav::format_path(&[18, 0, 0, 0, 0, 4, 2]),
            format!("no data rows (skipped {skipped} malformed rows)"),
        ));
    }
    if skipped > 0 {
        debug!(skipped, "data table rows skipped");
    }
    Ok(DataTable { headers, rows })
}

impl DataTable {
    /// RFC 4180 CSV with a UTF-8 byte-order mark and CRLF line endings.
    pub fn to_csv(&self) -> String {
        let mut out = String::from(UTF8_BOM);
        for row in std::iter::once(&self.headers).chain(self.rows.iter()) {
            let line: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
            out.push_str(&line.join(","));
            out.push_str("\r\n");
        }
        out
    }
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
