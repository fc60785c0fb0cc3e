//! Delimited-text reader producing named rows.

use crate::error::{ConvertError, Result};
use csv::ReaderBuilder;
use log::{debug, warn};
use std::sync::Arc;

/// One data row of the input, keyed by the header's column names.
///
/// Rows are immutable once read. They share the header through an `Arc`
/// so that a few thousand rows do not each carry a copy of it.
#[derive(Debug, Clone)]
pub struct TabularRow {
    /// 0-based index among data rows (the header is not counted).
    pub index: usize,
    headers: Arc<[String]>,
    fields: Vec<String>,
}

impl TabularRow {
    /// Looks up a field by column name. The first matching column wins.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|pos| self.fields.get(pos))
            .map(String::as_str)
    }
}

/// Result of reading the input text.
#[derive(Debug)]
pub struct TabularData {
    pub headers: Vec<String>,
    pub rows: Vec<TabularRow>,
    /// Rows skipped because their field count did not match the header.
    /// Always empty in strict mode, where the first one aborts the read.
    pub malformed: Vec<ConvertError>,
}

/// Reads `text` into rows using `delimiter`.
///
/// The first record is the header. Blank lines, including lines of only
/// whitespace, are ignored and do not take a row index. Output order
/// equals input order.
pub fn read(text: &str, delimiter: u8, strict: bool) -> Result<TabularData> {
    if text.trim().is_empty() {
        return Err(ConvertError::EmptyInput);
    }

    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = csv_reader.records();

    let headers: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(|h| h.trim().to_string()).collect(),
        None => return Err(ConvertError::EmptyInput),
    };
    let shared: Arc<[String]> = headers.clone().into();

    let mut rows = Vec::new();
    let mut malformed = Vec::new();

    let mut index = 0;
    for result in records {
        let record = result?;

        // lines holding only spaces or tabs come through as one-field records
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let row = index;
        index += 1;

        if record.len() != headers.len() {
            let err = ConvertError::MalformedRow {
                row,
                expected: headers.len(),
                found: record.len(),
            };
            if strict {
                return Err(err);
            }
            warn!("{}", err);
            malformed.push(err);
            continue;
        }

        rows.push(TabularRow {
            index: row,
            headers: Arc::clone(&shared),
            fields: record.iter().map(str::to_string).collect(),
        });
    }

    debug!(
        "Read {} rows ({} malformed) with {} columns",
        rows.len(),
        malformed.len(),
        headers.len()
    );

    Ok(TabularData {
        headers,
        rows,
        malformed,
    })
}
