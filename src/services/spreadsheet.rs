//! Reads the first worksheet of an uploaded workbook into plain strings.
//!
//! The first row is the header. Header cells are trimmed; empty ones become
//! `Unnamed: <index>` and repeated ones get a `.N` suffix, so every column has
//! a distinct name. Data cells are trimmed strings, `""` for empty cells.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Sheet {
    pub(crate) headers: Vec<String>,
    pub(crate) rows: Vec<Vec<String>>,
}

#[derive(Debug, Error)]
pub(crate) enum WorkbookError {
    #[error("workbook contains no worksheets")]
    NoWorksheet,
    #[error("{0}")]
    Read(#[from] calamine::Error),
    #[error("workbook parsing was interrupted: {0}")]
    Interrupted(String),
}

pub(crate) fn read_first_sheet(bytes: Vec<u8>) -> Result<Sheet, WorkbookError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook.worksheet_range_at(0).ok_or(WorkbookError::NoWorksheet)??;

    let rows = range.rows().map(|row| row.iter().map(cell_text).collect()).collect();
    Ok(sheet_from_rows(rows))
}

/// Parses on the blocking pool; large workbooks take a while to inflate.
pub(crate) async fn read_first_sheet_blocking(bytes: Vec<u8>) -> Result<Sheet, WorkbookError> {
    tokio::task::spawn_blocking(move || read_first_sheet(bytes))
        .await
        .map_err(|err| WorkbookError::Interrupted(err.to_string()))?
}

pub(crate) fn sheet_from_rows(rows: Vec<Vec<String>>) -> Sheet {
    let mut rows = rows.into_iter();
    let Some(header_row) = rows.next() else {
        return Sheet { headers: Vec::new(), rows: Vec::new() };
    };

    let headers = normalize_headers(header_row);
    let width = headers.len();
    let rows = rows
        .map(|row| {
            let mut cells: Vec<String> =
                row.into_iter().take(width).map(|cell| cell.trim().to_string()).collect();
            cells.resize(width, String::new());
            cells
        })
        .collect();

    Sheet { headers, rows }
}

fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    raw.into_iter()
        .enumerate()
        .map(|(index, cell)| {
            let trimmed = cell.trim();
            let base =
                if trimmed.is_empty() { format!("Unnamed: {index}") } else { trimmed.to_string() };

            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 { base } else { format!("{base}.{count}") };
            *count += 1;
            name
        })
        .collect()
}

pub(crate) fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.trim().to_string(),
        Data::Float(value) => format_number(*value),
        Data::Int(value) => value.to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Whole floats print without a fraction so numeric register numbers such as
/// `101.0` read back as `101`.
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
