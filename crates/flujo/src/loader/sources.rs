//! Readers turning files into [`Table`]s.

use super::tabular::{Sheet, Table};
use crate::error::{FlujoError, Result};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use std::path::Path;

const SNIFF_LINES: usize = 10;
const DELIMITERS: &[u8] = &[b'\t', b';', b',', b'|'];

/// Read a delimited text file. The first record is the header row.
///
/// Files that are not valid UTF-8 are decoded as Windows-1252, the encoding
/// spreadsheet programs commonly use for CSV exports. The delimiter is
/// sniffed from the first lines.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let origin = path.display().to_string();

    let content = read_text(path).map_err(|e| FlujoError::unreadable(&origin, e))?;
    let delimiter = sniff_delimiter(&content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| FlujoError::unreadable(&origin, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| FlujoError::unreadable(&origin, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    log::debug!(
        "Read {} rows from {} (delimiter {:?})",
        rows.len(),
        origin,
        delimiter as char
    );
    Ok(Table::single(Sheet::new(name, headers, rows)))
}

fn read_text(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
            log::debug!("{} is not UTF-8, decoded as Windows-1252", path.display());
            Ok(decoded.into_owned())
        }
    }
}

/// Read every sheet of a workbook (xlsx, xlsm, xls, xlsb, ods). The first
/// row of each sheet is its header row; empty sheets are skipped.
pub fn read_workbook<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let origin = path.display().to_string();

    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| FlujoError::unreadable(&origin, e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(FlujoError::unreadable(&origin, "workbook contains no sheets"));
    }

    let mut table = Table::default();
    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| FlujoError::unreadable(&origin, format!("sheet '{}': {}", sheet_name, e)))?;

        let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
        let Some(headers) = rows.next() else {
            log::debug!("Skipping empty sheet '{}'", sheet_name);
            continue;
        };

        table.sheets.push(Sheet::new(sheet_name, headers, rows.collect()));
    }

    Ok(table)
}

/// Pick the delimiter that splits the sampled lines most consistently.
///
/// For each candidate, every non-blank line is parsed and its field count
/// taken. The most common count above one is the candidate's width; the
/// candidate agreeing with its width on the most lines wins, wider first on
/// a tie.
fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    let mut best = b',';
    let mut best_score = (0usize, 0usize);

    for &delimiter in DELIMITERS {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| field_count(line, delimiter))
            .collect();

        let mut widths: BTreeMap<usize, usize> = BTreeMap::new();
        for &count in counts.iter().filter(|&&c| c > 1) {
            *widths.entry(count).or_default() += 1;
        }

        let Some((width, consistent)) = widths
            .into_iter()
            .max_by_key(|&(width, lines)| (lines, width))
        else {
            continue;
        };

        if (consistent, width) > best_score {
            best_score = (consistent, width);
            best = delimiter;
        }
    }

    best
}

fn field_count(line: &str, delimiter: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(|r| r.ok())
        .map(|r| r.len())
        .unwrap_or(1)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        Data::Int(n) => n.to_string(),
        Data::DateTime(dt) => serial_date(dt.as_f64()).unwrap_or_else(|| dt.as_f64().to_string()),
        other => other.to_string(),
    }
}

/// Render a 1900-system spreadsheet serial as an ISO date.
fn serial_date(serial: f64) -> Option<String> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_signed(Duration::days(serial.floor() as i64))?;
    Some(date.format("%Y-%m-%d").to_string())
}
