//! CSV ingest of a prepared dataset.
//!
//! The file must already be prepared upstream: a `date` column, the trend
//! column and numeric covariates. This module only parses and checks shape; it
//! does not derive columns or impute anything.
//!
//! - `date` accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS[Z]` and `YYYY-MM-DD`
//! - empty cells and `NA`/`NaN` are missing values (`NaN`)
//! - columns holding any other non-numeric text are dropped

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::PreparedDataset;
use crate::error::AppError;

/// Name of the timestamp column.
pub const DATE_COLUMN: &str = "date";

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%d %H:%M",
];

/// Load a prepared dataset from a CSV file.
pub fn load_dataset(path: &Path, trend_column: &str) -> Result<PreparedDataset, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_dataset(file, trend_column)
}

/// Parse a prepared dataset from CSV text.
pub fn read_dataset<R: Read>(reader: R, trend_column: &str) -> Result<PreparedDataset, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::invalid_input(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let date_idx = headers
        .iter()
        .position(|h| h == DATE_COLUMN)
        .ok_or_else(|| AppError::invalid_input(format!("CSV has no '{DATE_COLUMN}' column.")))?;
    if !headers.iter().any(|h| h == trend_column) {
        return Err(AppError::invalid_input(format!(
            "CSV has no trend column '{trend_column}'."
        )));
    }

    let mut dates = Vec::new();
    // (header index, parsed values, still numeric?)
    let mut columns: Vec<(usize, Vec<f64>, bool)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != date_idx)
        .map(|(i, _)| (i, Vec::new(), true))
        .collect();

    for record in reader.records() {
        let record = record.map_err(|e| AppError::invalid_input(format!("Malformed CSV row: {e}")))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let raw_date = record.get(date_idx).unwrap_or("");
        let date = parse_datetime(raw_date).ok_or_else(|| {
            AppError::invalid_input(format!("Line {line}: cannot parse date '{raw_date}'."))
        })?;
        dates.push(date);

        for (idx, values, numeric) in columns.iter_mut() {
            if !*numeric {
                continue;
            }
            match parse_cell(record.get(*idx).unwrap_or("")) {
                Some(v) => values.push(v),
                None => *numeric = false,
            }
        }
    }

    if dates.is_empty() {
        return Err(AppError::invalid_input("CSV has no data rows."));
    }

    let mut dataset = PreparedDataset::new(dates);
    for (idx, values, numeric) in columns {
        let name = &headers[idx];
        if numeric {
            dataset.insert_column(name, values)?;
        } else if name == trend_column {
            return Err(AppError::invalid_input(format!(
                "Trend column '{trend_column}' is not numeric."
            )));
        } else {
            tracing::debug!(column = name, "dropping non-numeric column");
        }
    }

    Ok(dataset)
}

/// Parse a timestamp in any of the accepted formats.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_cell(s: &str) -> Option<f64> {
    if s.is_empty() || s.eq_ignore_ascii_case("na") || s.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    s.parse::<f64>().ok()
}
