//! Export normalised output and observed predictions to CSV.
//!
//! Layouts:
//! - aggregated series: `date,value[,se]`
//! - raw ensemble:      `trial,date,value[,se]`
//! - observed:          `date,value[,se]`
//! - prepared dataset:  `date,<column>…` (readable by `ingest`)
//!
//! Missing values are written as empty cells.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::domain::{ColumnSource, Normalised, ObservedPrediction, PreparedDataset};
use crate::error::AppError;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write normalisation output to a CSV file.
pub fn write_normalised_csv(path: &Path, output: &Normalised) -> Result<(), AppError> {
    let file = create(path)?;
    write_normalised(file, output)
}

/// Write observed-weather predictions to a CSV file.
pub fn write_observed_csv(path: &Path, rows: &[ObservedPrediction]) -> Result<(), AppError> {
    let file = create(path)?;
    write_observed(file, rows)
}

/// Write a prepared dataset to a CSV file.
pub fn write_dataset_csv(path: &Path, dataset: &PreparedDataset) -> Result<(), AppError> {
    let file = create(path)?;
    write_dataset(file, dataset)
}

pub fn write_normalised<W: Write>(writer: W, output: &Normalised) -> Result<(), AppError> {
    let mut w = csv::Writer::from_writer(writer);
    let with_se = output.has_se();

    match output {
        Normalised::Series(rows) => {
            write_header(&mut w, &["date", "value"], with_se)?;
            for r in rows {
                let mut record = vec![fmt_date(r.date), fmt_value(r.value)];
                if with_se {
                    record.push(fmt_value(r.se.unwrap_or(f64::NAN)));
                }
                write_row(&mut w, &record)?;
            }
        }
        Normalised::Ensemble(records) => {
            write_header(&mut w, &["trial", "date", "value"], with_se)?;
            for r in records {
                let mut record = vec![r.trial.to_string(), fmt_date(r.date), fmt_value(r.value)];
                if with_se {
                    record.push(fmt_value(r.se.unwrap_or(f64::NAN)));
                }
                write_row(&mut w, &record)?;
            }
        }
    }

    w.flush()
        .map_err(|e| AppError::io(format!("Failed to flush export CSV: {e}")))
}

pub fn write_observed<W: Write>(writer: W, rows: &[ObservedPrediction]) -> Result<(), AppError> {
    let mut w = csv::Writer::from_writer(writer);
    let with_se = rows.first().is_some_and(|r| r.se.is_some());

    write_header(&mut w, &["date", "value"], with_se)?;
    for r in rows {
        let mut record = vec![fmt_date(r.date), fmt_value(r.value)];
        if with_se {
            record.push(fmt_value(r.se.unwrap_or(f64::NAN)));
        }
        write_row(&mut w, &record)?;
    }

    w.flush()
        .map_err(|e| AppError::io(format!("Failed to flush export CSV: {e}")))
}

pub fn write_dataset<W: Write>(writer: W, dataset: &PreparedDataset) -> Result<(), AppError> {
    let mut w = csv::Writer::from_writer(writer);
    let names = dataset.column_names();
    let columns: Vec<&[f64]> = names.iter().filter_map(|n| dataset.column(n)).collect();

    let header: Vec<&str> = std::iter::once("date").chain(names.iter().map(String::as_str)).collect();
    w.write_record(&header)
        .map_err(|e| AppError::io(format!("Failed to write export CSV header: {e}")))?;

    for (i, &date) in dataset.dates().iter().enumerate() {
        let record: Vec<String> = std::iter::once(fmt_date(date))
            .chain(columns.iter().map(|c| fmt_value(c[i])))
            .collect();
        write_row(&mut w, &record)?;
    }

    w.flush()
        .map_err(|e| AppError::io(format!("Failed to flush export CSV: {e}")))
}

fn create(path: &Path) -> Result<File, AppError> {
    File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))
}

fn write_header<W: Write>(w: &mut csv::Writer<W>, columns: &[&str], with_se: bool) -> Result<(), AppError> {
    let mut header: Vec<&str> = columns.to_vec();
    if with_se {
        header.push("se");
    }
    w.write_record(&header)
        .map_err(|e| AppError::io(format!("Failed to write export CSV header: {e}")))
}

fn write_row<W: Write>(w: &mut csv::Writer<W>, record: &[String]) -> Result<(), AppError> {
    w.write_record(record)
        .map_err(|e| AppError::io(format!("Failed to write export CSV row: {e}")))
}

fn fmt_date(d: NaiveDateTime) -> String {
    d.format(DATE_FORMAT).to_string()
}

fn fmt_value(v: f64) -> String {
    if v.is_nan() { String::new() } else { v.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NormalisedRow, PredictionRecord};
    use crate::io::ingest::parse_datetime;

    fn render(output: &Normalised) -> String {
        let mut buf = Vec::new();
        write_normalised(&mut buf, output).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn series_without_se() {
        let out = Normalised::Series(vec![
            NormalisedRow {
                date: parse_datetime("2020-01-01").unwrap(),
                value: 5.0,
                se: None,
            },
            NormalisedRow {
                date: parse_datetime("2020-01-02").unwrap(),
                value: f64::NAN,
                se: None,
            },
        ]);
        assert_eq!(
            render(&out),
            "date,value\n2020-01-01 00:00:00,5\n2020-01-02 00:00:00,\n"
        );
    }

    #[test]
    fn ensemble_with_se() {
        let out = Normalised::Ensemble(vec![PredictionRecord {
            trial: 3,
            date: parse_datetime("2020-01-01 06:00:00").unwrap(),
            value: 1.25,
            se: Some(0.5),
        }]);
        assert_eq!(render(&out), "trial,date,value,se\n3,2020-01-01 06:00:00,1.25,0.5\n");
    }

    #[test]
    fn dataset_round_trips_through_ingest() {
        let ds = PreparedDataset::new(vec![
            parse_datetime("2020-01-01").unwrap(),
            parse_datetime("2020-01-02").unwrap(),
        ])
        .with_column("date_unix", vec![1577836800.0, 1577923200.0])
        .unwrap()
        .with_column("ws", vec![1.5, f64::NAN])
        .unwrap();

        let mut buf = Vec::new();
        write_dataset(&mut buf, &ds).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("date,date_unix,ws\n"));

        let back = crate::io::ingest::read_dataset(text.as_bytes(), "date_unix").unwrap();
        assert_eq!(back.dates(), ds.dates());
        assert_eq!(back.column("ws").unwrap()[0], 1.5);
        assert!(back.column("ws").unwrap()[1].is_nan());
    }

    #[test]
    fn observed_rows() {
        let rows = vec![ObservedPrediction {
            date: parse_datetime("2021-02-03").unwrap(),
            value: 7.5,
            se: None,
        }];
        let mut buf = Vec::new();
        write_observed(&mut buf, &rows).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "date,value\n2021-02-03 00:00:00,7.5\n");
    }
}
