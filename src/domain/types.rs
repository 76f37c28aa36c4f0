//! Shared domain types.
//!
//! Missing numeric values are represented as `f64::NAN` throughout, both in
//! dataset columns and in predictions.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::AppError;

/// Default name of the trend column held fixed during resampling.
pub const DEFAULT_TREND_COLUMN: &str = "date_unix";

/// Default number of resampling trials.
pub const DEFAULT_N_SAMPLES: usize = 300;

/// Read-only access to named numeric columns of equal length.
///
/// Implemented by the prepared dataset itself and by each trial's resampled
/// view of it, so the predictor can work on either.
pub trait ColumnSource {
    fn n_rows(&self) -> usize;
    fn column(&self, name: &str) -> Option<&[f64]>;
}

/// A prepared, time-indexed dataset.
///
/// Rows are ordered by the `date` axis as supplied; every column has exactly
/// one value per date.
#[derive(Debug, Clone, Default)]
pub struct PreparedDataset {
    dates: Vec<NaiveDateTime>,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl PreparedDataset {
    pub fn new(dates: Vec<NaiveDateTime>) -> Self {
        Self {
            dates,
            names: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Add (or replace) a numeric column.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self, AppError> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), AppError> {
        let name = name.into();
        if values.len() != self.dates.len() {
            return Err(AppError::invalid_input(format!(
                "Column '{name}' has {} values but the dataset has {} dates.",
                values.len(),
                self.dates.len()
            )));
        }
        match self.names.iter().position(|n| *n == name) {
            Some(idx) => self.columns[idx] = values,
            None => {
                self.names.push(name);
                self.columns.push(values);
            }
        }
        Ok(())
    }

    pub fn dates(&self) -> &[NaiveDateTime] {
        &self.dates
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn distinct_dates(&self) -> usize {
        self.dates.iter().collect::<BTreeSet<_>>().len()
    }
}

impl ColumnSource for PreparedDataset {
    fn n_rows(&self) -> usize {
        self.dates.len()
    }

    fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.columns[idx].as_slice())
    }
}

/// One trial's prediction for one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRecord {
    /// 1-based trial id.
    pub trial: usize,
    pub date: NaiveDateTime,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub se: Option<f64>,
}

/// One row of the normalised series: the ensemble mean for a single date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalisedRow {
    pub date: NaiveDateTime,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub se: Option<f64>,
}

/// Prediction on the observed (not resampled) covariates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservedPrediction {
    pub date: NaiveDateTime,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub se: Option<f64>,
}

/// Output of a normalisation call.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalised {
    /// One row per distinct date, sorted by date.
    Series(Vec<NormalisedRow>),
    /// Every trial's raw predictions, in no particular trial order.
    Ensemble(Vec<PredictionRecord>),
}

impl Normalised {
    pub fn len(&self) -> usize {
        match self {
            Normalised::Series(rows) => rows.len(),
            Normalised::Ensemble(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_se(&self) -> bool {
        match self {
            Normalised::Series(rows) => rows.first().is_some_and(|r| r.se.is_some()),
            Normalised::Ensemble(records) => records.first().is_some_and(|r| r.se.is_some()),
        }
    }
}

/// Configuration of a single normalisation call.
#[derive(Debug, Clone)]
pub struct NormaliseConfig {
    /// Covariates to resample. `None` means every model feature except the
    /// trend column.
    pub variables: Option<Vec<String>>,
    pub n_samples: usize,
    /// Draw row indices with replacement (bootstrap) or as a permutation.
    pub replace: bool,
    /// Also estimate standard errors.
    pub se: bool,
    /// Reduce the ensemble to one row per date.
    pub aggregate: bool,
    /// Worker pool size. `None` means [`default_n_cores`].
    pub n_cores: Option<usize>,
    /// Log progress through [`crate::normalise::LogProgress`].
    pub verbose: bool,
    /// Base seed for every trial's generator. `None` draws one from entropy.
    pub seed: Option<u64>,
    pub trend_column: String,
    /// Resource hint passed to the model's prediction routine.
    pub predict_threads: usize,
}

impl Default for NormaliseConfig {
    fn default() -> Self {
        Self {
            variables: None,
            n_samples: DEFAULT_N_SAMPLES,
            replace: true,
            se: false,
            aggregate: true,
            n_cores: None,
            verbose: false,
            seed: None,
            trend_column: DEFAULT_TREND_COLUMN.to_string(),
            predict_threads: 1,
        }
    }
}

impl NormaliseConfig {
    /// Worker pool size after applying the default.
    pub fn resolved_n_cores(&self) -> usize {
        self.n_cores.unwrap_or_else(default_n_cores)
    }
}

/// Available hardware threads minus one, never less than one.
pub fn default_n_cores() -> usize {
    std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn column_length_must_match_dates() {
        let err = PreparedDataset::new(vec![day(1), day(2)])
            .with_column("ws", vec![1.0])
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
    }

    #[test]
    fn insert_replaces_existing_column() {
        let mut ds = PreparedDataset::new(vec![day(1), day(2)])
            .with_column("ws", vec![1.0, 2.0])
            .unwrap();
        ds.insert_column("ws", vec![3.0, 4.0]).unwrap();
        assert_eq!(ds.column_names().len(), 1);
        assert_eq!(ds.column("ws"), Some(&[3.0, 4.0][..]));
    }

    #[test]
    fn distinct_dates_ignores_duplicates() {
        let ds = PreparedDataset::new(vec![day(1), day(1), day(2)]);
        assert_eq!(ds.distinct_dates(), 2);
        assert_eq!(ds.n_rows(), 3);
    }

    #[test]
    fn default_config_matches_documented_defaults() {
        let c = NormaliseConfig::default();
        assert_eq!(c.n_samples, 300);
        assert!(c.replace);
        assert!(!c.se);
        assert!(c.aggregate);
        assert!(!c.verbose);
        assert_eq!(c.trend_column, "date_unix");
        assert!(c.resolved_n_cores() >= 1);
    }
}
