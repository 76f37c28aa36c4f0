//! Covariate resampling for a single trial.
//!
//! One index vector is drawn per trial and applied to every selected covariate,
//! so covariates stay jointly consistent within the trial while being decoupled
//! from the date/trend axis. The trend column and dates are never touched.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::domain::{ColumnSource, PreparedDataset};
use crate::error::AppError;

/// Resolve the covariates to resample.
///
/// With no explicit list, every model feature except the trend column is used.
/// Explicit lists must name existing dataset columns and must not include the
/// trend column.
pub fn resolve_variables(
    requested: Option<&[String]>,
    model_features: &[String],
    trend_column: &str,
    dataset: &PreparedDataset,
) -> Result<Vec<String>, AppError> {
    let variables: Vec<String> = match requested {
        Some(list) => list.to_vec(),
        None => model_features
            .iter()
            .filter(|name| name.as_str() != trend_column)
            .cloned()
            .collect(),
    };

    for (i, name) in variables.iter().enumerate() {
        if name == trend_column {
            return Err(AppError::invalid_input(format!(
                "The trend column '{trend_column}' cannot be resampled."
            )));
        }
        if !dataset.has_column(name) {
            return Err(AppError::invalid_input(format!(
                "Variable '{name}' is not a column of the dataset."
            )));
        }
        if variables[..i].contains(name) {
            return Err(AppError::invalid_input(format!("Variable '{name}' is listed twice.")));
        }
    }

    Ok(variables)
}

/// Draw `n` row indices in `[0, n)`.
///
/// With `replace` the draws are independent and uniform (repeats allowed);
/// otherwise the result is a uniformly random permutation.
pub fn draw_indices<R: Rng + ?Sized>(n: usize, replace: bool, rng: &mut R) -> Vec<usize> {
    if replace {
        (0..n).map(|_| rng.gen_range(0..n)).collect()
    } else {
        let mut idx: Vec<usize> = (0..n).collect();
        idx.shuffle(rng);
        idx
    }
}

/// One trial's resampled view of the dataset.
///
/// Only the resampled covariates are materialised; every other column (trend,
/// response, unused extras) is read straight from the base dataset.
#[derive(Debug, Clone)]
pub struct SampleDraw<'a> {
    base: &'a PreparedDataset,
    indices: Vec<usize>,
    resampled: Vec<(String, Vec<f64>)>,
}

impl<'a> SampleDraw<'a> {
    /// Apply `indices` to each of `variables`.
    pub fn from_indices(
        base: &'a PreparedDataset,
        variables: &[String],
        indices: Vec<usize>,
    ) -> Result<Self, AppError> {
        let n = base.n_rows();
        if indices.len() != n {
            return Err(AppError::invalid_input(format!(
                "Index draw has {} entries for {n} rows.",
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= n) {
            return Err(AppError::invalid_input(format!(
                "Index {bad} is out of range for {n} rows."
            )));
        }

        let mut resampled = Vec::with_capacity(variables.len());
        for name in variables {
            let col = base.column(name).ok_or_else(|| {
                AppError::invalid_input(format!("Variable '{name}' is not a column of the dataset."))
            })?;
            resampled.push((name.clone(), indices.iter().map(|&i| col[i]).collect()));
        }

        Ok(Self {
            base,
            indices,
            resampled,
        })
    }

    /// Draw a fresh index vector and resample `variables` with it.
    pub fn draw<R: Rng + ?Sized>(
        base: &'a PreparedDataset,
        variables: &[String],
        replace: bool,
        rng: &mut R,
    ) -> Result<Self, AppError> {
        let indices = draw_indices(base.n_rows(), replace, rng);
        Self::from_indices(base, variables, indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn base(&self) -> &'a PreparedDataset {
        self.base
    }
}

impl ColumnSource for SampleDraw<'_> {
    fn n_rows(&self) -> usize {
        self.base.n_rows()
    }

    fn column(&self, name: &str) -> Option<&[f64]> {
        self.resampled
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
            .or_else(|| self.base.column(name))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::error::ErrorKind;

    fn dataset(n: usize) -> PreparedDataset {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let dates: Vec<_> = (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect();
        let trend: Vec<f64> = dates.iter().map(|d| d.and_utc().timestamp() as f64).collect();
        PreparedDataset::new(dates)
            .with_column("date_unix", trend)
            .unwrap()
            .with_column("ws", (0..n).map(|i| i as f64).collect())
            .unwrap()
            .with_column("air_temp", (0..n).map(|i| 100.0 + i as f64).collect())
            .unwrap()
            .with_column("value", vec![1.0; n])
            .unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn permutation_without_replacement() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut idx = draw_indices(50, false, &mut rng);
            idx.sort_unstable();
            assert_eq!(idx, (0..50).collect::<Vec<_>>());
        }
    }

    #[test]
    fn bootstrap_draw_stays_in_range_and_repeats() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut saw_repeat = false;
        for _ in 0..20 {
            let idx = draw_indices(50, true, &mut rng);
            assert_eq!(idx.len(), 50);
            assert!(idx.iter().all(|&i| i < 50));
            let mut sorted = idx.clone();
            sorted.sort_unstable();
            sorted.dedup();
            saw_repeat |= sorted.len() < 50;
        }
        assert!(saw_repeat);
    }

    #[test]
    fn empty_dataset_draws_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(draw_indices(0, true, &mut rng).is_empty());
        assert!(draw_indices(0, false, &mut rng).is_empty());
    }

    #[test]
    fn trend_and_untouched_columns_are_preserved() {
        let ds = dataset(30);
        let vars = names(&["ws", "air_temp"]);
        let mut rng = StdRng::seed_from_u64(3);

        for replace in [true, false] {
            let draw = SampleDraw::draw(&ds, &vars, replace, &mut rng).unwrap();
            assert_eq!(draw.column("date_unix"), ds.column("date_unix"));
            assert_eq!(draw.column("value"), ds.column("value"));
            assert_eq!(draw.n_rows(), ds.n_rows());
            assert_eq!(draw.base().dates(), ds.dates());
        }
    }

    #[test]
    fn covariates_share_one_index_vector() {
        let ds = dataset(30);
        let vars = names(&["ws", "air_temp"]);
        let mut rng = StdRng::seed_from_u64(5);
        let draw = SampleDraw::draw(&ds, &vars, true, &mut rng).unwrap();

        let ws = draw.column("ws").unwrap();
        let temp = draw.column("air_temp").unwrap();
        for (row, &src) in draw.indices().iter().enumerate() {
            assert_eq!(ws[row], src as f64);
            assert_eq!(temp[row], 100.0 + src as f64);
        }
    }

    #[test]
    fn default_variables_exclude_trend() {
        let ds = dataset(3);
        let features = names(&["date_unix", "ws", "air_temp"]);
        let vars = resolve_variables(None, &features, "date_unix", &ds).unwrap();
        assert_eq!(vars, names(&["ws", "air_temp"]));
    }

    #[test]
    fn explicit_variables_are_checked() {
        let ds = dataset(3);
        let features = names(&["date_unix", "ws"]);

        let err = resolve_variables(Some(&names(&["date_unix"])), &features, "date_unix", &ds)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = resolve_variables(Some(&names(&["rh"])), &features, "date_unix", &ds).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = resolve_variables(Some(&names(&["ws", "ws"])), &features, "date_unix", &ds)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        // Columns outside the model's features may still be resampled.
        let vars = resolve_variables(Some(&names(&["air_temp"])), &features, "date_unix", &ds).unwrap();
        assert_eq!(vars, names(&["air_temp"]));
    }

    #[test]
    fn from_indices_rejects_bad_draws() {
        let ds = dataset(3);
        let vars = names(&["ws"]);
        assert!(SampleDraw::from_indices(&ds, &vars, vec![0, 1]).is_err());
        assert!(SampleDraw::from_indices(&ds, &vars, vec![0, 1, 3]).is_err());
        let draw = SampleDraw::from_indices(&ds, &vars, vec![2, 2, 0]).unwrap();
        assert_eq!(draw.column("ws"), Some(&[2.0, 2.0, 0.0][..]));
    }
}
