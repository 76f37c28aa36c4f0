//! The contract between the engine and a trained predictive model.
//!
//! The engine never trains anything. It only needs:
//! - the feature names the model was trained on
//! - a plain prediction routine
//! - optionally, a (slower) prediction routine that also estimates standard errors

use crate::error::AppError;

/// What a model can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub predict: bool,
    pub standard_error: bool,
}

impl Capabilities {
    pub const PREDICT_ONLY: Capabilities = Capabilities {
        predict: true,
        standard_error: false,
    };

    pub const WITH_STANDARD_ERROR: Capabilities = Capabilities {
        predict: true,
        standard_error: true,
    };
}

/// Column-major view over exactly the model's features, in the model's order.
#[derive(Debug, Clone)]
pub struct FeatureMatrix<'a> {
    names: &'a [String],
    columns: Vec<&'a [f64]>,
    n_rows: usize,
}

impl<'a> FeatureMatrix<'a> {
    /// # Panics
    /// Panics if `columns` and `names` differ in length or a column is not
    /// `n_rows` long. The predictor adapter builds these from validated data.
    pub fn new(names: &'a [String], columns: Vec<&'a [f64]>, n_rows: usize) -> Self {
        assert_eq!(names.len(), columns.len(), "one column per feature name");
        assert!(columns.iter().all(|c| c.len() == n_rows), "ragged feature matrix");
        Self {
            names,
            columns,
            n_rows,
        }
    }

    pub fn names(&self) -> &[String] {
        self.names
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, j: usize) -> &[f64] {
        self.columns[j]
    }

    /// Fill `out` with the feature values of row `i`.
    pub fn fill_row(&self, i: usize, out: &mut [f64]) {
        for (slot, col) in out.iter_mut().zip(&self.columns) {
            *slot = col[i];
        }
    }
}

/// Predictions for every row of a feature matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub values: Vec<f64>,
    pub standard_errors: Option<Vec<f64>>,
}

impl PredictionResult {
    pub fn plain(values: Vec<f64>) -> Self {
        Self {
            values,
            standard_errors: None,
        }
    }

    pub fn with_standard_errors(values: Vec<f64>, standard_errors: Vec<f64>) -> Self {
        Self {
            values,
            standard_errors: Some(standard_errors),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A trained model usable as the weather surrogate.
///
/// Implementations are shared read-only across all trials of a call, hence `Sync`.
pub trait Surrogate: Sync {
    /// Names of the features the model was trained on, in prediction order.
    fn feature_names(&self) -> &[String];

    fn capabilities(&self) -> Capabilities {
        Capabilities::PREDICT_ONLY
    }

    /// Check internal consistency before any trial runs.
    fn validate(&self) -> Result<(), AppError> {
        Ok(())
    }

    /// Predict one value per row. Missing inputs may yield `NaN`.
    ///
    /// `threads` bounds the number of parallel tasks the call may spread rows
    /// over; tasks run on the caller's rayon pool.
    fn predict(&self, features: &FeatureMatrix<'_>, threads: usize) -> Result<Vec<f64>, AppError>;

    /// Predict values together with their standard errors.
    fn predict_with_se(
        &self,
        features: &FeatureMatrix<'_>,
        threads: usize,
    ) -> Result<(Vec<f64>, Vec<f64>), AppError> {
        let _ = (features, threads);
        Err(AppError::unsupported(
            "This model does not support standard error estimation.",
        ))
    }
}
