//! Linear surrogate: `y = b0 + Σ b_i x_i`.
//!
//! This is a loaded model, not a trained one. Coefficients (and optionally their
//! covariance matrix) come from an upstream fitting step and are read from JSON
//! by `io::model`.
//!
//! Standard errors use the coefficient covariance `Σ` over `[b0, b_1, …]`:
//!
//! ```text
//! se(x) = sqrt(x̃ᵀ Σ x̃),  x̃ = [1, x_1, …]
//! ```

use std::ops::Range;

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::model::{Capabilities, FeatureMatrix, Surrogate};

/// One named coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearTerm {
    pub name: String,
    pub coefficient: f64,
}

/// On-disk representation of a linear surrogate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModelFile {
    pub intercept: f64,
    pub terms: Vec<LinearTerm>,
    /// Row-major `(p + 1) × (p + 1)` covariance over `[intercept, terms…]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covariance: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Clone)]
pub struct LinearSurrogate {
    intercept: f64,
    names: Vec<String>,
    coefficients: Vec<f64>,
    covariance: Option<Vec<Vec<f64>>>,
}

impl LinearSurrogate {
    pub fn new(intercept: f64, terms: Vec<LinearTerm>, covariance: Option<Vec<Vec<f64>>>) -> Self {
        let (names, coefficients) = terms.into_iter().map(|t| (t.name, t.coefficient)).unzip();
        Self {
            intercept,
            names,
            coefficients,
            covariance,
        }
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn to_file(&self) -> LinearModelFile {
        LinearModelFile {
            intercept: self.intercept,
            terms: self
                .names
                .iter()
                .zip(&self.coefficients)
                .map(|(name, &coefficient)| LinearTerm {
                    name: name.clone(),
                    coefficient,
                })
                .collect(),
            covariance: self.covariance.clone(),
        }
    }

    fn point(&self, row: &[f64]) -> f64 {
        let mut y = self.intercept;
        for (b, x) in self.coefficients.iter().zip(row) {
            y += b * x;
        }
        y
    }

    /// The matrix must carry this model's features, in this model's order.
    fn check_layout(&self, features: &FeatureMatrix<'_>) -> Result<(), AppError> {
        if features.names() != self.names.as_slice() {
            return Err(AppError::invalid_model(format!(
                "Feature layout {:?} does not match the model terms {:?}.",
                features.names(),
                self.names
            )));
        }
        Ok(())
    }

    fn covariance_matrix(&self) -> Result<DMatrix<f64>, AppError> {
        let rows = self
            .covariance
            .as_ref()
            .ok_or_else(|| AppError::unsupported("Linear surrogate has no coefficient covariance."))?;
        let k = self.coefficients.len() + 1;
        check_covariance_shape(rows, k)?;
        Ok(DMatrix::from_fn(k, k, |i, j| rows[i][j]))
    }
}

impl From<LinearModelFile> for LinearSurrogate {
    fn from(file: LinearModelFile) -> Self {
        LinearSurrogate::new(file.intercept, file.terms, file.covariance)
    }
}

impl Surrogate for LinearSurrogate {
    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn capabilities(&self) -> Capabilities {
        if self.covariance.is_some() {
            Capabilities::WITH_STANDARD_ERROR
        } else {
            Capabilities::PREDICT_ONLY
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.names.is_empty() {
            return Err(AppError::invalid_model("Linear surrogate has no terms."));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|b| !b.is_finite()) {
            return Err(AppError::invalid_model(
                "Linear surrogate has non-finite coefficients.",
            ));
        }
        if let Some(rows) = &self.covariance {
            check_covariance_shape(rows, self.coefficients.len() + 1)?;
        }
        Ok(())
    }

    fn predict(&self, features: &FeatureMatrix<'_>, threads: usize) -> Result<Vec<f64>, AppError> {
        self.check_layout(features)?;
        Ok(map_rows(features, threads, |row| self.point(row)))
    }

    fn predict_with_se(
        &self,
        features: &FeatureMatrix<'_>,
        threads: usize,
    ) -> Result<(Vec<f64>, Vec<f64>), AppError> {
        self.check_layout(features)?;
        let sigma = self.covariance_matrix()?;
        let k = features.n_features() + 1;

        let pairs = map_rows(features, threads, |row| {
            let y = self.point(row);
            let x = DVector::from_iterator(k, std::iter::once(1.0).chain(row.iter().copied()));
            let var = x.dot(&(&sigma * &x));
            // NaN inputs propagate; tiny negative variances are rounding noise.
            let se = if var.is_nan() { f64::NAN } else { var.max(0.0).sqrt() };
            (y, se)
        });

        Ok(pairs.into_iter().unzip())
    }
}

/// Split `0..n` into at most `threads` contiguous ranges of near-equal size.
fn row_chunks(n: usize, threads: usize) -> Vec<Range<usize>> {
    let parts = threads.clamp(1, n.max(1));
    let size = n.div_ceil(parts).max(1);
    (0..n).step_by(size).map(|start| start..(start + size).min(n)).collect()
}

/// Evaluate every row, spread over at most `threads` parallel tasks.
/// Output stays in row order.
fn map_rows<T, F>(features: &FeatureMatrix<'_>, threads: usize, eval: F) -> Vec<T>
where
    T: Send,
    F: Fn(&[f64]) -> T + Sync,
{
    let run = |rows: Range<usize>| -> Vec<T> {
        let mut row = vec![0.0; features.n_features()];
        rows.map(|i| {
            features.fill_row(i, &mut row);
            eval(row.as_slice())
        })
        .collect()
    };

    if threads <= 1 {
        return run(0..features.n_rows());
    }
    let chunks: Vec<Vec<T>> = row_chunks(features.n_rows(), threads)
        .into_par_iter()
        .map(run)
        .collect();
    chunks.into_iter().flatten().collect()
}

fn check_covariance_shape(rows: &[Vec<f64>], k: usize) -> Result<(), AppError> {
    if rows.len() != k || rows.iter().any(|r| r.len() != k) {
        return Err(AppError::invalid_model(format!(
            "Covariance matrix must be {k}x{k} (intercept plus one row per term)."
        )));
    }
    if rows.iter().flatten().any(|v| !v.is_finite()) {
        return Err(AppError::invalid_model("Covariance matrix has non-finite entries."));
    }
    Ok(())
}
