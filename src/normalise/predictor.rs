//! Adapter between a (resampled) dataset and the surrogate's prediction routines.
//!
//! The adapter selects exactly the model's declared features from whatever
//! columns the source offers, so extra columns are harmless.

use crate::domain::ColumnSource;
use crate::error::AppError;
use crate::models::{FeatureMatrix, PredictionResult, Surrogate};

/// Check that `model` can serve a call, before any trial is dispatched.
pub fn check_model<M: Surrogate + ?Sized>(model: &M, want_se: bool) -> Result<(), AppError> {
    let caps = model.capabilities();
    if !caps.predict {
        return Err(AppError::invalid_model("Model does not expose a prediction routine."));
    }
    if model.feature_names().is_empty() {
        return Err(AppError::invalid_model("Model does not declare any feature names."));
    }
    model.validate()?;
    if want_se && !caps.standard_error {
        return Err(AppError::unsupported(
            "Standard errors were requested but the model cannot estimate them.",
        ));
    }
    Ok(())
}

/// Check that `source` carries every feature the model was trained on.
pub fn check_features<S: ColumnSource + ?Sized>(names: &[String], source: &S) -> Result<(), AppError> {
    let missing: Vec<&str> = names
        .iter()
        .filter(|n| source.column(n).is_none())
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::invalid_input(format!(
            "Dataset is missing model feature column(s): {}.",
            missing.join(", ")
        )))
    }
}

/// Build the model's feature view over `source`.
pub fn feature_matrix<'a, S: ColumnSource + ?Sized>(
    names: &'a [String],
    source: &'a S,
) -> Result<FeatureMatrix<'a>, AppError> {
    check_features(names, source)?;
    let columns = names
        .iter()
        .filter_map(|n| source.column(n))
        .collect::<Vec<_>>();
    Ok(FeatureMatrix::new(names, columns, source.n_rows()))
}

/// Predict every row of `source`, with standard errors when `se` is set.
pub fn predict<M, S>(model: &M, source: &S, se: bool, threads: usize) -> Result<PredictionResult, AppError>
where
    M: Surrogate + ?Sized,
    S: ColumnSource + ?Sized,
{
    let features = feature_matrix(model.feature_names(), source)?;
    let n = features.n_rows();
    let threads = threads.max(1);

    let result = if se {
        let (values, errors) = model.predict_with_se(&features, threads)?;
        if errors.len() != n {
            return Err(AppError::invalid_model(format!(
                "Model returned {} standard errors for {n} rows.",
                errors.len()
            )));
        }
        PredictionResult::with_standard_errors(values, errors)
    } else {
        PredictionResult::plain(model.predict(&features, threads)?)
    };

    if result.len() != n {
        return Err(AppError::invalid_model(format!(
            "Model returned {} predictions for {n} rows.",
            result.len()
        )));
    }
    Ok(result)
}
