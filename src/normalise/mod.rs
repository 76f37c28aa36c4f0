//! Meteorological normalisation.
//!
//! Responsibilities:
//!
//! - validate the model, dataset and configuration up front
//! - resample covariates per trial, holding the trend column fixed (`sampler`)
//! - predict each resampled dataset (`predictor`)
//! - fan trials out over a bounded worker pool (`trials`)
//! - reduce the ensemble to one mean per date (`aggregate`)

pub mod aggregate;
pub mod predictor;
pub mod progress;
pub mod sampler;
pub mod trials;

pub use aggregate::*;
pub use progress::*;
pub use sampler::{SampleDraw, draw_indices, resolve_variables};
pub use trials::{TrialPlan, run_trial, run_trials, trial_seed};

use rand::Rng;

use crate::domain::{Normalised, NormaliseConfig, ObservedPrediction, PreparedDataset};
use crate::error::AppError;
use crate::models::Surrogate;

/// Normalise `dataset` against `model`.
///
/// Progress goes to the log when `config.verbose` is set and nowhere otherwise.
pub fn normalise<M: Surrogate + ?Sized>(
    model: &M,
    dataset: &PreparedDataset,
    config: &NormaliseConfig,
) -> Result<Normalised, AppError> {
    if config.verbose {
        normalise_with_progress(model, dataset, config, &LogProgress)
    } else {
        normalise_with_progress(model, dataset, config, &Silent)
    }
}

/// Like [`normalise`], but progress always goes to `progress`
/// (`config.verbose` is not consulted).
pub fn normalise_with_progress<M, P>(
    model: &M,
    dataset: &PreparedDataset,
    config: &NormaliseConfig,
    progress: &P,
) -> Result<Normalised, AppError>
where
    M: Surrogate + ?Sized,
    P: ProgressSink + ?Sized,
{
    check_config(config)?;
    predictor::check_model(model, config.se)?;
    check_dataset(dataset, &config.trend_column)?;
    predictor::check_features(model.feature_names(), dataset)?;

    // Resolved once here so every trial resamples the same columns.
    let variables = resolve_variables(
        config.variables.as_deref(),
        model.feature_names(),
        &config.trend_column,
        dataset,
    )?;
    if variables.is_empty() {
        tracing::warn!("No covariates to resample; every trial predicts the observed data.");
    }

    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().r#gen());
    let plan = TrialPlan {
        variables: &variables,
        n_samples: config.n_samples,
        replace: config.replace,
        se: config.se,
        n_cores: config.resolved_n_cores(),
        predict_threads: config.predict_threads,
        seed,
    };

    tracing::debug!(
        ?variables,
        n_samples = plan.n_samples,
        n_cores = plan.n_cores,
        replace = plan.replace,
        se = plan.se,
        seed,
        rows = dataset.dates().len(),
        "normalising"
    );

    let records = run_trials(model, dataset, &plan, progress)?;

    if config.aggregate {
        Ok(Normalised::Series(aggregate_by_date(&records)))
    } else {
        Ok(Normalised::Ensemble(records))
    }
}

/// Predict the dataset as observed (no resampling), one row per input row.
pub fn predict_observed<M: Surrogate + ?Sized>(
    model: &M,
    dataset: &PreparedDataset,
    se: bool,
    threads: usize,
) -> Result<Vec<ObservedPrediction>, AppError> {
    if threads == 0 {
        return Err(AppError::invalid_input("Prediction threads must be >= 1."));
    }
    predictor::check_model(model, se)?;
    if dataset.is_empty() {
        return Err(AppError::invalid_input("Dataset has no rows."));
    }

    let result = predictor::predict(model, dataset, se, threads)?;
    let errors = result.standard_errors;
    Ok(dataset
        .dates()
        .iter()
        .zip(result.values)
        .enumerate()
        .map(|(i, (&date, value))| ObservedPrediction {
            date,
            value,
            se: errors.as_ref().map(|e| e[i]),
        })
        .collect())
}

fn check_config(config: &NormaliseConfig) -> Result<(), AppError> {
    if config.n_samples == 0 {
        return Err(AppError::invalid_input("n_samples must be >= 1."));
    }
    if config.n_cores == Some(0) {
        return Err(AppError::invalid_input("n_cores must be >= 1 when set."));
    }
    if config.predict_threads == 0 {
        return Err(AppError::invalid_input("Prediction threads must be >= 1."));
    }
    if config.trend_column.trim().is_empty() {
        return Err(AppError::invalid_input("Trend column name is empty."));
    }
    Ok(())
}

fn check_dataset(dataset: &PreparedDataset, trend_column: &str) -> Result<(), AppError> {
    if dataset.is_empty() {
        return Err(AppError::invalid_input("Dataset has no rows."));
    }
    if !dataset.has_column(trend_column) {
        return Err(AppError::invalid_input(format!(
            "Dataset has no trend column '{trend_column}'."
        )));
    }
    Ok(())
}
