//! Shared load → run workflows used by the CLI commands.
//!
//! Keeping these here lets `app` focus on argument mapping and printing.

use std::path::Path;

use crate::data::{SyntheticConfig, generate_synthetic};
use crate::domain::{Normalised, NormaliseConfig, ObservedPrediction, PreparedDataset};
use crate::error::AppError;
use crate::io::{load_dataset, read_linear_model, write_dataset_csv, write_linear_model};
use crate::models::LinearSurrogate;
use crate::normalise::{normalise, predict_observed};

/// Load a dataset and a linear surrogate from disk.
pub fn load_inputs(
    data: &Path,
    model: &Path,
    trend_column: &str,
) -> Result<(PreparedDataset, LinearSurrogate), AppError> {
    let dataset = load_dataset(data, trend_column)?;
    let model = read_linear_model(model)?;
    tracing::info!(
        rows = dataset.dates().len(),
        columns = dataset.column_names().len(),
        "loaded dataset"
    );
    Ok((dataset, model))
}

/// Load inputs and run a normalisation.
pub fn run_normalise(data: &Path, model: &Path, config: &NormaliseConfig) -> Result<Normalised, AppError> {
    let (dataset, model) = load_inputs(data, model, &config.trend_column)?;
    normalise(&model, &dataset, config)
}

/// Load inputs and predict under observed weather.
pub fn run_predict(
    data: &Path,
    model: &Path,
    trend_column: &str,
    se: bool,
    threads: usize,
) -> Result<Vec<ObservedPrediction>, AppError> {
    let (dataset, model) = load_inputs(data, model, trend_column)?;
    predict_observed(&model, &dataset, se, threads)
}

/// Generate a synthetic dataset and write it with its model.
pub fn run_demo(config: &SyntheticConfig, data_out: &Path, model_out: &Path) -> Result<(), AppError> {
    let synthetic = generate_synthetic(config)?;
    write_dataset_csv(data_out, &synthetic.dataset)?;
    write_linear_model(model_out, &synthetic.model)?;
    tracing::info!(
        rows = config.rows,
        data = %data_out.display(),
        model = %model_out.display(),
        "wrote synthetic dataset"
    );
    Ok(())
}
