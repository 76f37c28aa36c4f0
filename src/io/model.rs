//! Read/write linear surrogate JSON files.
//!
//! The schema is `models::LinearModelFile`:
//!
//! ```json
//! {
//!   "intercept": 12.0,
//!   "terms": [{ "name": "ws", "coefficient": -1.5 }],
//!   "covariance": [[0.04, 0.0], [0.0, 0.01]]
//! }
//! ```
//!
//! `covariance` is optional; without it the model cannot estimate standard errors.

use std::fs::File;
use std::path::Path;

use crate::error::AppError;
use crate::models::{LinearModelFile, LinearSurrogate};

/// Read a linear surrogate from JSON.
pub fn read_linear_model(path: &Path) -> Result<LinearSurrogate, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open model JSON '{}': {e}", path.display())))?;
    let parsed: LinearModelFile = serde_json::from_reader(file)
        .map_err(|e| AppError::invalid_model(format!("Invalid model JSON: {e}")))?;
    Ok(parsed.into())
}

/// Write a linear surrogate as pretty-printed JSON.
pub fn write_linear_model(path: &Path, model: &LinearSurrogate) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create model JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &model.to_file())
        .map_err(|e| AppError::io(format!("Failed to write model JSON: {e}")))
}
