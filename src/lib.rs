//! `metnorm` library crate.
//!
//! Meteorological normalisation: resample the weather covariates fed to a
//! trained surrogate while holding the trend fixed, predict many times, and
//! average the counterfactual predictions per date.
//!
//! The binary (`metnorm`) is a thin wrapper around this library so that the
//! engine is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod models;
pub mod normalise;
pub mod report;

pub use domain::{Normalised, NormaliseConfig, PreparedDataset};
pub use error::{AppError, ErrorKind};
pub use models::Surrogate;
pub use normalise::{normalise, normalise_with_progress, predict_observed};
