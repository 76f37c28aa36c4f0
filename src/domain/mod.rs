//! Domain types used throughout the engine.
//!
//! - the prepared input dataset (`PreparedDataset`) and column access (`ColumnSource`)
//! - per-trial and aggregated outputs (`PredictionRecord`, `NormalisedRow`)
//! - call configuration (`NormaliseConfig`)

pub mod types;

pub use types::*;
