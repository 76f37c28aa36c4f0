//! Data sources.
//!
//! - `synthetic`: seeded synthetic dataset plus its generating surrogate

pub mod synthetic;

pub use synthetic::{SyntheticConfig, SyntheticData, generate_synthetic};
