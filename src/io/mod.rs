//! Input/output helpers.
//!
//! - prepared dataset CSV ingest (`ingest`)
//! - result exports to CSV (`export`)
//! - linear surrogate JSON read/write (`model`)

pub mod export;
pub mod ingest;
pub mod model;

pub use export::*;
pub use ingest::*;
pub use model::*;
