//! Model contract and the bundled linear surrogate.
//!
//! The engine is generic over `Surrogate`; `LinearSurrogate` exists so the
//! binary has a concrete model to load.

pub mod linear;
pub mod model;

pub use linear::*;
pub use model::*;
