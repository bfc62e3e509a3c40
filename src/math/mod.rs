//! Numeric helpers: sample statistics and error-aware rounding.

pub mod rounding;
pub mod stats;

pub use rounding::*;
pub use stats::*;
