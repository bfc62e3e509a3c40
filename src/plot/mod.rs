//! Collecting finished plots for the paper.

pub mod collect;

pub use collect::*;
