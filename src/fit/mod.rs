//! Running the external orbit fitter.
//!
//! Responsibilities:
//!
//! - rewrite the fitter's `.ini` paths for this checkout (`config`)
//! - invoke the fitter from its install directory (`runner`)
//! - summarize the posterior chain it writes (`chain`)

pub mod chain;
pub mod config;
pub mod runner;

pub use chain::*;
pub use config::*;
pub use runner::*;
