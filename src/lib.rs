//! `orbit-prep` library crate.
//!
//! The binary (`orbit-prep`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the formatters can be driven from other tools or notebooks
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod constants;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod time;
