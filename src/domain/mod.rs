//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the instrument catalog (`Instrument`)
//! - normalized measurement rows (`RvRecord`, `AstrometryRecord`)

pub mod instrument;
pub mod types;

pub use instrument::*;
pub use types::*;
