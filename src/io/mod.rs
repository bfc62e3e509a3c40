//! Input/output helpers.
//!
//! - whitespace tables and header lookup (`table`)
//! - RV source ingest + merge (`ingest`)
//! - relative-astrometry ingest (`relast`)
//! - generic/legacy encodings (`export`)
//! - FITS binary-table reading for posterior chains (`fits`)

pub mod export;
pub mod fits;
pub mod ingest;
pub mod relast;
pub mod table;

pub use export::*;
pub use ingest::*;
pub use relast::*;
