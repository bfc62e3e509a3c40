//! Reporting: RV diagnostics, the LaTeX table, and terminal formatting.

pub mod diagnostics;
pub mod format;
pub mod latex;

pub use diagnostics::*;
pub use format::*;
pub use latex::*;
