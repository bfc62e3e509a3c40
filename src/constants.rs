//! Physical and calendar constants shared across the crate.

/// Seconds in one day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Julian date of the Unix epoch (1970-01-01T00:00:00 UTC).
pub const JD_UNIX_EPOCH: f64 = 2_440_587.5;

/// Offset subtracted from Julian dates in the publication table.
pub const JD_TABLE_OFFSET: f64 = 2_400_000.0;

/// Julian year in days, used for baseline lengths.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Solar masses to Jupiter masses (IAU nominal values).
pub const MSUN_TO_MJUP: f64 = 1047.5654;
