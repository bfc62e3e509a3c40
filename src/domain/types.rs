//! Shared domain types.
//!
//! Records are plain rows: they are created fresh from the input tables on each
//! run and never mutated after an output file is written.

use serde::{Deserialize, Serialize};

use crate::domain::Instrument;

/// Companion index written into every legacy astrometry row.
///
/// The system has a single resolved companion, so this is a constant rather than
/// something read from the input tables.
pub const COMPANION_INDEX: &str = "0";

/// One radial-velocity measurement, normalized to the common schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RvRecord {
    /// Julian date.
    pub time: f64,
    /// Line-of-sight velocity (m/s).
    pub velocity: f64,
    /// One-sigma velocity error (m/s).
    pub velocity_error: f64,
    pub instrument: Instrument,
}

/// One relative-astrometry measurement in the units of the literature tables.
///
/// The generic encoding wants milli-arcseconds and radians; the helper methods
/// derive those views so both encodings read from the same stored values.
#[derive(Debug, Clone, PartialEq)]
pub struct AstrometryRecord {
    /// Julian date (converted from the decimal-year column).
    pub time: f64,
    /// Separation (arcsec).
    pub separation: f64,
    /// Separation error (arcsec).
    pub separation_error: f64,
    /// Position angle (deg).
    pub position_angle: f64,
    /// Position angle error (deg).
    pub position_angle_error: f64,
    /// Free-text instrument label as given by the source table.
    pub instrument: String,
}

impl AstrometryRecord {
    pub fn separation_mas(&self) -> f64 {
        self.separation * 1000.0
    }

    pub fn separation_error_mas(&self) -> f64 {
        self.separation_error * 1000.0
    }

    pub fn position_angle_rad(&self) -> f64 {
        self.position_angle.to_radians()
    }

    pub fn position_angle_error_rad(&self) -> f64 {
        self.position_angle_error.to_radians()
    }
}

/// Summary statistics for a set of records (used by diagnostics).
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n_points: usize,
    pub time_min: f64,
    pub time_max: f64,
}

impl DatasetStats {
    /// Compute count and time range; `None` for an empty set.
    pub fn from_times(times: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut n_points = 0usize;
        let mut time_min = f64::INFINITY;
        let mut time_max = f64::NEG_INFINITY;

        for t in times {
            n_points += 1;
            time_min = time_min.min(t);
            time_max = time_max.max(t);
        }

        if n_points == 0 || !time_min.is_finite() || !time_max.is_finite() {
            return None;
        }

        Some(Self {
            n_points,
            time_min,
            time_max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn astrometry_views_convert_units() {
        let rec = AstrometryRecord {
            time: 2451544.5,
            separation: 0.9,
            separation_error: 0.01,
            position_angle: 180.0,
            position_angle_error: 1.0,
            instrument: "NaCo".to_string(),
        };

        assert!((rec.separation_mas() - 900.0).abs() < 1e-9);
        assert!((rec.separation_error_mas() - 10.0).abs() < 1e-9);
        assert!((rec.position_angle_rad() - std::f64::consts::PI).abs() < 1e-9);
        assert!((rec.position_angle_error_rad() - std::f64::consts::PI / 180.0).abs() < 1e-9);
    }

    #[test]
    fn stats_of_empty_set_is_none() {
        assert!(DatasetStats::from_times(Vec::<f64>::new()).is_none());
        let stats = DatasetStats::from_times([3.0, 1.0, 2.0]).unwrap();
        assert_eq!(stats.n_points, 3);
        assert_eq!(stats.time_min, 1.0);
        assert_eq!(stats.time_max, 3.0);
    }
}
