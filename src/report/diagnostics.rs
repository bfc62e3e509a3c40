//! Descriptive statistics over the loaded RV records.
//!
//! Everything here is computed from the full set of loaded records, before the
//! allow-list is applied, so sources excluded from the fit still show up.

use crate::constants::DAYS_PER_YEAR;
use crate::domain::{DatasetStats, Instrument, RvRecord};
use crate::math::median;

/// 2020-01-01 00:00 UTC.
pub const DEFAULT_NEW_CUTOFF_JD: f64 = 2_458_849.5;

/// Instruments whose post-cutoff data counts as "new".
pub const NEW_INSTRUMENTS: [Instrument; 2] = [Instrument::Hires, Instrument::Apf];

/// Report one instrument as two groups: everything but the last `tail`
/// records (by time) and the last `tail` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitRule {
    pub instrument: Instrument,
    pub tail: usize,
}

#[derive(Debug, Clone)]
pub struct DiagnosticsConfig {
    pub new_cutoff_jd: f64,
    pub precision: Vec<Instrument>,
    pub new_instruments: Vec<Instrument>,
    pub split: Option<SplitRule>,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            new_cutoff_jd: DEFAULT_NEW_CUTOFF_JD,
            precision: Instrument::PRECISION.to_vec(),
            new_instruments: NEW_INSTRUMENTS.to_vec(),
            split: Some(SplitRule {
                instrument: Instrument::Hires,
                tail: 3,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub label: String,
    /// `None` when the category is empty.
    pub stats: Option<DatasetStats>,
}

impl CategorySummary {
    pub fn count(&self) -> usize {
        self.stats.as_ref().map_or(0, |s| s.n_points)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSummary {
    pub label: String,
    pub stats: DatasetStats,
    pub median_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RvDiagnostics {
    pub new_cutoff_jd: f64,
    pub categories: Vec<CategorySummary>,
    /// Years by which the "new" data extends the pre-cutoff precision baseline.
    pub baseline_extension_years: Option<f64>,
    pub instruments: Vec<InstrumentSummary>,
}

impl RvDiagnostics {
    pub fn category(&self, label: &str) -> Option<&CategorySummary> {
        self.categories.iter().find(|c| c.label == label)
    }
}

pub fn compute_diagnostics(records: &[RvRecord], config: &DiagnosticsConfig) -> RvDiagnostics {
    let cutoff = config.new_cutoff_jd;
    let is_precision = |r: &&RvRecord| config.precision.contains(&r.instrument);
    let is_new = |r: &&RvRecord| config.new_instruments.contains(&r.instrument) && r.time > cutoff;

    let categories = vec![
        CategorySummary {
            label: "all".to_string(),
            stats: DatasetStats::from_times(records.iter().map(|r| r.time)),
        },
        CategorySummary {
            label: "precision".to_string(),
            stats: DatasetStats::from_times(records.iter().filter(is_precision).map(|r| r.time)),
        },
        CategorySummary {
            label: "new".to_string(),
            stats: DatasetStats::from_times(records.iter().filter(is_new).map(|r| r.time)),
        },
    ];

    let latest_old = DatasetStats::from_times(
        records
            .iter()
            .filter(is_precision)
            .filter(|r| r.time <= cutoff)
            .map(|r| r.time),
    );
    let latest_new = DatasetStats::from_times(records.iter().filter(is_new).map(|r| r.time));
    let baseline_extension_years = match (latest_old, latest_new) {
        (Some(old), Some(new)) => Some((new.time_max - old.time_max) / DAYS_PER_YEAR),
        _ => None,
    };

    let mut instruments = Vec::new();
    for instrument in Instrument::ALL {
        let mut group: Vec<&RvRecord> = records.iter().filter(|r| r.instrument == instrument).collect();
        if group.is_empty() {
            continue;
        }

        match config.split {
            Some(rule) if rule.instrument == instrument => {
                group.sort_by(|a, b| a.time.total_cmp(&b.time));
                let at = group.len().saturating_sub(rule.tail);
                let (head, tail) = group.split_at(at);
                let name = instrument.display_name();
                instruments.extend(summarize(format!("{name} (all but last {})", rule.tail), head));
                instruments.extend(summarize(format!("{name} (last {})", rule.tail), tail));
            }
            _ => instruments.extend(summarize(instrument.display_name().to_string(), &group)),
        }
    }

    RvDiagnostics {
        new_cutoff_jd: cutoff,
        categories,
        baseline_extension_years,
        instruments,
    }
}

fn summarize(label: String, group: &[&RvRecord]) -> Option<InstrumentSummary> {
    let stats = DatasetStats::from_times(group.iter().map(|r| r.time))?;
    let errors: Vec<f64> = group.iter().map(|r| r.velocity_error).collect();
    Some(InstrumentSummary {
        label,
        stats,
        median_error: median(&errors),
    })
}
