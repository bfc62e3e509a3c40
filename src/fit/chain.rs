//! Posterior-chain post-processing.
//!
//! The fitting tool writes one binary-table column per parameter. We read the
//! companion mass and the two orbits' inclinations and node longitudes
//! (radians), drop the burn-in rows, and reduce the rest to medians and
//! standard deviations of two derived quantities:
//!
//! - minimum companion mass `msec1 · sin(inc1)` in Jupiter masses
//! - mutual inclination between the inner and outer orbit, in degrees

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::MSUN_TO_MJUP;
use crate::error::AppError;
use crate::io::fits::read_first_bintable;
use crate::math::{median, std_dev};

pub const DEFAULT_BURN_IN: usize = 250;

/// Columns read from the chain, in this order.
pub const CHAIN_COLUMNS: [&str; 5] = ["msec1", "inc0", "inc1", "asc0", "asc1"];

/// Chain file name written by the fitting tool for `target`.
pub fn chain_file_name(target: &str) -> String {
    format!("{target}_Temp0_chain000.fits")
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub median: f64,
    pub std: f64,
}

impl Estimate {
    fn from_samples(samples: &[f64]) -> Option<Self> {
        Some(Self {
            median: median(samples)?,
            std: std_dev(samples)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub tool: String,
    pub chain: PathBuf,
    pub burn_in: usize,
    pub samples: usize,
    pub mass_mjup: Estimate,
    pub mutual_inclination_deg: Estimate,
}

/// Flattened post-burn-in samples of every column in [`CHAIN_COLUMNS`].
#[derive(Debug, Clone, Default)]
pub struct ChainSamples {
    pub msec1: Vec<f64>,
    pub inc0: Vec<f64>,
    pub inc1: Vec<f64>,
    pub asc0: Vec<f64>,
    pub asc1: Vec<f64>,
}

pub fn companion_mass_mjup(msec: f64, inc: f64) -> f64 {
    msec * inc.sin() * MSUN_TO_MJUP
}

pub fn mutual_inclination_deg(inc0: f64, inc1: f64, asc0: f64, asc1: f64) -> f64 {
    let cos_mutual = inc0.cos() * inc1.cos() + inc0.sin() * inc1.sin() * (asc0 - asc1).cos();
    cos_mutual.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Read the chain and drop the first `burn_in` rows of every column.
pub fn load_chain_samples(path: &Path, burn_in: usize) -> Result<ChainSamples, AppError> {
    let table = read_first_bintable(path)?;
    if burn_in >= table.n_rows {
        return Err(AppError::input(format!(
            "'{}' has {} rows; a burn-in of {burn_in} leaves no samples.",
            path.display(),
            table.n_rows
        )));
    }

    let mut columns = Vec::with_capacity(CHAIN_COLUMNS.len());
    for name in CHAIN_COLUMNS {
        let rows = table.column_rows(name)?;
        let flat: Vec<f64> = rows.into_iter().skip(burn_in).flatten().collect();
        debug!(column = name, samples = flat.len(), "flattened chain column");
        columns.push(flat);
    }

    let mut it = columns.into_iter();
    let mut next = || it.next().unwrap_or_default();
    Ok(ChainSamples {
        msec1: next(),
        inc0: next(),
        inc1: next(),
        asc0: next(),
        asc1: next(),
    })
}

pub fn summarize_samples(samples: &ChainSamples) -> Option<(usize, Estimate, Estimate)> {
    let n = samples.msec1.len();
    let same_length = [&samples.inc0, &samples.inc1, &samples.asc0, &samples.asc1]
        .iter()
        .all(|c| c.len() == n);
    if n == 0 || !same_length {
        return None;
    }

    let masses: Vec<f64> = samples
        .msec1
        .iter()
        .zip(&samples.inc1)
        .map(|(&m, &i)| companion_mass_mjup(m, i))
        .collect();
    let mutual: Vec<f64> = (0..n)
        .map(|k| mutual_inclination_deg(samples.inc0[k], samples.inc1[k], samples.asc0[k], samples.asc1[k]))
        .collect();

    Some((n, Estimate::from_samples(&masses)?, Estimate::from_samples(&mutual)?))
}

pub fn summarize_chain(path: &Path, burn_in: usize) -> Result<ChainSummary, AppError> {
    let samples = load_chain_samples(path, burn_in)?;
    let (n, mass_mjup, mutual_inclination_deg) = summarize_samples(&samples).ok_or_else(|| {
        AppError::input(format!(
            "'{}': chain columns are empty, of unequal length, or contain no finite values.",
            path.display()
        ))
    })?;

    info!(path = %path.display(), burn_in, samples = n, "summarized chain");
    Ok(ChainSummary {
        tool: "orbit-prep".to_string(),
        chain: path.to_path_buf(),
        burn_in,
        samples: n,
        mass_mjup,
        mutual_inclination_deg,
    })
}

pub fn write_summary_json(path: &Path, summary: &ChainSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::filesystem(format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::filesystem(format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn read_summary_json(path: &Path) -> Result<ChainSummary, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open summary JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::input(format!("Invalid summary JSON: {e}")))
}
