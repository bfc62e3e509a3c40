//! Radial-velocity ingest and normalization.
//!
//! Every source table has its own column names and its own way of saying which
//! instrument took a measurement (a canonical name, an integer catalog index, or
//! nothing at all because the whole file is one instrument). This module turns
//! each of them into `RvRecord`s on the common schema.
//!
//! Rules:
//! - **Strict schema**: a missing column or unparseable number aborts the load
//!   with the file, line and expected layout.
//! - **Strict mapping**: an instrument label with no catalog entry aborts the
//!   load. Records are only ever dropped by an explicit exclusion rule or by the
//!   allow-list filter.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::{Instrument, RvRecord};
use crate::error::AppError;
use crate::io::table::{build_header_map, parse_f64_field, read_whitespace_table, require_columns, TableLayout};

/// Per-sub-instrument velocity errors (km/s) for the Griffin compilation,
/// which does not carry per-row errors.
pub const GRIFFIN_ERRORS_KMS: [(&str, f64); 4] = [
    ("cambridge", 0.25),
    ("coravel", 0.30),
    ("dao", 0.60),
    ("mtwilson", 1.50),
];

/// Griffin sub-instruments kept out of the merged set entirely.
pub const GRIFFIN_EXCLUDED: [&str; 1] = ["mtwilson"];

/// How a source identifies instruments and lays out its columns.
#[derive(Debug, Clone, PartialEq)]
pub enum RvSourceKind {
    /// Comma-delimited survey export: `time,mnvel,errvel,tel` (by header name),
    /// `tel` holding canonical instrument names. Extra columns are ignored.
    Survey,
    /// Whitespace literature compilation: `skip_lines` metadata lines, one
    /// header line, then `time mnvel errvel tel_ind` by position, `tel_ind`
    /// being the catalog index.
    Literature { skip_lines: usize },
    /// Whitespace single-instrument compilation with header `jd rv source`,
    /// velocities in km/s and errors looked up per `source` sub-instrument.
    SubInstrument {
        instrument: Instrument,
        errors_kms: &'static [(&'static str, f64)],
        excluded: &'static [&'static str],
    },
}

impl RvSourceKind {
    fn schema(&self) -> &'static str {
        match self {
            RvSourceKind::Survey => "a comma-delimited table with header columns `time,mnvel,errvel,tel`",
            RvSourceKind::Literature { .. } => {
                "metadata lines, a header line, then whitespace columns `time mnvel errvel tel_ind`"
            }
            RvSourceKind::SubInstrument { .. } => "a whitespace table with header columns `jd rv source` (rv in km/s)",
        }
    }
}

/// One input table of the RV formatter.
#[derive(Debug, Clone, PartialEq)]
pub struct RvSource {
    pub label: &'static str,
    pub file_name: &'static str,
    pub kind: RvSourceKind,
}

/// The RV tables of the γ Cep data set, in merge order.
pub fn default_rv_sources() -> Vec<RvSource> {
    vec![
        RvSource {
            label: "survey",
            file_name: "222404_jump_rvs.csv",
            kind: RvSourceKind::Survey,
        },
        RvSource {
            label: "literature",
            file_name: "222404_lit_rvs.dat",
            kind: RvSourceKind::Literature { skip_lines: 9 },
        },
        RvSource {
            label: "griffin",
            file_name: "222404_griffin_rvs.txt",
            kind: RvSourceKind::SubInstrument {
                instrument: Instrument::Griffin,
                errors_kms: &GRIFFIN_ERRORS_KMS,
                excluded: &GRIFFIN_EXCLUDED,
            },
        },
    ]
}

/// Records normalized from one source, plus bookkeeping for the run log.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub label: &'static str,
    pub path: PathBuf,
    pub records: Vec<RvRecord>,
    pub rows_read: usize,
    /// Rows dropped by a source-level exclusion rule.
    pub rows_excluded: usize,
}

/// Load every source in order. The first failure aborts the run.
pub fn load_rv_sources(data_dir: &Path, sources: &[RvSource]) -> Result<Vec<LoadedSource>, AppError> {
    sources.iter().map(|s| load_rv_source(data_dir, s)).collect()
}

pub fn load_rv_source(data_dir: &Path, source: &RvSource) -> Result<LoadedSource, AppError> {
    let path = data_dir.join(source.file_name);
    debug!(source = source.label, path = %path.display(), "loading RV source");

    let loaded = match &source.kind {
        RvSourceKind::Survey => load_survey(&path, source)?,
        RvSourceKind::Literature { skip_lines } => load_literature(&path, source, *skip_lines)?,
        RvSourceKind::SubInstrument {
            instrument,
            errors_kms,
            excluded,
        } => load_sub_instrument(&path, source, *instrument, errors_kms, excluded)?,
    };

    info!(
        source = loaded.label,
        rows = loaded.rows_read,
        kept = loaded.records.len(),
        excluded = loaded.rows_excluded,
        "loaded RV source"
    );
    Ok(loaded)
}

fn load_survey(path: &Path, source: &RvSource) -> Result<LoadedSource, AppError> {
    let schema = source.kind.schema();
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open '{}': {e}. Expected {schema}.", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV header of '{}': {e}", path.display())))?
        .clone();
    let header_map = build_header_map(headers.iter());
    let cols = require_columns(&header_map, &["time", "mnvel", "errvel", "tel"], path, schema)?;

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; lines are 1-based.
        let line = idx + 2;
        let record = result
            .map_err(|e| AppError::input(format!("'{}' line {line}: CSV parse error: {e}", path.display())))?;

        let time = parse_f64_field(record.get(cols[0]), "time", path, line)?;
        let velocity = parse_f64_field(record.get(cols[1]), "mnvel", path, line)?;
        let velocity_error = parse_f64_field(record.get(cols[2]), "errvel", path, line)?;
        let label = record.get(cols[3]).unwrap_or("");
        let instrument = Instrument::from_name(label).ok_or_else(|| {
            AppError::mapping(format!(
                "'{}' line {line}: instrument '{label}' has no catalog entry.",
                path.display()
            ))
        })?;

        records.push(RvRecord {
            time,
            velocity,
            velocity_error,
            instrument,
        });
    }

    Ok(LoadedSource {
        label: source.label,
        path: path.to_path_buf(),
        rows_read: records.len(),
        records,
        rows_excluded: 0,
    })
}

fn load_literature(path: &Path, source: &RvSource, skip_lines: usize) -> Result<LoadedSource, AppError> {
    let schema = source.kind.schema();
    let layout = TableLayout {
        skip_lines,
        has_header: true,
    };
    let table = read_whitespace_table(path, layout, schema)?;

    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        if row.fields.len() < 4 {
            return Err(AppError::input(format!(
                "'{}' line {}: expected 4 columns, found {}. Expected {schema}.",
                path.display(),
                row.line,
                row.fields.len()
            )));
        }
        let field = |i: usize| row.fields.get(i).map(String::as_str);

        let time = parse_f64_field(field(0), "time", path, row.line)?;
        let velocity = parse_f64_field(field(1), "mnvel", path, row.line)?;
        let velocity_error = parse_f64_field(field(2), "errvel", path, row.line)?;

        let raw_index = row.fields[3].as_str();
        let instrument = parse_catalog_index(raw_index)
            .and_then(Instrument::from_index)
            .ok_or_else(|| {
                AppError::mapping(format!(
                    "'{}' line {}: instrument index '{raw_index}' has no catalog entry.",
                    path.display(),
                    row.line
                ))
            })?;

        records.push(RvRecord {
            time,
            velocity,
            velocity_error,
            instrument,
        });
    }

    Ok(LoadedSource {
        label: source.label,
        path: path.to_path_buf(),
        rows_read: table.rows.len(),
        records,
        rows_excluded: 0,
    })
}

fn load_sub_instrument(
    path: &Path,
    source: &RvSource,
    instrument: Instrument,
    errors_kms: &[(&str, f64)],
    excluded: &[&str],
) -> Result<LoadedSource, AppError> {
    let schema = source.kind.schema();
    let layout = TableLayout {
        skip_lines: 0,
        has_header: true,
    };
    let table = read_whitespace_table(path, layout, schema)?;
    let cols = require_columns(&table.header_map(), &["jd", "rv", "source"], path, schema)?;

    let mut records = Vec::with_capacity(table.rows.len());
    let mut rows_excluded = 0usize;

    for row in &table.rows {
        let field = |i: usize| row.fields.get(i).map(String::as_str);

        let sub = field(cols[2]).unwrap_or("").trim();
        if excluded.iter().any(|name| name.eq_ignore_ascii_case(sub)) {
            rows_excluded += 1;
            continue;
        }

        let error_kms = errors_kms
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(sub))
            .map(|(_, err)| *err)
            .ok_or_else(|| {
                AppError::mapping(format!(
                    "'{}' line {}: sub-instrument '{sub}' has no error entry.",
                    path.display(),
                    row.line
                ))
            })?;

        let time = parse_f64_field(field(cols[0]), "jd", path, row.line)?;
        let velocity_kms = parse_f64_field(field(cols[1]), "rv", path, row.line)?;

        records.push(RvRecord {
            time,
            velocity: velocity_kms * 1000.0,
            velocity_error: error_kms * 1000.0,
            instrument,
        });
    }

    Ok(LoadedSource {
        label: source.label,
        path: path.to_path_buf(),
        rows_read: table.rows.len(),
        records,
        rows_excluded,
    })
}

/// Integer catalog index; integral floats such as `4.0` are accepted.
fn parse_catalog_index(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    if let Ok(idx) = raw.parse::<usize>() {
        return Some(idx);
    }
    let v = raw.parse::<f64>().ok()?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
        Some(v as usize)
    } else {
        None
    }
}

/// Concatenate sources in load order.
pub fn merge_sources(sources: &[LoadedSource]) -> Vec<RvRecord> {
    sources.iter().flat_map(|s| s.records.iter().cloned()).collect()
}

/// Keep only records whose instrument is in `allow`.
pub fn filter_allowed(records: &[RvRecord], allow: &[Instrument]) -> Vec<RvRecord> {
    records
        .iter()
        .filter(|r| allow.contains(&r.instrument))
        .cloned()
        .collect()
}
