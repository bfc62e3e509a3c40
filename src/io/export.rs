//! Writers for the two downstream encodings.
//!
//! - **Generic** (`octofitter_*.csv`): comma-delimited, header row, instrument
//!   names.
//! - **Legacy** (`orvara_*.txt`): space-delimited, no header, plain value
//!   strings, integer instrument indices (RV) or the constant companion index
//!   (astrometry).

use std::fs::{self, File};
use std::path::Path;

use tracing::info;

use crate::domain::{AstrometryRecord, Instrument, RvRecord, COMPANION_INDEX};
use crate::error::AppError;
use crate::io::table::{build_header_map, format_plain_float, parse_f64_field, require_columns};

pub const RV_GENERIC_HEADER: [&str; 4] = ["time", "mnvel", "errvel", "tel"];
pub const RELAST_GENERIC_HEADER: [&str; 6] = ["jd", "sep_mas", "err_sep_mas", "PA_rad", "err_PA_rad", "Inst"];

/// Create the parent directory of an output file if needed.
pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).map_err(|e| {
            AppError::filesystem(format!("Failed to create directory '{}': {e}", parent.display()))
        }),
        _ => Ok(()),
    }
}

fn write_text(path: &Path, text: &str) -> Result<(), AppError> {
    ensure_parent_dir(path)?;
    fs::write(path, text).map_err(|e| AppError::filesystem(format!("Failed to write '{}': {e}", path.display())))
}

fn write_csv_rows<I>(path: &Path, header: &[&str], rows: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    ensure_parent_dir(path)?;
    let file = File::create(path)
        .map_err(|e| AppError::filesystem(format!("Failed to create '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    let write_err = |e: csv::Error| AppError::filesystem(format!("Failed to write '{}': {e}", path.display()));
    writer.write_record(header).map_err(write_err)?;
    for row in rows {
        writer.write_record(&row).map_err(write_err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::filesystem(format!("Failed to flush '{}': {e}", path.display())))?;
    Ok(())
}

/// Generic RV encoding: `time,mnvel,errvel,tel`.
pub fn write_rv_generic(path: &Path, records: &[RvRecord]) -> Result<(), AppError> {
    let rows = records.iter().map(|r| {
        vec![
            format_plain_float(r.time),
            format_plain_float(r.velocity),
            format_plain_float(r.velocity_error),
            r.instrument.name().to_string(),
        ]
    });
    write_csv_rows(path, &RV_GENERIC_HEADER, rows)?;
    info!(path = %path.display(), rows = records.len(), "wrote generic RV encoding");
    Ok(())
}

/// Legacy RV encoding body: `time mnvel errvel index` per line.
pub fn render_rv_legacy(records: &[RvRecord]) -> String {
    let mut out = String::new();
    for r in records {
        out.push_str(&format!(
            "{} {} {} {}\n",
            format_plain_float(r.time),
            format_plain_float(r.velocity),
            format_plain_float(r.velocity_error),
            r.instrument.index()
        ));
    }
    out
}

pub fn write_rv_legacy(path: &Path, records: &[RvRecord]) -> Result<(), AppError> {
    write_text(path, &render_rv_legacy(records))?;
    info!(path = %path.display(), rows = records.len(), "wrote legacy RV encoding");
    Ok(())
}

/// Read a generic RV encoding back into records.
pub fn read_rv_generic(path: &Path) -> Result<Vec<RvRecord>, AppError> {
    let schema = "a comma-delimited table with header `time,mnvel,errvel,tel`";
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open '{}': {e}. Expected {schema}.", path.display())))?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV header of '{}': {e}", path.display())))?
        .clone();
    let cols = require_columns(&build_header_map(headers.iter()), &RV_GENERIC_HEADER, path, schema)?;

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result
            .map_err(|e| AppError::input(format!("'{}' line {line}: CSV parse error: {e}", path.display())))?;
        let label = record.get(cols[3]).unwrap_or("");
        let instrument = Instrument::from_name(label).ok_or_else(|| {
            AppError::mapping(format!(
                "'{}' line {line}: instrument '{label}' has no catalog entry.",
                path.display()
            ))
        })?;
        records.push(RvRecord {
            time: parse_f64_field(record.get(cols[0]), "time", path, line)?,
            velocity: parse_f64_field(record.get(cols[1]), "mnvel", path, line)?,
            velocity_error: parse_f64_field(record.get(cols[2]), "errvel", path, line)?,
            instrument,
        });
    }
    Ok(records)
}

/// Generic astrometry encoding: milli-arcseconds and radians.
pub fn write_relast_generic(path: &Path, records: &[AstrometryRecord]) -> Result<(), AppError> {
    let rows = records.iter().map(|r| {
        vec![
            format_plain_float(r.time),
            format_plain_float(r.separation_mas()),
            format_plain_float(r.separation_error_mas()),
            format_plain_float(r.position_angle_rad()),
            format_plain_float(r.position_angle_error_rad()),
            r.instrument.clone(),
        ]
    });
    write_csv_rows(path, &RELAST_GENERIC_HEADER, rows)?;
    info!(path = %path.display(), rows = records.len(), "wrote generic astrometry encoding");
    Ok(())
}

/// Legacy astrometry encoding body: arcseconds, degrees, companion index.
pub fn render_relast_legacy(records: &[AstrometryRecord]) -> String {
    let mut out = String::new();
    for r in records {
        out.push_str(&format!(
            "{} {} {} {} {} {}\n",
            format_plain_float(r.time),
            format_plain_float(r.separation),
            format_plain_float(r.separation_error),
            format_plain_float(r.position_angle),
            format_plain_float(r.position_angle_error),
            COMPANION_INDEX
        ));
    }
    out
}

pub fn write_relast_legacy(path: &Path, records: &[AstrometryRecord]) -> Result<(), AppError> {
    write_text(path, &render_relast_legacy(records))?;
    info!(path = %path.display(), rows = records.len(), "wrote legacy astrometry encoding");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rvs() -> Vec<RvRecord> {
        vec![
            RvRecord {
                time: 2459000.123456,
                velocity: -12.5,
                velocity_error: 1.0,
                instrument: Instrument::Apf,
            },
            RvRecord {
                time: 2447000.5,
                velocity: 100.0,
                velocity_error: 8.25,
                instrument: Instrument::McDonald1,
            },
            RvRecord {
                time: 2440000.5,
                velocity: -42100.0,
                velocity_error: 300.0,
                instrument: Instrument::Griffin,
            },
        ]
    }

    fn sample_relast() -> Vec<AstrometryRecord> {
        vec![
            AstrometryRecord {
                time: 2455000.5,
                separation: 0.874,
                separation_error: 0.005,
                position_angle: 243.1,
                position_angle_error: 0.3,
                instrument: "NaCo".to_string(),
            },
            AstrometryRecord {
                time: 2458000.5,
                separation: 0.9,
                separation_error: 0.01,
                position_angle: 180.0,
                position_angle_error: 1.0,
                instrument: "NIRC2".to_string(),
            },
        ]
    }

    #[test]
    fn generic_rv_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("octofitter_all_rvs.csv");
        let records = sample_rvs();

        write_rv_generic(&path, &records).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("time,mnvel,errvel,tel\n"));
        assert!(text.contains("2447000.5,100.0,8.25,mcdonald1"));

        let back = read_rv_generic(&path).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn legacy_rv_index_matches_generic_name() {
        let dir = tempfile::tempdir().unwrap();
        let generic = dir.path().join("g.csv");
        let records = sample_rvs();
        write_rv_generic(&generic, &records).unwrap();
        let parsed = read_rv_generic(&generic).unwrap();

        let legacy = render_rv_legacy(&records);
        for (line, rec) in legacy.lines().zip(&parsed) {
            let index: usize = line.split(' ').nth(3).unwrap().parse().unwrap();
            assert_eq!(Instrument::from_index(index), Some(rec.instrument));
        }
        assert_eq!(legacy.lines().count(), records.len());
    }

    #[test]
    fn legacy_rv_has_no_header_and_plain_values() {
        let text = render_rv_legacy(&sample_rvs());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2459000.123456 -12.5 1.0 6");
        assert_eq!(lines[2], "2440000.5 -42100.0 300.0 7");
    }

    #[test]
    fn relast_encodings_agree_on_units() {
        let dir = tempfile::tempdir().unwrap();
        let generic = dir.path().join("octofitter_all_relAst.csv");
        let records = sample_relast();
        write_relast_generic(&generic, &records).unwrap();

        let legacy = render_relast_legacy(&records);
        let mut reader = csv::Reader::from_path(&generic).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), RELAST_GENERIC_HEADER.to_vec());

        for (row, line) in reader.records().zip(legacy.lines()) {
            let row = row.unwrap();
            let legacy_fields: Vec<f64> = line.split(' ').take(5).map(|s| s.parse().unwrap()).collect();
            let generic_fields: Vec<f64> = (0..5).map(|i| row[i].parse().unwrap()).collect();

            assert!((generic_fields[0] - legacy_fields[0]).abs() < 1e-9);
            assert!((generic_fields[1] - 1000.0 * legacy_fields[1]).abs() < 1e-9);
            assert!((generic_fields[2] - 1000.0 * legacy_fields[2]).abs() < 1e-9);
            assert!((generic_fields[3] - legacy_fields[3] * std::f64::consts::PI / 180.0).abs() < 1e-9);
            assert!((generic_fields[4] - legacy_fields[4] * std::f64::consts::PI / 180.0).abs() < 1e-9);
        }
    }

    #[test]
    fn relast_legacy_ends_with_companion_index() {
        let text = render_relast_legacy(&sample_relast());
        for line in text.lines() {
            assert_eq!(line.split(' ').count(), 6);
            assert!(line.ends_with(" 0"));
        }
        assert!(text.starts_with("2455000.5 0.874 0.005 243.1 0.3 0\n"));
    }

    #[test]
    fn output_parent_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("latex_tables").join("deeper").join("x.txt");
        write_rv_legacy(&nested, &sample_rvs()).unwrap();
        assert!(nested.exists());
    }
}
