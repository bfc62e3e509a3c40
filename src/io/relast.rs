//! Relative-astrometry ingest.
//!
//! Both literature tables share one layout: whitespace columns
//! `Date Sep Err_Sep PA Err_PA Inst` with a decimal-year date, separations in
//! arcseconds and angles in degrees. Columns are looked up by header name.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::AstrometryRecord;
use crate::error::AppError;
use crate::io::table::{parse_f64_field, read_whitespace_table, require_columns, TableLayout};
use crate::time::decimal_year_to_jd;

const SCHEMA: &str = "a whitespace table with header columns `Date Sep Err_Sep PA Err_PA Inst`";

/// The astrometry tables of the γ Cep data set, in merge order.
pub const DEFAULT_RELAST_FILES: [&str; 2] = ["222404_Bowler_relAST.txt", "222404_Mugrauer_relAST.txt"];

pub fn default_relast_paths(data_dir: &Path) -> Vec<PathBuf> {
    DEFAULT_RELAST_FILES.iter().map(|name| data_dir.join(name)).collect()
}

/// Load one astrometry table.
pub fn load_relast_table(path: &Path) -> Result<Vec<AstrometryRecord>, AppError> {
    let layout = TableLayout {
        skip_lines: 0,
        has_header: true,
    };
    let table = read_whitespace_table(path, layout, SCHEMA)?;
    let cols = require_columns(
        &table.header_map(),
        &["Date", "Sep", "Err_Sep", "PA", "Err_PA", "Inst"],
        path,
        SCHEMA,
    )?;

    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let field = |i: usize| row.fields.get(i).map(String::as_str);

        let decimal_year = parse_f64_field(field(cols[0]), "Date", path, row.line)?;
        let time = decimal_year_to_jd(decimal_year).ok_or_else(|| {
            AppError::input(format!(
                "'{}' line {}: decimal year {decimal_year} is out of range.",
                path.display(),
                row.line
            ))
        })?;

        let instrument = field(cols[5])
            .map(str::to_string)
            .ok_or_else(|| AppError::input(format!("'{}' line {}: missing `Inst`.", path.display(), row.line)))?;

        records.push(AstrometryRecord {
            time,
            separation: parse_f64_field(field(cols[1]), "Sep", path, row.line)?,
            separation_error: parse_f64_field(field(cols[2]), "Err_Sep", path, row.line)?,
            position_angle: parse_f64_field(field(cols[3]), "PA", path, row.line)?,
            position_angle_error: parse_f64_field(field(cols[4]), "Err_PA", path, row.line)?,
            instrument,
        });
    }

    info!(path = %path.display(), rows = records.len(), "loaded astrometry table");
    Ok(records)
}

/// Load and concatenate several astrometry tables in order.
pub fn load_relast_tables(paths: &[PathBuf]) -> Result<Vec<AstrometryRecord>, AppError> {
    let mut all = Vec::new();
    for path in paths {
        all.extend(load_relast_table(path)?);
    }
    Ok(all)
}
