//! Low-level table helpers shared by the readers and writers.
//!
//! - whitespace-delimited table reading (optional metadata lines + header)
//! - case-insensitive header lookup
//! - float rendering compatible with the legacy fitting tool's text reader

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// How a whitespace table is laid out before its data rows start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    /// Metadata lines to discard before anything is parsed.
    pub skip_lines: usize,
    /// Whether the first line after the skipped block names the columns.
    pub has_header: bool,
}

/// One data row with its 1-based line number in the source file.
#[derive(Debug, Clone)]
pub struct TableRow {
    pub line: usize,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct WhitespaceTable {
    pub path: PathBuf,
    pub header: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl WhitespaceTable {
    pub fn header_map(&self) -> HashMap<String, usize> {
        build_header_map(self.header.iter().map(String::as_str))
    }
}

/// Read a whitespace-delimited table.
///
/// Runs of spaces/tabs separate fields; blank lines are ignored. `schema` is a
/// human-readable description of the expected layout used in error messages.
pub fn read_whitespace_table(path: &Path, layout: TableLayout, schema: &str) -> Result<WhitespaceTable, AppError> {
    let text = fs::read_to_string(path).map_err(|e| {
        AppError::input(format!(
            "Failed to read '{}': {e}. Expected {schema}.",
            path.display()
        ))
    })?;

    let mut lines = text.lines().enumerate().skip(layout.skip_lines);

    let header = if layout.has_header {
        let header_line = lines
            .by_ref()
            .find(|(_, line)| !line.trim().is_empty())
            .ok_or_else(|| {
                AppError::input(format!(
                    "'{}' has no header line after {} metadata line(s). Expected {schema}.",
                    path.display(),
                    layout.skip_lines
                ))
            })?;
        header_line.1.split_whitespace().map(str::to_string).collect()
    } else {
        Vec::new()
    };

    let rows = lines
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| TableRow {
            line: idx + 1,
            fields: line.split_whitespace().map(str::to_string).collect(),
        })
        .collect();

    Ok(WhitespaceTable {
        path: path.to_path_buf(),
        header,
        rows,
    })
}

pub fn build_header_map<'a>(names: impl IntoIterator<Item = &'a str>) -> HashMap<String, usize> {
    names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

pub fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

/// Resolve required columns up front so a schema mismatch fails before any row
/// is read.
pub fn require_columns(
    header_map: &HashMap<String, usize>,
    names: &[&str],
    path: &Path,
    schema: &str,
) -> Result<Vec<usize>, AppError> {
    names
        .iter()
        .map(|name| {
            header_map.get(&normalize_header_name(name)).copied().ok_or_else(|| {
                AppError::input(format!(
                    "'{}' is missing required column `{name}`. Expected {schema}.",
                    path.display()
                ))
            })
        })
        .collect()
}

/// Parse a float field, reporting the file and line on failure.
pub fn parse_f64_field(value: Option<&str>, column: &str, path: &Path, line: usize) -> Result<f64, AppError> {
    let raw = value.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
        AppError::input(format!(
            "'{}' line {line}: missing value for `{column}`.",
            path.display()
        ))
    })?;
    raw.parse::<f64>().map_err(|_| {
        AppError::input(format!(
            "'{}' line {line}: invalid number '{raw}' for `{column}`.",
            path.display()
        ))
    })
}

/// Render a float the way the legacy tool's data files have always been
/// written: shortest round-trip digits, a trailing `.0` on integral values, and
/// exponent notation (`1e-05`, `1.5e+16`) outside `[1e-4, 1e16)`.
pub fn format_plain_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let abs = v.abs();
    if !(1e-4..1e16).contains(&abs) {
        let sci = format!("{v:e}");
        let Some((mantissa, exponent)) = sci.split_once('e') else {
            return sci;
        };
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(d) => ('-', d),
            None => ('+', exponent),
        };
        return format!("{mantissa}e{sign}{digits:0>2}");
    }

    let plain = format!("{v}");
    if plain.contains('.') {
        plain
    } else {
        format!("{plain}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn plain_float_matches_legacy_rendering() {
        assert_eq!(format_plain_float(2455000.12345), "2455000.12345");
        assert_eq!(format_plain_float(10.0), "10.0");
        assert_eq!(format_plain_float(-3.0), "-3.0");
        assert_eq!(format_plain_float(0.5), "0.5");
        assert_eq!(format_plain_float(0.0001), "0.0001");
        assert_eq!(format_plain_float(0.00001), "1e-05");
        assert_eq!(format_plain_float(-0.000015), "-1.5e-05");
        assert_eq!(format_plain_float(1e16), "1e+16");
        assert_eq!(format_plain_float(0.0), "0.0");
        assert_eq!(format_plain_float(f64::NAN), "nan");
    }

    #[test]
    fn whitespace_table_skips_metadata_and_reads_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# compiled velocities").unwrap();
        writeln!(file, "# units: m/s").unwrap();
        writeln!(file, "time  mnvel errvel   tel").unwrap();
        writeln!(file, "2450000.1  -12.5\t3.0  2").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "2450001.2 4.0 2.5 4").unwrap();

        let layout = TableLayout {
            skip_lines: 2,
            has_header: true,
        };
        let table = read_whitespace_table(file.path(), layout, "test schema").unwrap();

        assert_eq!(table.header, vec!["time", "mnvel", "errvel", "tel"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].line, 4);
        assert_eq!(table.rows[0].fields, vec!["2450000.1", "-12.5", "3.0", "2"]);
        assert_eq!(table.rows[1].line, 6);
        assert_eq!(table.header_map().get("errvel"), Some(&2));
    }

    #[test]
    fn missing_table_is_an_input_error_naming_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        let layout = TableLayout {
            skip_lines: 0,
            has_header: false,
        };
        let err = read_whitespace_table(&path, layout, "4 columns").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Input);
        assert!(err.to_string().contains("absent.txt"));
        assert!(err.to_string().contains("4 columns"));
    }

    #[test]
    fn required_columns_are_case_insensitive() {
        let map = build_header_map(["Date", "Sep", "\u{feff}Inst"]);
        let idx = require_columns(&map, &["date", "SEP", "inst"], Path::new("x"), "s").unwrap();
        assert_eq!(idx, vec![0, 1, 2]);
        assert!(require_columns(&map, &["PA"], Path::new("x"), "s").is_err());
    }
}
