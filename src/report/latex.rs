//! Publication table of the precision RVs (booktabs `tabular`).

use std::fs;
use std::path::Path;

use tracing::info;

use crate::constants::JD_TABLE_OFFSET;
use crate::domain::{Instrument, RvRecord};
use crate::error::AppError;
use crate::io::export::ensure_parent_dir;

/// Instruments included in the paper table.
pub const LATEX_INSTRUMENTS: [Instrument; 3] = [Instrument::Hires, Instrument::Apf, Instrument::McDonald3];

const COLUMNS: [&str; 4] = ["time_trunc", "mnvel", "errvel", "latex_telname"];

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '_' | '&' | '%' | '$' | '#' | '{' | '}' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Render the rows of `instruments`, sorted by (instrument name, time).
pub fn render_rv_latex(records: &[RvRecord], instruments: &[Instrument]) -> String {
    let mut rows: Vec<&RvRecord> = records.iter().filter(|r| instruments.contains(&r.instrument)).collect();
    rows.sort_by(|a, b| {
        a.instrument
            .name()
            .cmp(b.instrument.name())
            .then(a.time.total_cmp(&b.time))
    });

    let mut out = String::new();
    out.push_str("\\begin{tabular}{rrrl}\n");
    out.push_str("\\toprule\n");
    let header: Vec<String> = COLUMNS.iter().map(|c| escape(c)).collect();
    out.push_str(&format!("{} \\\\\n", header.join(" & ")));
    out.push_str("\\midrule\n");
    for r in rows {
        out.push_str(&format!(
            "{:.4} & {:.2} & {:.2} & {} \\\\\n",
            r.time - JD_TABLE_OFFSET,
            r.velocity,
            r.velocity_error,
            escape(r.instrument.display_name())
        ));
    }
    out.push_str("\\bottomrule\n");
    out.push_str("\\end{tabular}\n");
    out
}

pub fn write_rv_latex(path: &Path, records: &[RvRecord]) -> Result<(), AppError> {
    ensure_parent_dir(path)?;
    let text = render_rv_latex(records, &LATEX_INSTRUMENTS);
    fs::write(path, text).map_err(|e| AppError::filesystem(format!("Failed to write '{}': {e}", path.display())))?;
    info!(path = %path.display(), "wrote LaTeX RV table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rv(time: f64, velocity: f64, err: f64, instrument: Instrument) -> RvRecord {
        RvRecord {
            time,
            velocity,
            velocity_error: err,
            instrument,
        }
    }

    #[test]
    fn table_is_filtered_sorted_and_formatted() {
        let records = vec![
            rv(2_459_100.25, 3.14159, 1.005, Instrument::Hires),
            rv(2_455_000.5, -20.0, 4.0, Instrument::McDonald3),
            rv(2_459_001.123456, 1.0, 0.5, Instrument::Apf),
            rv(2_459_000.0, 2.0, 0.75, Instrument::Hires),
            rv(2_447_000.0, 9.0, 9.0, Instrument::Cfht),
        ];

        let text = render_rv_latex(&records, &LATEX_INSTRUMENTS);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "\\begin{tabular}{rrrl}");
        assert_eq!(lines[1], "\\toprule");
        assert_eq!(lines[2], "time\\_trunc & mnvel & errvel & latex\\_telname \\\\");
        assert_eq!(lines[3], "\\midrule");
        assert_eq!(lines[4], "59001.1235 & 1.00 & 0.50 & APF \\\\");
        assert_eq!(lines[5], "59000.0000 & 2.00 & 0.75 & HIRES \\\\");
        assert!(lines[6].starts_with("59100.2500 & 3.14 & "));
        assert_eq!(lines[7], "55000.5000 & -20.00 & 4.00 & McDonald III \\\\");
        assert_eq!(lines[8], "\\bottomrule");
        assert_eq!(lines[9], "\\end{tabular}");
        assert!(!text.contains("CFHT"));
    }

    #[test]
    fn writes_into_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latex_tables").join("latex_all_rvs.tex");
        write_rv_latex(&path, &[rv(2_459_000.0, 1.0, 1.0, Instrument::Apf)]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("APF"));
    }
}
