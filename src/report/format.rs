//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the ingest/fit code stays clean and testable
//! - output changes are localized

use crate::fit::chain::ChainSummary;
use crate::math::{format_with_error, round_to_sig_figs};
use crate::plot::collect::CollectReport;
use crate::report::diagnostics::{CategorySummary, InstrumentSummary, RvDiagnostics};
use crate::time::format_jd_date;

/// Format the RV diagnostics block.
pub fn format_diagnostics(diag: &RvDiagnostics) -> String {
    let mut out = String::new();

    out.push_str("=== orbit-prep - RV diagnostics ===\n");
    out.push_str(&format!(
        "New-data cutoff: JD {} ({})\n\n",
        diag.new_cutoff_jd,
        format_jd_date(diag.new_cutoff_jd)
    ));

    out.push_str("Categories:\n");
    out.push_str(&format_category_table(&diag.categories));
    out.push('\n');

    match diag.baseline_extension_years {
        Some(years) => out.push_str(&format!("Precision baseline extended by {years:.2} yr\n\n")),
        None => out.push_str("Precision baseline extension: n/a (no data on one side of the cutoff)\n\n"),
    }

    out.push_str("Per instrument:\n");
    out.push_str(&format_instrument_table(&diag.instruments));

    out
}

fn format_category_table(rows: &[CategorySummary]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<12} {:>6} {:<10} {:<10}", "category", "n", "first", "last").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<12} {:-<6} {:-<10} {:-<10}", "", "", "", "").trim_end());
    out.push('\n');

    for c in rows {
        let (first, last) = match &c.stats {
            Some(s) => (format_jd_date(s.time_min), format_jd_date(s.time_max)),
            None => ("-".to_string(), "-".to_string()),
        };
        out.push_str(format!("{:<12} {:>6} {:<10} {:<10}", c.label, c.count(), first, last).trim_end());
        out.push('\n');
    }
    out
}

fn format_instrument_table(rows: &[InstrumentSummary]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<26} {:>6} {:<10} {:<10} {:>12}",
            "instrument", "n", "first", "last", "median err"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<26} {:-<6} {:-<10} {:-<10} {:-<12}", "", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        let err = r
            .median_error
            .map(|e| format!("{} m/s", round_to_sig_figs(e, 2)))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(
            format!(
                "{:<26} {:>6} {:<10} {:<10} {:>12}",
                truncate(&r.label, 26),
                r.stats.n_points,
                format_jd_date(r.stats.time_min),
                format_jd_date(r.stats.time_max),
                err
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Format a chain summary; each value is rounded to its one-sig-fig error.
pub fn format_chain_summary(summary: &ChainSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Chain: {}\n", summary.chain.display()));
    out.push_str(&format!(
        "Samples: {} (after dropping {} burn-in rows)\n",
        summary.samples, summary.burn_in
    ));
    out.push_str(&format!(
        "- companion mass (msini): {} M_Jup\n",
        format_with_error(summary.mass_mjup.median, summary.mass_mjup.std)
    ));
    out.push_str(&format!(
        "- mutual inclination    : {} deg\n",
        format_with_error(summary.mutual_inclination_deg.median, summary.mutual_inclination_deg.std)
    ));
    out
}

/// Format the plot-collection outcome, listing every failure.
pub fn format_collect_report(report: &CollectReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Copied {} plot(s) into {}\n",
        report.copied.len(),
        report.dest.display()
    ));
    if !report.failed.is_empty() {
        out.push_str(&format!("Failed to copy {} plot(s):\n", report.failed.len()));
        for f in &report.failed {
            out.push_str(&format!("- {}: {}\n", f.source.display(), f.reason));
        }
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DatasetStats;
    use crate::fit::chain::Estimate;
    use crate::plot::collect::CopyFailure;
    use std::path::PathBuf;

    fn diag() -> RvDiagnostics {
        RvDiagnostics {
            new_cutoff_jd: 2458849.5,
            categories: vec![
                CategorySummary {
                    label: "all".to_string(),
                    stats: Some(DatasetStats {
                        n_points: 3,
                        time_min: 2451544.5,
                        time_max: 2459000.5,
                    }),
                },
                CategorySummary {
                    label: "new".to_string(),
                    stats: None,
                },
            ],
            baseline_extension_years: Some(1.234),
            instruments: vec![InstrumentSummary {
                label: "HIRES (last 3)".to_string(),
                stats: DatasetStats {
                    n_points: 3,
                    time_min: 2451544.5,
                    time_max: 2451545.5,
                },
                median_error: Some(1.2345),
            }],
        }
    }

    #[test]
    fn diagnostics_render_dates_and_medians() {
        let text = format_diagnostics(&diag());
        assert!(text.contains("New-data cutoff: JD 2458849.5 (2020-01-01)"));
        assert!(text.contains("all               3 2000-01-01 2020-05-31"));
        assert!(text.contains("new               0 -          -"));
        assert!(text.contains("Precision baseline extended by 1.23 yr"));
        assert!(text.contains("HIRES (last 3)"));
        assert!(text.contains("1.2 m/s"));
        assert!(text.lines().all(|l| l == l.trim_end()));
    }

    #[test]
    fn chain_summary_rounds_to_error() {
        let summary = ChainSummary {
            tool: "orbit-prep".to_string(),
            chain: PathBuf::from("chain.fits"),
            burn_in: 250,
            samples: 1000,
            mass_mjup: Estimate {
                median: 6.6789,
                std: 0.0432,
            },
            mutual_inclination_deg: Estimate {
                median: 1834.0,
                std: 260.0,
            },
        };
        let text = format_chain_summary(&summary);
        assert!(text.contains("6.68 ± 0.04 M_Jup"));
        assert!(text.contains("1800 ± 300 deg"));
    }

    #[test]
    fn collect_report_lists_failures() {
        let report = CollectReport {
            dest: PathBuf::from("paper_plots_gamma_cep"),
            copied: vec![PathBuf::from("paper_plots_gamma_cep/all_rvs.pdf")],
            failed: vec![CopyFailure {
                source: PathBuf::from("PA_OC_gamma_cep.pdf"),
                reason: "not found".to_string(),
            }],
        };
        let text = format_collect_report(&report);
        assert!(text.starts_with("Copied 1 plot(s) into paper_plots_gamma_cep\n"));
        assert!(text.contains("- PA_OC_gamma_cep.pdf: not found"));
    }

    #[test]
    fn truncate_marks_cut_labels() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd.");
    }
}
