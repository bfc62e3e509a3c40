//! Shared pipelines behind the subcommands.
//!
//! Keeping the workflows here (and out of argument handling) lets tests drive a
//! whole run against temporary directories:
//! - RVs: load sources -> merge -> diagnostics -> allow-list -> encodings + table
//! - astrometry: load tables -> encodings
//! - fit: config rewrite -> fitter run -> chain summary

use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::{AstrometryRecord, Instrument, RvRecord};
use crate::error::AppError;
use crate::fit::chain::{summarize_chain, ChainSummary};
use crate::fit::config::{prep_config, FitRunnerConfig, PrepOutcome};
use crate::fit::runner::{run_fit, FitInvocation};
use crate::io::export::{write_relast_generic, write_relast_legacy, write_rv_generic, write_rv_legacy};
use crate::io::ingest::{default_rv_sources, filter_allowed, load_rv_sources, merge_sources, LoadedSource, RvSource};
use crate::io::relast::{default_relast_paths, load_relast_tables};
use crate::report::diagnostics::{compute_diagnostics, DiagnosticsConfig, RvDiagnostics};
use crate::report::latex::write_rv_latex;

pub const RV_GENERIC_FILE: &str = "octofitter_all_rvs.csv";
pub const RV_LEGACY_FILE: &str = "orvara_all_rvs.txt";
pub const RV_LATEX_FILE: &str = "latex_tables/latex_all_rvs.tex";
pub const RELAST_GENERIC_FILE: &str = "octofitter_all_relAst.csv";
pub const RELAST_LEGACY_FILE: &str = "orvara_all_relAst.txt";

#[derive(Debug, Clone)]
pub struct RvFormatOptions {
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    pub sources: Vec<RvSource>,
    pub allow: Vec<Instrument>,
    pub diagnostics: DiagnosticsConfig,
}

impl RvFormatOptions {
    /// The standard sources and allow-list, reading and writing in `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            out_dir: data_dir.clone(),
            data_dir,
            sources: default_rv_sources(),
            allow: Instrument::default_allow_list(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

/// Everything a `rvs` run produced.
#[derive(Debug, Clone)]
pub struct RvFormatOutput {
    pub loaded: Vec<LoadedSource>,
    /// Every loaded record, before the allow-list.
    pub all_records: Vec<RvRecord>,
    /// Records written to the encodings.
    pub kept: Vec<RvRecord>,
    pub diagnostics: RvDiagnostics,
    pub generic_path: PathBuf,
    pub legacy_path: PathBuf,
    pub latex_path: PathBuf,
}

pub fn run_rv_format(opts: &RvFormatOptions) -> Result<RvFormatOutput, AppError> {
    let loaded = load_rv_sources(&opts.data_dir, &opts.sources)?;
    let all_records = merge_sources(&loaded);
    let diagnostics = compute_diagnostics(&all_records, &opts.diagnostics);

    let kept = filter_allowed(&all_records, &opts.allow);
    info!(loaded = all_records.len(), kept = kept.len(), "merged RV sources");

    let generic_path = opts.out_dir.join(RV_GENERIC_FILE);
    let legacy_path = opts.out_dir.join(RV_LEGACY_FILE);
    let latex_path = opts.out_dir.join(RV_LATEX_FILE);
    write_rv_generic(&generic_path, &kept)?;
    write_rv_legacy(&legacy_path, &kept)?;
    // The paper table picks its own instruments; the allow-list only shapes the fit inputs.
    write_rv_latex(&latex_path, &all_records)?;

    Ok(RvFormatOutput {
        loaded,
        all_records,
        kept,
        diagnostics,
        generic_path,
        legacy_path,
        latex_path,
    })
}

#[derive(Debug, Clone)]
pub struct RelastFormatOutput {
    pub records: Vec<AstrometryRecord>,
    pub generic_path: PathBuf,
    pub legacy_path: PathBuf,
}

pub fn run_relast_format(data_dir: &Path, out_dir: &Path) -> Result<RelastFormatOutput, AppError> {
    let records = load_relast_tables(&default_relast_paths(data_dir))?;

    let generic_path = out_dir.join(RELAST_GENERIC_FILE);
    let legacy_path = out_dir.join(RELAST_LEGACY_FILE);
    write_relast_generic(&generic_path, &records)?;
    write_relast_legacy(&legacy_path, &records)?;

    Ok(RelastFormatOutput {
        records,
        generic_path,
        legacy_path,
    })
}

#[derive(Debug, Clone)]
pub struct FitFlowOptions {
    pub rewrite_config: bool,
    /// Burn-in rows for the chain summary; `None` skips the summary.
    pub summarize_burn_in: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct FitFlowOutput {
    pub prep: Option<PrepOutcome>,
    pub invocation: FitInvocation,
    pub summary: Option<ChainSummary>,
}

pub fn run_fit_flow(config: &FitRunnerConfig, opts: &FitFlowOptions) -> Result<FitFlowOutput, AppError> {
    let prep = if opts.rewrite_config {
        Some(prep_config(config)?)
    } else {
        None
    };

    let invocation = run_fit(config)?;

    let summary = match opts.summarize_burn_in {
        Some(burn_in) => Some(summarize_chain(&config.chain_path()?, burn_in)?),
        None => None,
    };

    Ok(FitFlowOutput {
        prep,
        invocation,
        summary,
    })
}
