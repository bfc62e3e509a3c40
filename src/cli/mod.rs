//! Command-line parsing for the orbit-fit data preparation tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the ingest/fit code.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::Instrument;
use crate::fit::chain::DEFAULT_BURN_IN;
use crate::fit::config::DEFAULT_TARGET;
use crate::plot::collect::DEFAULT_PLOT_DEST;
use crate::report::diagnostics::DEFAULT_NEW_CUTOFF_JD;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "orbit-prep", version, about = "Prepare RV/astrometry data for orbit fitting and run the fitter")]
pub struct Cli {
    /// More log output (`-v` debug, `-vv` trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Merge the RV sources, write both encodings and the LaTeX table, print diagnostics.
    Rvs(RvsArgs),
    /// Merge the relative-astrometry tables and write both encodings.
    Relast(RelastArgs),
    /// Rewrite the fitter config's path keys for this checkout.
    PrepConfig(FitRunnerArgs),
    /// Rewrite the config, run the fitter, and optionally summarize its chain.
    Fit(FitArgs),
    /// Summarize an existing posterior chain.
    Chain(ChainArgs),
    /// Copy the fitter's plots into the paper directory under new names.
    Plots(PlotsArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RvsArgs {
    /// Directory holding the raw RV tables.
    #[arg(long, env = "ORBIT_PREP_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Where outputs go (defaults to the data directory).
    #[arg(long, env = "ORBIT_PREP_OUT_DIR")]
    pub out_dir: Option<PathBuf>,

    /// Instruments kept in the fit outputs (comma-separated). Defaults to every
    /// instrument except `griffin`.
    #[arg(long, value_enum, value_delimiter = ',')]
    pub instruments: Vec<Instrument>,

    /// Julian date after which HIRES/APF data counts as new.
    #[arg(long, default_value_t = DEFAULT_NEW_CUTOFF_JD)]
    pub new_cutoff_jd: f64,

    /// Skip the diagnostics printout.
    #[arg(long)]
    pub no_diagnostics: bool,
}

#[derive(Debug, Args, Clone)]
pub struct RelastArgs {
    /// Directory holding the raw astrometry tables.
    #[arg(long, env = "ORBIT_PREP_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Where outputs go (defaults to the data directory).
    #[arg(long, env = "ORBIT_PREP_OUT_DIR")]
    pub out_dir: Option<PathBuf>,
}

/// Where the fitter is installed and which files it reads/writes.
#[derive(Debug, Args, Clone)]
pub struct FitRunnerArgs {
    /// Fitter executable: a name on `PATH` or a path.
    #[arg(long, env = "ORBIT_PREP_FIT_EXECUTABLE")]
    pub fit_executable: Option<PathBuf>,

    /// Directory the fitter must run from (defaults to the executable's directory).
    #[arg(long, env = "ORBIT_PREP_TOOL_DIR")]
    pub tool_dir: Option<PathBuf>,

    /// Fitter config (defaults to `config_<target>.ini` in the project directory).
    #[arg(long, env = "ORBIT_PREP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Fitter output directory (defaults to `outputs/` in the project directory).
    #[arg(long, env = "ORBIT_PREP_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Project directory holding the config and start file.
    #[arg(long, env = "ORBIT_PREP_PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Target name used in file names.
    #[arg(long, env = "ORBIT_PREP_TARGET", default_value = DEFAULT_TARGET)]
    pub target: String,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub runner: FitRunnerArgs,

    /// Run the config as-is.
    #[arg(long)]
    pub skip_rewrite: bool,

    /// Run the plotting entry point instead of the fitter (when no executable is given).
    #[arg(long)]
    pub plot: bool,

    /// Summarize the chain after a successful run.
    #[arg(long)]
    pub summarize: bool,

    /// Chain rows dropped before summarizing.
    #[arg(long, default_value_t = DEFAULT_BURN_IN)]
    pub burn_in: usize,

    /// Write the chain summary to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ChainArgs {
    /// Posterior chain FITS file.
    #[arg(long, value_name = "FITS")]
    pub chain: PathBuf,

    /// Chain rows dropped before summarizing.
    #[arg(long, default_value_t = DEFAULT_BURN_IN)]
    pub burn_in: usize,

    /// Write the summary to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct PlotsArgs {
    /// Project root the plot paths are relative to.
    #[arg(long, env = "ORBIT_PREP_ROOT")]
    pub root: PathBuf,

    /// Destination directory, relative to the root unless absolute.
    #[arg(long, default_value = DEFAULT_PLOT_DEST)]
    pub dest: PathBuf,
}
