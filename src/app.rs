//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs the requested pipeline
//! - prints reports

use clap::Parser;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::{ChainArgs, Cli, Command, FitArgs, FitRunnerArgs, PlotsArgs, RelastArgs, RvsArgs};
use crate::error::AppError;
use crate::fit::config::{FitRunnerConfig, DEFAULT_FIT_EXECUTABLE, PLOT_EXECUTABLE};

pub mod pipeline;

/// Entry point for the `orbit-prep` binary.
pub fn run() -> Result<(), AppError> {
    // Environment fallbacks for the CLI may live in `.env`.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Rvs(args) => handle_rvs(args),
        Command::Relast(args) => handle_relast(args),
        Command::PrepConfig(args) => handle_prep_config(args),
        Command::Fit(args) => handle_fit(args),
        Command::Chain(args) => handle_chain(args),
        Command::Plots(args) => handle_plots(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok();
}

fn handle_rvs(args: RvsArgs) -> Result<(), AppError> {
    if !args.new_cutoff_jd.is_finite() {
        return Err(AppError::usage("--new-cutoff-jd must be a finite Julian date."));
    }

    let mut opts = pipeline::RvFormatOptions::new(&args.data_dir);
    if let Some(out_dir) = args.out_dir {
        opts.out_dir = out_dir;
    }
    if !args.instruments.is_empty() {
        opts.allow = args.instruments;
    }
    opts.diagnostics.new_cutoff_jd = args.new_cutoff_jd;

    let run = pipeline::run_rv_format(&opts)?;

    if !args.no_diagnostics {
        println!("{}", crate::report::format_diagnostics(&run.diagnostics));
    }
    println!(
        "Wrote {} RVs to {}, {} and {}",
        run.kept.len(),
        run.generic_path.display(),
        run.legacy_path.display(),
        run.latex_path.display()
    );
    Ok(())
}

fn handle_relast(args: RelastArgs) -> Result<(), AppError> {
    let out_dir = args.out_dir.unwrap_or_else(|| args.data_dir.clone());
    let run = pipeline::run_relast_format(&args.data_dir, &out_dir)?;
    println!(
        "Wrote {} astrometry points to {} and {}",
        run.records.len(),
        run.generic_path.display(),
        run.legacy_path.display()
    );
    Ok(())
}

fn handle_prep_config(args: FitRunnerArgs) -> Result<(), AppError> {
    let config = runner_config_from_args(&args, false);
    let outcome = crate::fit::config::prep_config(&config)?;
    if outcome.written() {
        println!(
            "Updated {} in {}",
            outcome.changed_keys.join(", "),
            outcome.config_path.display()
        );
    } else {
        println!("{} already up to date", outcome.config_path.display());
    }
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = runner_config_from_args(&args.runner, args.plot);
    let opts = pipeline::FitFlowOptions {
        rewrite_config: !args.skip_rewrite,
        summarize_burn_in: args.summarize.then_some(args.burn_in),
    };

    let run = pipeline::run_fit_flow(&config, &opts)?;
    println!("Ran: {}", run.invocation.display());

    if let Some(summary) = &run.summary {
        println!("{}", crate::report::format_chain_summary(summary));
        if let Some(path) = &args.export_json {
            crate::fit::chain::write_summary_json(path, summary)?;
        }
    }
    Ok(())
}

fn handle_chain(args: ChainArgs) -> Result<(), AppError> {
    let summary = crate::fit::chain::summarize_chain(&args.chain, args.burn_in)?;
    println!("{}", crate::report::format_chain_summary(&summary));
    if let Some(path) = &args.export_json {
        crate::fit::chain::write_summary_json(path, &summary)?;
    }
    Ok(())
}

fn handle_plots(args: PlotsArgs) -> Result<(), AppError> {
    let report = crate::plot::collect_plots(&args.root, &args.dest, &crate::plot::PAPER_PLOTS)?;
    print!("{}", crate::report::format_collect_report(&report));

    if !report.is_complete() {
        return Err(AppError::filesystem(format!(
            "{} of {} plots could not be copied.",
            report.failed.len(),
            crate::plot::PAPER_PLOTS.len()
        )));
    }
    Ok(())
}

/// Build the fit-runner configuration; `plot` selects the plotting entry
/// point when no executable was given.
pub fn runner_config_from_args(args: &FitRunnerArgs, plot: bool) -> FitRunnerConfig {
    let default_exe = if plot { PLOT_EXECUTABLE } else { DEFAULT_FIT_EXECUTABLE };
    FitRunnerConfig {
        fit_executable: args.fit_executable.clone().unwrap_or_else(|| default_exe.into()),
        working_directory_override: args.tool_dir.clone(),
        config_template: args.config.clone(),
        output_directory: args.output_dir.clone(),
        project_dir: args.project_dir.clone(),
        target: args.target.clone(),
    }
}
