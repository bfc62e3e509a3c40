//! Copy the fitter's plots into one directory under paper-ready names.
//!
//! A missing or unreadable source does not stop the batch; every failure is
//! collected in the [`CollectReport`].

use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::AppError;

/// Default destination directory, relative to the project root.
pub const DEFAULT_PLOT_DEST: &str = "paper_plots_gamma_cep";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotCopy {
    /// Source path relative to the project root.
    pub source: &'static str,
    pub new_name: &'static str,
}

pub const PAPER_PLOTS: [PlotCopy; 8] = [
    PlotCopy {
        source: "orvara_fit/outputs_good/companion_0_Temp0/RV_OC_gamma_cep_InstAll.pdf",
        new_name: "all_rvs.pdf",
    },
    PlotCopy {
        source: "orvara_fit/outputs_good/companion_0_Temp0/RV_OC_gamma_cep_Inst[4,5,6].pdf",
        new_name: "precision_rvs.pdf",
    },
    PlotCopy {
        source: "orvara_fit/outputs_good/companion_0_Temp0/astrometric_orbit_gamma_cep.pdf",
        new_name: "astrometric_orbit.pdf",
    },
    PlotCopy {
        source: "orvara_fit/outputs_good/companion_0_Temp0/ProperMotions_RA_gamma_cep.pdf",
        new_name: "proper_motion_RA.pdf",
    },
    PlotCopy {
        source: "orvara_fit/outputs_good/companion_0_Temp0/ProperMotions_Dec_gamma_cep.pdf",
        new_name: "proper_motion_Dec.pdf",
    },
    PlotCopy {
        source: "orvara_fit/outputs_good/companion_0_Temp0/PA_OC_gamma_cep.pdf",
        new_name: "PA.pdf",
    },
    PlotCopy {
        source: "orvara_fit/outputs_good/companion_0_Temp0/relsep_OC_gamma_cep.pdf",
        new_name: "RelSep.pdf",
    },
    PlotCopy {
        source: "inj_rec/GammaCep_30BIC/GammaCep_30BIC_recoveries.png",
        new_name: "inj_rec.png",
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct CopyFailure {
    pub source: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectReport {
    pub dest: PathBuf,
    pub copied: Vec<PathBuf>,
    pub failed: Vec<CopyFailure>,
}

impl CollectReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Copy `src` to `dst`, keeping permission bits and access/modification times.
pub fn copy_preserving(src: &Path, dst: &Path) -> io::Result<()> {
    // `fs::copy` carries the permission bits over.
    fs::copy(src, dst)?;
    let meta = fs::metadata(src)?;
    let times = FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    // Setting times needs ownership, not write access.
    File::open(dst)?.set_times(times)
}

/// Copy every entry of `plots` from under `root` into `dest` (relative to
/// `root` unless absolute), creating `dest` if needed.
pub fn collect_plots(root: &Path, dest: &Path, plots: &[PlotCopy]) -> Result<CollectReport, AppError> {
    let dest = root.join(dest);
    fs::create_dir_all(&dest).map_err(|e| {
        AppError::filesystem(format!("Failed to create plot directory '{}': {e}", dest.display()))
    })?;

    let mut report = CollectReport {
        dest: dest.clone(),
        ..CollectReport::default()
    };

    for plot in plots {
        let src = root.join(plot.source);
        let dst = dest.join(plot.new_name);
        match copy_preserving(&src, &dst) {
            Ok(()) => {
                debug!(src = %src.display(), dst = %dst.display(), "copied plot");
                report.copied.push(dst);
            }
            Err(e) => {
                warn!(src = %src.display(), error = %e, "could not copy plot");
                report.failed.push(CopyFailure {
                    source: src,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}
