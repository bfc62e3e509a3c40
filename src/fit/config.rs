//! Fit-runner configuration and the `.ini` path rewrite.
//!
//! The fitting tool resolves every path in its config relative to its own
//! install directory (it must be started from there). Before a run we rewrite
//! a fixed set of path keys so they point back into the project directory,
//! whatever machine the project is checked out on.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::error::AppError;
use crate::fit::chain::chain_file_name;

pub const DEFAULT_FIT_EXECUTABLE: &str = "fit_orbit";
pub const PLOT_EXECUTABLE: &str = "plot_orbit";
pub const DEFAULT_TARGET: &str = "gamma_cep";

/// Where the fitting tool lives, which config it reads, and where it writes.
#[derive(Debug, Clone, PartialEq)]
pub struct FitRunnerConfig {
    /// Bare program name (looked up on `PATH`) or a path to the executable.
    pub fit_executable: PathBuf,
    /// Directory the tool is started from; see [`FitRunnerConfig::tool_dir`].
    pub working_directory_override: Option<PathBuf>,
    /// Defaults to `config_<target>.ini` in the project directory.
    pub config_template: Option<PathBuf>,
    /// Defaults to `outputs/` in the project directory.
    pub output_directory: Option<PathBuf>,
    pub project_dir: PathBuf,
    pub target: String,
}

impl FitRunnerConfig {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            fit_executable: PathBuf::from(DEFAULT_FIT_EXECUTABLE),
            working_directory_override: None,
            config_template: None,
            output_directory: None,
            project_dir: project_dir.into(),
            target: DEFAULT_TARGET.to_string(),
        }
    }

    /// True when the executable is a bare name to be resolved through `PATH`.
    pub fn executable_is_bare(&self) -> bool {
        self.fit_executable.components().count() == 1
            && matches!(self.fit_executable.components().next(), Some(Component::Normal(_)))
    }

    /// Absolute tool directory: the override, else the executable's parent
    /// directory, else the caller's working directory.
    pub fn tool_dir(&self) -> Result<PathBuf, AppError> {
        let dir = match &self.working_directory_override {
            Some(dir) => dir.clone(),
            None if self.executable_is_bare() => PathBuf::from("."),
            None => self
                .fit_executable
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
        };
        absolute(&dir)
    }

    pub fn project_dir_abs(&self) -> Result<PathBuf, AppError> {
        absolute(&self.project_dir)
    }

    pub fn config_path(&self) -> Result<PathBuf, AppError> {
        match &self.config_template {
            Some(path) => absolute(path),
            None => Ok(self.project_dir_abs()?.join(format!("config_{}.ini", self.target))),
        }
    }

    pub fn output_dir(&self) -> Result<PathBuf, AppError> {
        match &self.output_directory {
            Some(path) => absolute(path),
            None => Ok(self.project_dir_abs()?.join("outputs")),
        }
    }

    /// The chain the tool writes into the output directory.
    pub fn chain_path(&self) -> Result<PathBuf, AppError> {
        Ok(self.output_dir()?.join(chain_file_name(&self.target)))
    }

    /// Project directory as seen from the tool directory.
    pub fn project_from_tool(&self) -> Result<PathBuf, AppError> {
        Ok(relative_path(&self.project_dir_abs()?, &self.tool_dir()?))
    }
}

/// Lexically absolute path (no symlink resolution).
pub fn absolute(path: &Path) -> Result<PathBuf, AppError> {
    std::path::absolute(path)
        .map(|p| normalize(&p))
        .map_err(|e| AppError::filesystem(format!("Failed to resolve '{}': {e}", path.display())))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `path` relative to `base`; both must be absolute and normalized.
/// Returns `.` when they are equal.
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base_parts.len() {
        out.push("..");
    }
    for part in &path_parts[common..] {
        out.push(part.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Key and replacement value for one config line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    pub key: &'static str,
    pub value: String,
}

fn join_str(base: &Path, tail: &str) -> String {
    format!("{}/{tail}", base.display())
}

/// The path keys the fitting tool reads, pointed at `rel` (project dir seen
/// from the tool dir) and `tool` (the tool dir itself).
pub fn rewrite_rules(rel: &Path, tool: &Path, target: &str) -> Vec<RewriteRule> {
    let rule = |key, value| RewriteRule { key, value };
    vec![
        rule("RVFile", join_str(rel, "../data/orvara_all_rvs.txt")),
        rule("AstrometryFile", join_str(rel, "../data/orvara_all_relAst.txt")),
        rule("GaiaDataDir", join_str(tool, "orvara/tests/data/gaia/")),
        rule("Hip1DataDir", join_str(tool, "orvara/tests/data/hip1/")),
        rule("Hip2DataDir", join_str(tool, "orvara/tests/data/hip2/")),
        rule("start_file", join_str(rel, &format!("start_{target}.txt"))),
        rule("McmcDataFile", join_str(rel, &format!("outputs/{}", chain_file_name(target)))),
    ]
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Apply `rules` to config text. Only lines whose key (text before the first
/// `=`, trimmed) equals a rule key are replaced; every other line, including
/// its line ending, is kept byte for byte.
pub fn rewrite_config_text(text: &str, rules: &[RewriteRule]) -> (String, Vec<&'static str>) {
    let mut out = String::with_capacity(text.len());
    let mut changed = Vec::new();

    for line in text.split_inclusive('\n') {
        let (body, ending) = split_line_ending(line);
        let rule = body
            .split_once('=')
            .and_then(|(key, _)| rules.iter().find(|r| r.key == key.trim()));

        match rule {
            Some(rule) => {
                let replacement = format!("{} = {}", rule.key, rule.value);
                if replacement != body {
                    changed.push(rule.key);
                }
                out.push_str(&replacement);
            }
            None => out.push_str(body),
        }
        out.push_str(ending);
    }

    (out, changed)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrepOutcome {
    pub config_path: PathBuf,
    pub changed_keys: Vec<&'static str>,
}

impl PrepOutcome {
    pub fn written(&self) -> bool {
        !self.changed_keys.is_empty()
    }
}

/// Rewrite the config file in place. The file is only written when its
/// content changes.
pub fn prep_config(config: &FitRunnerConfig) -> Result<PrepOutcome, AppError> {
    let config_path = config.config_path()?;
    let tool = config.tool_dir()?;
    let rel = config.project_from_tool()?;
    debug!(tool = %tool.display(), rel = %rel.display(), "resolved fit-runner paths");

    let text = fs::read_to_string(&config_path).map_err(|e| {
        AppError::input(format!(
            "Failed to read config '{}': {e}. Expected an `.ini` file with `Key = value` lines.",
            config_path.display()
        ))
    })?;

    let rules = rewrite_rules(&rel, &tool, &config.target);
    let (rewritten, changed_keys) = rewrite_config_text(&text, &rules);

    if rewritten != text {
        fs::write(&config_path, rewritten).map_err(|e| {
            AppError::filesystem(format!("Failed to write config '{}': {e}", config_path.display()))
        })?;
        info!(path = %config_path.display(), keys = ?changed_keys, "rewrote config paths");
    } else {
        info!(path = %config_path.display(), "config paths already up to date");
    }

    Ok(PrepOutcome {
        config_path,
        changed_keys,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<RewriteRule> {
        rewrite_rules(Path::new("../projects/gamma_cep/orvara_fit"), Path::new("/opt/tools"), "gamma_cep")
    }

    #[test]
    fn only_whitelisted_keys_change() {
        let text = "[data]\nRVFile = x\nUnrelatedKey = y\n# RVFile = commented\n";
        let (out, changed) = rewrite_config_text(text, &rules());

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "[data]");
        assert_eq!(lines[1], "RVFile = ../projects/gamma_cep/orvara_fit/../data/orvara_all_rvs.txt");
        assert_eq!(lines[2], "UnrelatedKey = y");
        assert_eq!(lines[3], "# RVFile = commented");
        assert_eq!(changed, vec!["RVFile"]);
    }

    #[test]
    fn keys_match_exactly_not_by_prefix() {
        let text = "RVFileBackup = keep\nstart_file_old = keep\n  McmcDataFile=old\n";
        let (out, changed) = rewrite_config_text(text, &rules());
        assert!(out.starts_with("RVFileBackup = keep\nstart_file_old = keep\n"));
        assert!(out.ends_with(
            "McmcDataFile = ../projects/gamma_cep/orvara_fit/outputs/gamma_cep_Temp0_chain000.fits\n"
        ));
        assert_eq!(changed, vec!["McmcDataFile"]);
    }

    #[test]
    fn rewrite_is_idempotent_and_keeps_line_endings() {
        let text = "GaiaDataDir = old\r\nHip1DataDir = old\r\nother = 1";
        let (once, _) = rewrite_config_text(text, &rules());
        assert!(once.contains("GaiaDataDir = /opt/tools/orvara/tests/data/gaia/\r\n"));
        assert!(once.ends_with("other = 1"));

        let (twice, changed) = rewrite_config_text(&once, &rules());
        assert_eq!(once, twice);
        assert!(changed.is_empty());
    }

    #[test]
    fn relative_path_walks_up_and_down() {
        assert_eq!(
            relative_path(Path::new("/home/u/proj/fit"), Path::new("/opt/tools")),
            PathBuf::from("../../home/u/proj/fit")
        );
        assert_eq!(relative_path(Path::new("/a/b/c"), Path::new("/a")), PathBuf::from("b/c"));
        assert_eq!(relative_path(Path::new("/a/b"), Path::new("/a/b")), PathBuf::from("."));
    }

    #[test]
    fn tool_dir_defaults_to_executable_parent() {
        let mut cfg = FitRunnerConfig::new("/proj");
        cfg.fit_executable = PathBuf::from("/opt/tools/bin/fit_orbit");
        assert_eq!(cfg.tool_dir().unwrap(), PathBuf::from("/opt/tools/bin"));

        cfg.working_directory_override = Some(PathBuf::from("/srv/orvara/../planet_bd"));
        assert_eq!(cfg.tool_dir().unwrap(), PathBuf::from("/srv/planet_bd"));

        let bare = FitRunnerConfig::new("/proj");
        assert!(bare.executable_is_bare());
        assert!(bare.tool_dir().unwrap().is_absolute());
    }

    #[test]
    fn default_paths_follow_target() {
        let mut cfg = FitRunnerConfig::new("/proj/orvara_fit");
        cfg.target = "hd_1234".to_string();
        assert_eq!(cfg.config_path().unwrap(), PathBuf::from("/proj/orvara_fit/config_hd_1234.ini"));
        assert_eq!(cfg.output_dir().unwrap(), PathBuf::from("/proj/orvara_fit/outputs"));
        assert_eq!(
            cfg.chain_path().unwrap(),
            PathBuf::from("/proj/orvara_fit/outputs/hd_1234_Temp0_chain000.fits")
        );
    }

    #[test]
    fn prep_config_writes_only_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("project");
        let tool = dir.path().join("tools");
        fs::create_dir_all(&project).unwrap();
        fs::create_dir_all(&tool).unwrap();

        let ini = project.join("config_gamma_cep.ini");
        fs::write(&ini, "[mcmc]\nstart_file = nowhere\nnsteps = 100\n").unwrap();

        let mut cfg = FitRunnerConfig::new(&project);
        cfg.working_directory_override = Some(tool);

        let first = prep_config(&cfg).unwrap();
        assert!(first.written());
        let text = fs::read_to_string(&ini).unwrap();
        assert_eq!(text, "[mcmc]\nstart_file = ../project/start_gamma_cep.txt\nnsteps = 100\n");

        let second = prep_config(&cfg).unwrap();
        assert!(!second.written());
        assert_eq!(fs::read_to_string(&ini).unwrap(), text);
    }
}
