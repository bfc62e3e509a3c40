//! Invoking the external fitting tool.
//!
//! The tool only works when started from its install directory, so the
//! process working directory is switched for the duration of the call by a
//! guard that switches back on drop.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::fit::config::{absolute, relative_path, FitRunnerConfig};

/// Lines of captured stderr kept in a failure message.
const STDERR_TAIL_LINES: usize = 20;

/// Restores the original working directory when dropped.
#[derive(Debug)]
pub struct WorkdirGuard {
    original: PathBuf,
}

impl WorkdirGuard {
    pub fn enter(dir: &Path) -> Result<Self, AppError> {
        let original = env::current_dir()
            .map_err(|e| AppError::filesystem(format!("Failed to read the current directory: {e}")))?;
        env::set_current_dir(dir)
            .map_err(|e| AppError::filesystem(format!("Failed to enter '{}': {e}", dir.display())))?;
        Ok(Self { original })
    }

    pub fn original(&self) -> &Path {
        &self.original
    }
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.original) {
            warn!(dir = %self.original.display(), error = %e, "failed to restore working directory");
        }
    }
}

/// A fully resolved command line for the fitting tool.
#[derive(Debug, Clone, PartialEq)]
pub struct FitInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub tool_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl FitInvocation {
    pub fn from_config(config: &FitRunnerConfig) -> Result<Self, AppError> {
        let tool_dir = config.tool_dir()?;
        let output_dir = config.output_dir()?;
        let config_arg = relative_path(&config.config_path()?, &tool_dir);
        let output_arg = relative_path(&output_dir, &tool_dir);

        // A relative executable path would break once the directory changes.
        let program = if config.executable_is_bare() {
            config.fit_executable.clone()
        } else {
            absolute(&config.fit_executable)?
        };

        Ok(Self {
            program,
            args: vec![
                config_arg.into_os_string(),
                OsString::from("--output-dir"),
                output_arg.into_os_string(),
            ],
            tool_dir,
            output_dir,
        })
    }

    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Create the output directory, run the tool from its directory, and wait for
/// it. The original working directory is restored on every path out.
pub fn run_fit(config: &FitRunnerConfig) -> Result<FitInvocation, AppError> {
    let invocation = FitInvocation::from_config(config)?;

    fs::create_dir_all(&invocation.output_dir).map_err(|e| {
        AppError::filesystem(format!(
            "Failed to create output directory '{}': {e}",
            invocation.output_dir.display()
        ))
    })?;

    let guard = WorkdirGuard::enter(&invocation.tool_dir)?;
    debug!(from = %guard.original().display(), to = %invocation.tool_dir.display(), "changed working directory");
    info!(cwd = %invocation.tool_dir.display(), command = %invocation.display(), "starting fitting tool");

    let output = Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| AppError::external(format!("Failed to start '{}': {e}", invocation.program.display())))?;

    // Captured for the error message; still shown to the user.
    if !output.stderr.is_empty() {
        eprint!("{}", String::from_utf8_lossy(&output.stderr));
    }

    if !output.status.success() {
        let tail = stderr_tail(&output.stderr);
        let mut message = format!("'{}' exited with {}", invocation.display(), output.status);
        if !tail.is_empty() {
            message.push_str(&format!("; stderr:\n{tail}"));
        }
        return Err(AppError::external(message));
    }

    info!(status = %output.status, "fitting tool finished");
    Ok(invocation)
}

/// The working directory is process-global; tests that change it run one at
/// a time.
#[cfg(test)]
pub(crate) static CWD_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let text: String = (0..30).map(|i| format!("line {i}\n")).collect();
        let tail = stderr_tail(text.as_bytes());
        assert!(tail.starts_with("line 10\n"));
        assert!(tail.ends_with("line 29"));
    }

    #[test]
    fn invocation_uses_paths_relative_to_tool_dir() {
        let mut cfg = FitRunnerConfig::new("/home/u/gamma_cep/orvara_fit");
        cfg.working_directory_override = Some(PathBuf::from("/data/planet_bd"));

        let inv = FitInvocation::from_config(&cfg).unwrap();
        assert_eq!(inv.program, PathBuf::from("fit_orbit"));
        assert_eq!(
            inv.display(),
            "fit_orbit ../../home/u/gamma_cep/orvara_fit/config_gamma_cep.ini --output-dir ../../home/u/gamma_cep/orvara_fit/outputs"
        );
    }

    #[test]
    fn guard_restores_directory_on_drop() {
        let _lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        {
            let guard = WorkdirGuard::enter(dir.path()).unwrap();
            assert_eq!(guard.original(), before.as_path());
            assert_ne!(env::current_dir().unwrap(), before);
        }
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_is_external_error_and_cwd_is_restored() {
        let _lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let mut cfg = FitRunnerConfig::new(dir.path().join("project"));
        cfg.fit_executable = PathBuf::from("false");
        cfg.working_directory_override = Some(dir.path().to_path_buf());

        let err = run_fit(&cfg).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::External);
        assert!(err.to_string().contains("exited with"));
        assert_eq!(env::current_dir().unwrap(), before);
        // The output directory is created before the tool runs.
        assert!(dir.path().join("project").join("outputs").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn missing_tool_is_external_error_and_cwd_is_restored() {
        let _lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let mut cfg = FitRunnerConfig::new(dir.path());
        cfg.fit_executable = PathBuf::from("orbit-prep-test-no-such-tool");
        cfg.working_directory_override = Some(dir.path().to_path_buf());

        let err = run_fit(&cfg).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::External);
        assert!(err.to_string().contains("Failed to start"));
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[cfg(unix)]
    #[test]
    fn tool_runs_inside_tool_dir_with_relative_arguments() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("tools");
        let project = dir.path().join("project");
        fs::create_dir_all(&tool).unwrap();
        fs::create_dir_all(&project).unwrap();

        // Records its working directory and arguments next to itself.
        let script = tool.join("fake_fit");
        fs::write(&script, "#!/bin/sh\npwd > ran_in.txt\necho \"$@\" > args.txt\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let mut cfg = FitRunnerConfig::new(&project);
        cfg.fit_executable = script;

        run_fit(&cfg).unwrap();
        assert_eq!(env::current_dir().unwrap(), before);

        let args = fs::read_to_string(tool.join("args.txt")).unwrap();
        assert_eq!(
            args.trim(),
            "../project/config_gamma_cep.ini --output-dir ../project/outputs"
        );
        assert!(tool.join("ran_in.txt").exists());
        assert!(project.join("outputs").is_dir());
    }
}
