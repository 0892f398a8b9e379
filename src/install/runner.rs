//! The boundary between the installer and the external package manager.

use super::command::InstallCommand;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::process::Command;

/// Makes sharp download its own prebuilt libvips instead of linking whatever
/// the build host has installed, which would be the wrong binary for the target.
pub const SHARP_IGNORE_GLOBAL_LIBVIPS: &str = "SHARP_IGNORE_GLOBAL_LIBVIPS";

/// Environment overrides layered on top of the inherited process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallEnv {
    vars: BTreeMap<String, String>,
}

impl InstallEnv {
    /// No overrides at all.
    pub fn empty() -> Self {
        Self {
            vars: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for InstallEnv {
    fn default() -> Self {
        Self::empty().with(SHARP_IGNORE_GLOBAL_LIBVIPS, "1")
    }
}

/// Exit status and captured streams of one package manager run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs an install command to completion and captures its output.
///
/// `Err` means the process could not be run at all; a process that ran and
/// failed is reported through [`RunOutput::code`].
pub trait PackageManager: Send + Sync {
    fn run(
        &self,
        command: &InstallCommand,
        working_dir: &Path,
        env: &InstallEnv,
    ) -> io::Result<RunOutput>;
}

/// Runs the command line through the platform shell, so raw additional
/// arguments are split exactly as a user typing them would expect.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellPackageManager;

impl PackageManager for ShellPackageManager {
    fn run(
        &self,
        command: &InstallCommand,
        working_dir: &Path,
        env: &InstallEnv,
    ) -> io::Result<RunOutput> {
        let line = command.command_line();
        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", line.as_str()]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", line.as_str()]);
            c
        };
        cmd.current_dir(working_dir).envs(env.iter());

        tracing::debug!(command = %line, cwd = %working_dir.display(), "spawning package manager");
        let output = cmd.output()?;

        Ok(RunOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Whether `program --version` can be executed, and the first line it prints.
pub fn probe_version(program: &str) -> Option<String> {
    let output = Command::new(program).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Some(stdout.lines().next().unwrap_or("unknown").trim().to_string())
}
