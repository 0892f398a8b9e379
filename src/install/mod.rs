//! Staged cross-installation of native dependencies.
//!
//! An install never runs inside the output directory, which may already hold
//! a manifest and a traced `node_modules` the package manager would try to
//! reconcile. Instead:
//!
//! 1. a fresh staging directory is created under the temp root,
//! 2. `<pm> install --platform=<os> [--arch] [--target] [--libc] [args] <packages>`
//!    runs inside it with captured output,
//! 3. the staged `node_modules` is merged into `<output>/node_modules`,
//! 4. the staging directory is removed.
//!
//! Failures are logged and reported through [`InstallOutcome`]; they are
//! never raised to the caller, so one failing output does not abort a build.

pub mod command;
pub mod copy;
pub mod runner;
pub mod staging;

pub use command::InstallCommand;
pub use copy::merge_tree;
pub use runner::{InstallEnv, PackageManager, RunOutput, ShellPackageManager};
pub use staging::{
    DEPENDENCY_DIR, STAGING_PREFIX, StagingDir, output_label, remove_staging, stale_staging_dirs,
    temp_root,
};

use crate::config::{DEFAULT_PACKAGE_MANAGER, DEFAULT_PLATFORM, InstallConfig, Settings};
use crate::error::InstallError;
use std::path::{Path, PathBuf};

/// Result of a completed install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub label: String,
    /// `<output>/node_modules`
    pub destination: PathBuf,
    pub files_copied: usize,
}

#[derive(Debug)]
pub enum InstallOutcome {
    /// No configuration was given; nothing was touched.
    Skipped,
    Installed(InstallReport),
    Failed(InstallError),
}

impl InstallOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, InstallOutcome::Failed(_))
    }

    pub fn report(&self) -> Option<&InstallReport> {
        match self {
            InstallOutcome::Installed(report) => Some(report),
            _ => None,
        }
    }
}

pub struct DependencyInstaller<P = ShellPackageManager> {
    package_manager: P,
    program: String,
    platform: String,
    env: InstallEnv,
    temp_root: PathBuf,
}

impl DependencyInstaller<ShellPackageManager> {
    /// `npm`, run through the shell, targeting linux, with sharp's global
    /// libvips detection disabled.
    pub fn new() -> Self {
        Self::with_package_manager(ShellPackageManager)
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new()
            .with_program(&settings.package_manager)
            .with_platform(&settings.platform)
    }
}

impl Default for DependencyInstaller<ShellPackageManager> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PackageManager> DependencyInstaller<P> {
    pub fn with_package_manager(package_manager: P) -> Self {
        Self {
            package_manager,
            program: DEFAULT_PACKAGE_MANAGER.to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
            env: InstallEnv::default(),
            temp_root: temp_root(),
        }
    }

    /// Executable name used as the first word of the command line.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_env(mut self, env: InstallEnv) -> Self {
        self.env = env;
        self
    }

    /// Directory under which staging directories are created.
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }

    pub fn command_for(&self, config: &InstallConfig) -> InstallCommand {
        InstallCommand::new(&self.program, &self.platform, config)
    }

    /// Install `config` into `output_dir`, logging and absorbing any failure.
    pub fn install(&self, output_dir: &Path, config: Option<&InstallConfig>) -> InstallOutcome {
        match self.try_install(output_dir, config) {
            Ok(None) => InstallOutcome::Skipped,
            Ok(Some(report)) => InstallOutcome::Installed(report),
            Err(err) => {
                if let Some(stdout) = err.captured_output() {
                    tracing::error!("{stdout}");
                }
                tracing::debug!("{err}");
                tracing::error!("Could not install dependencies");
                InstallOutcome::Failed(err)
            }
        }
    }

    /// Like [`install`](Self::install), but hands the error back. `Ok(None)`
    /// means there was nothing to do.
    pub fn try_install(
        &self,
        output_dir: &Path,
        config: Option<&InstallConfig>,
    ) -> Result<Option<InstallReport>, InstallError> {
        let Some(config) = config else {
            return Ok(None);
        };

        let label = output_label(output_dir);
        let staging = StagingDir::create(&self.temp_root, &label)?;
        tracing::info!("Installing dependencies for {label}...");

        let command = self.command_for(config);
        let output = self
            .package_manager
            .run(&command, staging.path(), &self.env)
            .map_err(|source| InstallError::Spawn {
                command: command.command_line(),
                source,
            })?;
        if !output.success() {
            return Err(InstallError::CommandFailed {
                command: command.command_line(),
                code: output.code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        let destination = output_dir.join(DEPENDENCY_DIR);
        let files_copied = merge_tree(&staging.dependency_dir(), &destination)?;

        staging.close();
        tracing::info!("Dependencies installed for {label}");

        Ok(Some(InstallReport {
            label,
            destination,
            files_copied,
        }))
    }
}

/// Install with the default npm installer.
pub fn install_dependencies(output_dir: &Path, config: Option<&InstallConfig>) -> InstallOutcome {
    DependencyInstaller::new().install(output_dir, config)
}
