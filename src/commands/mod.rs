//! CLI command handlers
//!
//! `install` and `plan` share the same way of deciding which outputs to work
//! on: either a single output described by flags, or every `[[output]]` in
//! `depstage.toml`.

pub mod clean;
pub mod doctor;
pub mod install;
pub mod plan;

use anyhow::{Result, bail};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{self, CONFIG_FILE, DepstageConfig, InstallConfig, OutputConfig, Settings};

/// Output selection shared by `install` and `plan`.
#[derive(Clone, Debug, Default)]
pub struct TargetArgs {
    pub output_dir: Option<PathBuf>,
    pub packages: Vec<String>,
    pub arch: Option<String>,
    pub node_version: Option<String>,
    pub libc: Option<String>,
    pub additional_args: Option<String>,
    pub config: Option<PathBuf>,
    pub package_manager: Option<String>,
    pub platform: Option<String>,
}

impl TargetArgs {
    fn has_install_flags(&self) -> bool {
        !self.packages.is_empty()
            || self.arch.is_some()
            || self.node_version.is_some()
            || self.libc.is_some()
            || self.additional_args.is_some()
    }

    fn install_config(&self) -> Option<InstallConfig> {
        if self.packages.is_empty() {
            return None;
        }
        Some(InstallConfig {
            packages: self.packages.clone(),
            arch: self.arch.clone(),
            node_version: self.node_version.clone(),
            libc: self.libc.clone(),
            additional_args: self.additional_args.clone(),
        })
    }

    /// Settings plus the outputs to process, in order.
    pub fn resolve(&self) -> Result<(Settings, Vec<OutputConfig>)> {
        let config_path = self
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

        let (mut settings, outputs) = match &self.output_dir {
            Some(dir) => {
                let install = self.install_config();
                if let Some(install) = &install {
                    install.validate()?;
                }
                // Settings still come from the project file when there is one.
                let settings = if self.config.is_some() || Path::new(&config_path).exists() {
                    config::load_config(&config_path)?.settings
                } else {
                    Settings::default()
                };
                (
                    settings,
                    vec![OutputConfig {
                        dir: dir.clone(),
                        install,
                    }],
                )
            }
            None => {
                if self.has_install_flags() {
                    bail!("--package, --arch, --target, --libc and --args need an OUTPUT_DIR");
                }
                let DepstageConfig { settings, outputs } = config::load_config(&config_path)?;
                reject_duplicate_dirs(&outputs)?;
                (settings, outputs)
            }
        };

        if let Some(pm) = &self.package_manager {
            settings.package_manager = pm.clone();
        }
        if let Some(platform) = &self.platform {
            settings.platform = platform.clone();
        }
        settings.validate()?;
        Ok((settings, outputs))
    }
}

/// Two entries merging into one directory would race under `--jobs`.
fn reject_duplicate_dirs(outputs: &[OutputConfig]) -> Result<()> {
    let mut seen = HashSet::new();
    for output in outputs {
        let key = fs::canonicalize(&output.dir).unwrap_or_else(|_| output.dir.clone());
        if !seen.insert(key) {
            bail!(
                "output directory '{}' is listed more than once",
                output.dir.display()
            );
        }
    }
    Ok(())
}
