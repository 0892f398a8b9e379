//! Package manager command-line construction.
//!
//! Flags appear in a fixed order: platform, arch, target, libc, the raw
//! additional arguments, then the packages in the order the caller gave them.
//! Fields that are absent (or blank) contribute nothing to the line.

use crate::config::{DEFAULT_PACKAGE_MANAGER, DEFAULT_PLATFORM, InstallConfig};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCommand {
    program: String,
    args: Vec<String>,
}

impl InstallCommand {
    /// Build the `install` invocation for `config`, targeting `platform`.
    pub fn new(program: &str, platform: &str, config: &InstallConfig) -> Self {
        let mut args = vec!["install".to_string(), format!("--platform={platform}")];

        if let Some(arch) = present(&config.arch) {
            args.push(format!("--arch={arch}"));
        }
        if let Some(version) = present(&config.node_version) {
            args.push(format!("--target={version}"));
        }
        if let Some(libc) = present(&config.libc) {
            args.push(format!("--libc={libc}"));
        }
        // Kept as a single token; the shell splits it.
        if let Some(extra) = present(&config.additional_args) {
            args.push(extra.to_string());
        }
        args.extend(config.packages.iter().cloned());

        Self {
            program: program.to_string(),
            args,
        }
    }

    /// `npm install --platform=linux ...`
    pub fn npm(config: &InstallConfig) -> Self {
        Self::new(DEFAULT_PACKAGE_MANAGER, DEFAULT_PLATFORM, config)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The full line handed to the shell.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

impl fmt::Display for InstallCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Blank values count as absent; anything else is passed through untouched.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
