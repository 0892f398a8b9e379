//! # depstage - Staged Native Dependency Installer
//!
//! depstage installs platform-specific runtime dependencies (sharp, canvas,
//! and friends) into a build output directory as the last step of a build.
//! The output directory may already hold a traced `node_modules` and a
//! `package.json`, so the package manager never runs there: it runs in an
//! isolated staging directory, targeted at the deployment platform, and only
//! the resulting `node_modules` is merged back.
//!
//! ## Quick Start
//!
//! ```bash
//! # One output, described on the command line
//! depstage install .open-next/server-functions/default -p sharp@0.32.0 --arch arm64
//!
//! # Every [[output]] in depstage.toml
//! depstage install --jobs 4
//! ```
//!
//! ## Library use
//!
//! ```no_run
//! use depstage::config::InstallConfig;
//! use depstage::install::install_dependencies;
//! use std::path::Path;
//!
//! let config = InstallConfig::new(["sharp@0.32.0"]).with_arch("arm64").with_libc("glibc");
//! let outcome = install_dependencies(Path::new("/build/out/server-fn"), Some(&config));
//! if outcome.is_failed() {
//!     // already logged; the build carries on
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`install`] - Staging, package manager invocation, and merge
//! - [`config`] - `InstallConfig` and `depstage.toml`
//! - [`error`] - `InstallError`
//! - [`commands`] - CLI command handlers

/// CLI command handlers extracted from main.
pub mod commands;

/// Configuration types and `depstage.toml` parsing.
pub mod config;

/// Installation errors.
pub mod error;

/// Staged cross-installation of native dependencies.
pub mod install;

/// Terminal UI utilities (tables, spinners).
pub mod ui;

pub use config::InstallConfig;
pub use error::InstallError;
pub use install::{DependencyInstaller, InstallOutcome, InstallReport, install_dependencies};
