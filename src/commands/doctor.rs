//! Doctor command handler
//!
//! Handles `depstage doctor`: checks what an install needs on this machine.

use anyhow::Result;
use colored::*;
use std::path::Path;

use crate::config::{self, CONFIG_FILE, Settings};
use crate::install::{StagingDir, runner, temp_root};

/// Run the `depstage doctor` command to diagnose system issues
pub fn run_doctor(config_path: Option<&Path>) -> Result<()> {
    println!("{} Running System Doctor...", "🚑".red());
    println!("-------------------------------");

    print!("Checking host... ");
    println!(
        "{} ({})",
        std::env::consts::OS.green(),
        std::env::consts::ARCH.cyan()
    );

    let settings = load_settings(config_path);
    println!(
        "Install target... --platform={}",
        settings.platform.as_str().cyan()
    );
    if settings.platform != std::env::consts::OS {
        println!(
            "   {} Host differs from target; packages are cross-installed.",
            "ℹ".blue()
        );
    }

    print!("Checking {}... ", settings.package_manager);
    match runner::probe_version(&settings.package_manager) {
        Some(version) => println!("{} ({})", "Found".green(), version),
        None => println!(
            "{}",
            format!("Not Found (install {} or fix PATH)", settings.package_manager).red()
        ),
    }

    let root = temp_root();
    print!("Checking staging root {}... ", root.display());
    match StagingDir::create(&root, "doctor") {
        Ok(staging) => {
            staging.close();
            println!("{}", "Writable".green());
        }
        Err(e) => println!("{}", format!("Not writable ({e})").red()),
    }

    Ok(())
}

fn load_settings(config_path: Option<&Path>) -> Settings {
    let path = config_path.unwrap_or(Path::new(CONFIG_FILE));
    if config_path.is_none() && !path.exists() {
        return Settings::default();
    }
    match config::load_config(path) {
        Ok(config) => {
            println!("Config... {} {}", "✓".green(), path.display());
            config.settings
        }
        Err(e) => {
            println!("Config... {} {:#}", "x".red(), e);
            Settings::default()
        }
    }
}
