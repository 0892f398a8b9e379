//! Staging cleanup.
//!
//! `depstage clean` removes staging directories that a killed install left
//! in the temp root. A normal run never leaves any behind.

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;
use std::time::Duration;

use crate::install::{remove_staging, stale_staging_dirs, temp_root};

/// Staging directories younger than this may belong to an install still running.
pub const DEFAULT_MIN_AGE: Duration = Duration::from_secs(60 * 60);

pub fn clean(all: bool) -> Result<()> {
    let min_age = if all { Duration::ZERO } else { DEFAULT_MIN_AGE };
    clean_in(&temp_root(), min_age).map(|_| ())
}

/// Remove stale staging directories under `root`; returns how many were removed.
pub fn clean_in(root: &Path, min_age: Duration) -> Result<usize> {
    let stale = stale_staging_dirs(root, min_age)
        .with_context(|| format!("Failed to read temp directory {}", root.display()))?;

    if stale.is_empty() {
        println!("{} No leftover staging directories.", "✓".green());
        return Ok(0);
    }

    println!("{} Removing leftover staging directories...", "🧹".yellow());
    let mut removed = 0;
    for path in &stale {
        if remove_staging(path) {
            println!("   {} {}", "🗑️".red(), path.display());
            removed += 1;
        } else {
            println!("   {} Could not remove {}", "!".yellow(), path.display());
        }
    }
    println!("{} Removed {} staging directories.", "✓".green(), removed);
    Ok(removed)
}
