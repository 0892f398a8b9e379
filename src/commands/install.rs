//! Install command handler
//!
//! Handles `depstage install`: runs one staged install per output, optionally
//! several at once, and prints a summary.

use anyhow::{Context, Result, bail};
use colored::*;
use indicatif::MultiProgress;
use rayon::prelude::*;

use super::TargetArgs;
use crate::config::OutputConfig;
use crate::install::{DependencyInstaller, InstallOutcome, PackageManager, output_label};
use crate::ui;

#[derive(Clone, Debug)]
pub struct InstallOptions {
    pub targets: TargetArgs,
    /// Outputs installed at the same time.
    pub jobs: usize,
    /// Exit with an error when any output fails.
    pub strict: bool,
}

pub fn handle_install_command(options: &InstallOptions, progress: &MultiProgress) -> Result<()> {
    let (settings, outputs) = options.targets.resolve()?;

    if outputs.is_empty() {
        println!("{} No outputs configured.", "!".yellow());
        return Ok(());
    }

    println!(
        "{} Installing native dependencies for {} output(s) ({} --platform={})...",
        "📦".blue(),
        outputs.len(),
        settings.package_manager.cyan(),
        settings.platform.cyan()
    );

    let installer = DependencyInstaller::from_settings(&settings);
    let outcomes = install_all(&installer, &outputs, options.jobs, progress)?;

    let failed = print_summary(&outputs, &outcomes);
    if failed > 0 && options.strict {
        bail!("{failed} output(s) failed to install");
    }
    Ok(())
}

/// Install every output, at most `jobs` at a time. Outcomes keep the order of `outputs`.
pub fn install_all<P: PackageManager>(
    installer: &DependencyInstaller<P>,
    outputs: &[OutputConfig],
    jobs: usize,
    progress: &MultiProgress,
) -> Result<Vec<InstallOutcome>> {
    let run = |output: &OutputConfig| -> InstallOutcome {
        let label = output_label(&output.dir);
        if output.install.is_none() {
            return installer.install(&output.dir, None);
        }

        let pb = ui::spinner(progress, format!("Installing {label}..."));
        let outcome = installer.install(&output.dir, output.install.as_ref());
        match &outcome {
            InstallOutcome::Installed(report) => pb.finish_with_message(format!(
                "{} Installed {} ({} files)",
                "✓".green(),
                label,
                report.files_copied
            )),
            _ => pb.finish_with_message(format!("{} Failed {}", "x".red(), label)),
        }
        outcome
    };

    if jobs <= 1 || outputs.len() <= 1 {
        return Ok(outputs.iter().map(run).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("Failed to start install worker pool")?;
    Ok(pool.install(|| outputs.par_iter().map(run).collect()))
}

/// Print per-output results and return the number of failures.
fn print_summary(outputs: &[OutputConfig], outcomes: &[InstallOutcome]) -> usize {
    let mut installed = 0;
    let mut skipped = 0;
    let mut failed = 0;

    println!();
    for (output, outcome) in outputs.iter().zip(outcomes) {
        let label = output_label(&output.dir);
        match outcome {
            InstallOutcome::Installed(report) => {
                installed += 1;
                println!(
                    "   {} {} → {}",
                    "✓".green(),
                    label.bold(),
                    report.destination.display()
                );
            }
            InstallOutcome::Skipped => {
                skipped += 1;
                println!("   {} {} (nothing to install)", "-".dimmed(), label);
            }
            InstallOutcome::Failed(err) => {
                failed += 1;
                println!("   {} {}: {}", "x".red(), label.bold(), err);
                if let Some(stderr) = err.captured_stderr().filter(|s| !s.trim().is_empty()) {
                    for line in stderr.lines().take(10) {
                        println!("     {}", line.dimmed());
                    }
                }
            }
        }
    }

    println!();
    if failed == 0 {
        println!(
            "{} Done: {} installed, {} skipped.",
            "✓".green(),
            installed,
            skipped
        );
    } else {
        println!(
            "{} Done: {} installed, {} skipped, {} failed.",
            "!".yellow(),
            installed,
            skipped,
            failed.to_string().red()
        );
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstallConfig;
    use crate::install::{InstallCommand, InstallEnv, RunOutput};
    use indicatif::ProgressDrawTarget;
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    /// Writes `node_modules/<first package>/package.json` and succeeds,
    /// unless the package is called `broken`.
    struct StubNpm;

    impl PackageManager for StubNpm {
        fn run(
            &self,
            command: &InstallCommand,
            working_dir: &Path,
            _env: &InstallEnv,
        ) -> io::Result<RunOutput> {
            let pkg = command.args().last().cloned().unwrap_or_default();
            if pkg == "broken" {
                return Ok(RunOutput {
                    code: Some(1),
                    stdout: "npm ERR! broken".to_string(),
                    stderr: String::new(),
                });
            }
            let dir = working_dir.join("node_modules").join(&pkg);
            fs::create_dir_all(&dir)?;
            fs::write(dir.join("package.json"), "{}")?;
            Ok(RunOutput {
                code: Some(0),
                ..RunOutput::default()
            })
        }
    }

    fn output(dir: PathBuf, pkg: Option<&str>) -> OutputConfig {
        OutputConfig {
            dir,
            install: pkg.map(|p| InstallConfig::new([p])),
        }
    }

    #[test]
    fn test_install_all_parallel_keeps_order() {
        let temp = tempfile::tempdir().unwrap();
        let build = tempfile::tempdir().unwrap();
        let installer =
            DependencyInstaller::with_package_manager(StubNpm).with_temp_root(temp.path());
        let outputs = vec![
            output(build.path().join("fn-a"), Some("sharp")),
            output(build.path().join("fn-b"), None),
            output(build.path().join("fn-c"), Some("broken")),
            output(build.path().join("fn-d"), Some("canvas")),
        ];
        let progress = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());

        let outcomes = install_all(&installer, &outputs, 4, &progress).unwrap();

        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[0].report().unwrap().label, "fn-a");
        assert!(matches!(outcomes[1], InstallOutcome::Skipped));
        assert!(outcomes[2].is_failed());
        assert_eq!(outcomes[3].report().unwrap().label, "fn-d");

        assert!(build.path().join("fn-a/node_modules/sharp/package.json").is_file());
        assert!(!build.path().join("fn-b").exists());
        assert!(!build.path().join("fn-c/node_modules").exists());
        assert!(build.path().join("fn-d/node_modules/canvas/package.json").is_file());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);

        assert_eq!(print_summary(&outputs, &outcomes), 1);
    }

    #[test]
    fn test_install_all_sequential() {
        let temp = tempfile::tempdir().unwrap();
        let build = tempfile::tempdir().unwrap();
        let installer =
            DependencyInstaller::with_package_manager(StubNpm).with_temp_root(temp.path());
        let outputs = vec![output(build.path().join("only"), Some("sharp"))];
        let progress = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());

        let outcomes = install_all(&installer, &outputs, 1, &progress).unwrap();
        assert!(outcomes[0].report().is_some());
    }
}
