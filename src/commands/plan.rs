//! Plan command handler
//!
//! Handles `depstage plan`: shows what `install` would run, without creating
//! staging directories or spawning anything.

use anyhow::Result;
use colored::*;

use super::TargetArgs;
use crate::config::{OutputConfig, Settings};
use crate::install::{DEPENDENCY_DIR, InstallCommand, output_label};
use crate::ui::Table;

/// One row of the plan: the output label, destination, and command line
/// (`None` when the output has nothing to install).
pub fn plan_rows(settings: &Settings, outputs: &[OutputConfig]) -> Vec<[String; 3]> {
    outputs
        .iter()
        .map(|output| {
            let command = output.install.as_ref().map(|install| {
                InstallCommand::new(&settings.package_manager, &settings.platform, install)
                    .command_line()
            });
            [
                output_label(&output.dir),
                output.dir.join(DEPENDENCY_DIR).display().to_string(),
                command.unwrap_or_else(|| "(skipped: no packages)".to_string()),
            ]
        })
        .collect()
}

pub fn handle_plan_command(targets: &TargetArgs) -> Result<()> {
    let (settings, outputs) = targets.resolve()?;

    if outputs.is_empty() {
        println!("{} No outputs configured.", "!".yellow());
        return Ok(());
    }

    println!("{} {}", "🗺".cyan(), "Install Plan".bold());
    println!("{}", "─".repeat(50).dimmed());

    let mut table = Table::new(&["Output", "Destination", "Command"]);
    for row in plan_rows(&settings, &outputs) {
        table.add_row(row.to_vec());
    }
    table.print();

    println!();
    println!(
        "Run {} to execute. Commands run in an isolated staging directory with {}.",
        "depstage install".cyan(),
        "SHARP_IGNORE_GLOBAL_LIBVIPS=1".dimmed()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstallConfig;
    use std::path::PathBuf;

    #[test]
    fn test_plan_rows() {
        let outputs = vec![
            OutputConfig {
                dir: PathBuf::from("/build/out/server-fn"),
                install: Some(
                    InstallConfig::new(["sharp@0.32.0"])
                        .with_arch("arm64")
                        .with_libc("glibc"),
                ),
            },
            OutputConfig {
                dir: PathBuf::from("/build/out/edge"),
                install: None,
            },
        ];
        let rows = plan_rows(&Settings::default(), &outputs);

        assert_eq!(rows[0][0], "server-fn");
        assert_eq!(
            PathBuf::from(&rows[0][1]),
            PathBuf::from("/build/out/server-fn/node_modules")
        );
        assert_eq!(
            rows[0][2],
            "npm install --platform=linux --arch=arm64 --libc=glibc sharp@0.32.0"
        );
        assert!(rows[1][2].contains("skipped"));
    }
}
