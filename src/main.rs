//! # depstage CLI Entry Point
//!
//! Parses CLI arguments using clap, sets up logging, and routes commands to
//! the handlers in `depstage::commands`.
//!
//! ## Command Structure
//!
//! - **Install**: `install`, `plan`
//! - **Maintenance**: `clean`, `doctor`
//! - **Shell**: `completion`

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use indicatif::MultiProgress;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use depstage::commands;
use depstage::ui::ProgressLogWriter;

#[derive(Parser)]
#[command(name = "depstage")]
#[command(
    about = "Cross-install native dependencies into build outputs",
    version = env!("CARGO_PKG_VERSION")
)]
#[command(long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Show debug logs (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Debug)]
struct TargetOpts {
    /// Output directory to install into (omit to use every [[output]] in the config)
    output_dir: Option<PathBuf>,
    /// Package to install, e.g. sharp@0.32.0 (repeatable)
    #[arg(short = 'p', long = "package")]
    packages: Vec<String>,
    /// Target CPU architecture (x64, arm64)
    #[arg(long)]
    arch: Option<String>,
    /// Target runtime version, passed as --target
    #[arg(long = "target")]
    node_version: Option<String>,
    /// Target C library (glibc, musl)
    #[arg(long)]
    libc: Option<String>,
    /// Extra flags appended verbatim to the install command
    #[arg(long = "args", allow_hyphen_values = true)]
    additional_args: Option<String>,
    /// Config file [default: depstage.toml]
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Package manager executable [default: npm]
    #[arg(long)]
    package_manager: Option<String>,
    /// Deployment platform passed as --platform [default: linux]
    #[arg(long)]
    platform: Option<String>,
}

impl From<TargetOpts> for commands::TargetArgs {
    fn from(opts: TargetOpts) -> Self {
        Self {
            output_dir: opts.output_dir,
            packages: opts.packages,
            arch: opts.arch,
            node_version: opts.node_version,
            libc: opts.libc,
            additional_args: opts.additional_args,
            config: opts.config,
            package_manager: opts.package_manager,
            platform: opts.platform,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Install native dependencies into one or more outputs
    Install {
        #[command(flatten)]
        targets: TargetOpts,
        /// Number of outputs installed at the same time
        #[arg(long, short, default_value_t = 1)]
        jobs: usize,
        /// Exit with an error if any output fails to install
        #[arg(long)]
        strict: bool,
    },
    /// Show the install commands without running them
    Plan {
        #[command(flatten)]
        targets: TargetOpts,
    },
    /// Remove staging directories left behind by interrupted installs
    Clean {
        /// Also remove staging directories younger than an hour
        #[arg(long)]
        all: bool,
    },
    /// Check the package manager and staging root
    Doctor {
        /// Config file [default: depstage.toml]
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// Generate shell completions
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: bool, progress: &MultiProgress) {
    let default = if verbose { "depstage=debug" } else { "depstage=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(ProgressLogWriter::new(progress.clone()))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let progress = MultiProgress::new();
    init_logging(cli.verbose, &progress);

    let result = match cli.command {
        Commands::Install {
            targets,
            jobs,
            strict,
        } => commands::install::handle_install_command(
            &commands::install::InstallOptions {
                targets: targets.into(),
                jobs,
                strict,
            },
            &progress,
        ),
        Commands::Plan { targets } => commands::plan::handle_plan_command(&targets.into()),
        Commands::Clean { all } => commands::clean::clean(all),
        Commands::Doctor { config } => commands::doctor::run_doctor(config.as_deref()),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}
