//! Error type for dependency installation.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between creating the staging directory and
/// merging the installed dependencies into the output directory.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The staging directory could not be created under the temp root.
    #[error("failed to create staging directory under {}: {source}", root.display())]
    Staging {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The package manager process could not be started at all.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The package manager ran and exited unsuccessfully.
    #[error("`{command}` exited with {}", exit_label(*code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The install succeeded but left no dependency subtree to copy.
    #[error("package manager produced no dependency tree at {}", path.display())]
    MissingArtifacts { path: PathBuf },

    #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk staged dependency tree: {0}")]
    Walk(#[from] walkdir::Error),
}

impl InstallError {
    /// Captured standard output of the package manager, when the failure
    /// happened after it ran.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            InstallError::CommandFailed { stdout, .. } => Some(stdout),
            _ => None,
        }
    }

    /// Captured standard error of the package manager, when available.
    pub fn captured_stderr(&self) -> Option<&str> {
        match self {
            InstallError::CommandFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}
