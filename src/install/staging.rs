//! Scoped staging directories.
//!
//! Each install runs the package manager inside its own freshly created
//! directory under the temp root, never inside the output directory. The
//! directory is removed when the [`StagingDir`] is dropped, on every exit
//! path including unwinding.

use crate::error::InstallError;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Name prefix shared by every staging directory; `depstage clean` looks for it.
pub const STAGING_PREFIX: &str = "depstage-install-";

/// Subtree produced by the package manager and merged into the output.
pub const DEPENDENCY_DIR: &str = "node_modules";

/// Human-readable label for an output directory: its last path segment.
pub fn output_label(output_dir: &Path) -> String {
    output_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "output".to_string())
}

/// Absolute temp root, so a relative `TMPDIR` never places staging under the cwd.
pub fn temp_root() -> PathBuf {
    let t = env::temp_dir();
    if t.is_absolute() {
        t
    } else {
        #[cfg(windows)]
        {
            env::var("TEMP")
                .or_else(|_| env::var("TMP"))
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("C:\\Windows\\Temp"))
        }
        #[cfg(not(windows))]
        {
            PathBuf::from("/tmp")
        }
    }
}

#[derive(Debug)]
pub struct StagingDir {
    dir: TempDir,
}

impl StagingDir {
    /// Create a uniquely named directory `depstage-install-<label>XXXXXX` under `root`.
    pub fn create(root: &Path, label: &str) -> Result<Self, InstallError> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("{STAGING_PREFIX}{label}"))
            .tempdir_in(root)
            .map_err(|source| InstallError::Staging {
                root: root.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %dir.path().display(), "created staging directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the package manager leaves installed packages.
    pub fn dependency_dir(&self) -> PathBuf {
        self.dir.path().join(DEPENDENCY_DIR)
    }

    /// Remove the directory now. Never fails; a directory that is already
    /// partly or fully gone is fine.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close()
            && e.kind() != io::ErrorKind::NotFound
        {
            tracing::debug!(path = %path.display(), "staging cleanup failed: {e}");
        }
    }
}

/// Best-effort recursive delete of a staging path that may not exist.
pub fn remove_staging(path: &Path) -> bool {
    match std::fs::remove_dir_all(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::debug!(path = %path.display(), "staging cleanup failed: {e}");
            false
        }
    }
}

/// Staging directories under `root` last modified at least `min_age` ago.
///
/// These are left behind only when a process is killed mid-install.
pub fn stale_staging_dirs(root: &Path, min_age: Duration) -> io::Result<Vec<PathBuf>> {
    let now = SystemTime::now();
    let mut stale = Vec::new();

    for entry in std::fs::read_dir(root)?.flatten() {
        if !entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !meta.is_dir() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age >= min_age {
            stale.push(entry.path());
        }
    }

    stale.sort();
    Ok(stale)
}
