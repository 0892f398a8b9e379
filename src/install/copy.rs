//! Merging the staged dependency tree into the output directory.

use crate::error::InstallError;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively copy `src` into `dst`, returning the number of files copied.
///
/// Symlinks are followed, so link targets land in `dst` as real files and
/// directories. Existing files are unlinked before the copy, so symlinks,
/// hard links and read-only files at a destination path are replaced rather
/// than written through. Anything in `dst` that has no counterpart in `src`
/// is left alone.
pub fn merge_tree(src: &Path, dst: &Path) -> Result<usize, InstallError> {
    if !src.is_dir() {
        return Err(InstallError::MissingArtifacts {
            path: src.to_path_buf(),
        });
    }

    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = if relative.as_os_str().is_empty() {
            dst.to_path_buf()
        } else {
            dst.join(relative)
        };

        let io_err = |source: io::Error| InstallError::Copy {
            from: entry.path().to_path_buf(),
            to: target.clone(),
            source,
        };

        clear_destination(&target).map_err(io_err)?;
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_err)?;
        } else {
            fs::copy(entry.path(), &target).map_err(io_err)?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Unlink whatever non-directory sits at `path`. Real directories are kept
/// so their contents can be merged into.
fn clear_destination(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::remove_file(path).or_else(|_| fs::remove_dir(path))
        }
        Ok(meta) if !meta.is_dir() => fs::remove_file(path),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write(path: PathBuf, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_merge_copies_every_file() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(src.path().join("sharp/package.json"), "{}");
        write(src.path().join("sharp/build/Release/sharp.node"), "bin");
        write(src.path().join("@img/sharp-linux-arm64/lib/libvips.so"), "so");

        let out = dst.path().join("node_modules");
        let copied = merge_tree(src.path(), &out).unwrap();

        assert_eq!(copied, 3);
        assert!(out.join("sharp/package.json").is_file());
        assert!(out.join("sharp/build/Release/sharp.node").is_file());
        assert!(out.join("@img/sharp-linux-arm64/lib/libvips.so").is_file());
    }

    #[test]
    fn test_merge_overwrites_and_keeps_unrelated_files() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(src.path().join("sharp/index.js"), "new");
        write(dst.path().join("sharp/index.js"), "old");
        write(dst.path().join("next/dist/server.js"), "traced");

        merge_tree(src.path(), dst.path()).unwrap();

        assert_eq!(
            fs::read_to_string(dst.path().join("sharp/index.js")).unwrap(),
            "new"
        );
        assert_eq!(
            fs::read_to_string(dst.path().join("next/dist/server.js")).unwrap(),
            "traced"
        );
    }

    #[test]
    fn test_merge_missing_source() {
        let dst = tempfile::tempdir().unwrap();
        let err = merge_tree(&dst.path().join("nope"), dst.path()).unwrap_err();
        assert!(matches!(err, InstallError::MissingArtifacts { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_merge_dereferences_symlinks() {
        use std::os::unix::fs::symlink;

        let store = tempfile::tempdir().unwrap();
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(store.path().join("sharp@0.32.0/package.json"), "{\"name\":\"sharp\"}");
        write(store.path().join("bin.js"), "#!/usr/bin/env node");
        symlink(store.path().join("sharp@0.32.0"), src.path().join("sharp")).unwrap();
        fs::create_dir_all(src.path().join(".bin")).unwrap();
        symlink(store.path().join("bin.js"), src.path().join(".bin/sharp")).unwrap();

        merge_tree(src.path(), dst.path()).unwrap();

        let copied_dir = dst.path().join("sharp");
        assert!(!fs::symlink_metadata(&copied_dir).unwrap().file_type().is_symlink());
        assert!(copied_dir.join("package.json").is_file());
        let copied_bin = dst.path().join(".bin/sharp");
        assert!(!fs::symlink_metadata(&copied_bin).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_to_string(copied_bin).unwrap(),
            "#!/usr/bin/env node"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_merge_replaces_destination_symlink() {
        use std::os::unix::fs::symlink;

        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        write(src.path().join("index.js"), "new");
        write(outside.path().join("victim.js"), "untouched");
        symlink(outside.path().join("victim.js"), dst.path().join("index.js")).unwrap();

        merge_tree(src.path(), dst.path()).unwrap();

        assert_eq!(
            fs::read_to_string(outside.path().join("victim.js")).unwrap(),
            "untouched"
        );
        assert_eq!(
            fs::read_to_string(dst.path().join("index.js")).unwrap(),
            "new"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_merge_does_not_write_through_hard_link() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        write(src.path().join("index.js"), "new");
        write(store.path().join("index.js"), "store-original");
        fs::hard_link(store.path().join("index.js"), dst.path().join("index.js")).unwrap();

        merge_tree(src.path(), dst.path()).unwrap();

        assert_eq!(
            fs::read_to_string(store.path().join("index.js")).unwrap(),
            "store-original"
        );
        assert_eq!(
            fs::read_to_string(dst.path().join("index.js")).unwrap(),
            "new"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_merge_replaces_read_only_file() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(src.path().join("sharp/index.js"), "new");
        let existing = dst.path().join("sharp/index.js");
        write(existing.clone(), "old");
        let mut perms = fs::metadata(&existing).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&existing, perms).unwrap();

        merge_tree(src.path(), dst.path()).unwrap();

        assert_eq!(fs::read_to_string(&existing).unwrap(), "new");
    }
}
