//! Output directory synchronization
//!
//! The three primitives the renderer needs. All of them are idempotent:
//! creating an existing directory, removing a missing file and overwriting
//! an existing file all succeed.

use std::io::Write;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Create a directory and all of its parents
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| CoreError::io(path, e))
}

/// Replace the file at `path` with `contents`
///
/// The bytes land in a temporary file next to the target which is then
/// renamed over it, so readers only ever see the old or the new content.
pub fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".tfchart-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| CoreError::io(dir, e))?;

    tmp.write_all(contents).map_err(|e| CoreError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| CoreError::io(tmp.path(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(|e| CoreError::io(tmp.path(), e))?;
    }

    tmp.persist(path).map_err(|e| CoreError::io(path, e.error))?;
    Ok(())
}

/// Remove a file if it exists
///
/// Returns whether a file was actually removed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CoreError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_ensure_dir_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");

        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();

        assert!(nested.is_dir());
    }

    #[test]
    fn test_write_file_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.tf");

        write_file(&path, b"first version, quite long").unwrap();
        write_file(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_write_file_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("main.tf"), b"x").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["main.tf".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.tf");
        write_file(&path, b"x").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_write_file_missing_parent_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_file(&dir.path().join("missing/main.tf"), b"x").unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }

    #[test]
    fn test_remove_if_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.tf");
        fs::write(&path, "old").unwrap();

        assert!(remove_if_exists(&path).unwrap());
        assert!(!path.exists());
        assert!(!remove_if_exists(&path).unwrap());
    }
}
