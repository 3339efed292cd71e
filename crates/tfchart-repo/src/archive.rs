//! Chart archive (`.tgz`) extraction

use flate2::read::GzDecoder;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use tar::Archive;

use crate::error::{RepoError, Result};

/// Whether a path looks like a packaged chart
pub fn is_archive(path: &str) -> bool {
    path.ends_with(".tgz") || path.ends_with(".tar.gz")
}

/// Unpack a gzipped tarball into `dest` and return the chart directory
///
/// The chart directory is the archive's single top-level directory, or
/// `dest` itself when the archive carries files at its root.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<PathBuf> {
    let file = File::open(archive_path).map_err(|e| RepoError::io(archive_path, e))?;
    std::fs::create_dir_all(dest).map_err(|e| RepoError::io(dest, e))?;

    let extract_err = |source| RepoError::Extract {
        archive: archive_path.to_path_buf(),
        source,
    };

    let mut archive = Archive::new(GzDecoder::new(file));
    let mut top_level = BTreeSet::new();

    for entry in archive.entries().map_err(extract_err)? {
        let mut entry = entry.map_err(extract_err)?;
        let entry_type = entry.header().entry_type();
        if entry_type.is_pax_global_extensions() || entry_type.is_pax_local_extensions() {
            continue;
        }

        let path = entry.path().map_err(extract_err)?.into_owned();
        if let Some(first) = first_component(&path) {
            top_level.insert(first);
        }

        // unpack_in refuses entries escaping `dest`
        entry.unpack_in(dest).map_err(extract_err)?;
    }

    Ok(chart_root(dest, &top_level))
}

/// [`extract_archive`] on the blocking thread pool
pub async fn extract_archive_blocking(archive_path: &Path, dest: &Path) -> Result<PathBuf> {
    let (archive, target) = (archive_path.to_path_buf(), dest.to_path_buf());
    tokio::task::spawn_blocking(move || extract_archive(&archive, &target))
        .await
        .map_err(|e| RepoError::io(archive_path, std::io::Error::other(e)))?
}

fn first_component(path: &Path) -> Option<String> {
    path.components().find_map(|c| match c {
        Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
        _ => None,
    })
}

fn chart_root(dest: &Path, top_level: &BTreeSet<String>) -> PathBuf {
    match top_level.iter().next() {
        Some(only) if top_level.len() == 1 && dest.join(only).is_dir() => dest.join(only),
        _ => dest.to_path_buf(),
    }
}
