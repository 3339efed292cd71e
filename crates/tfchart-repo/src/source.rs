//! Where a chart comes from

use std::fmt;
use std::path::{Path, PathBuf};

use crate::archive::{extract_archive_blocking, is_archive};
use crate::error::{RepoError, Result};
use crate::oci::OciPuller;

/// A chart reference as given on the command line or in a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartSource {
    /// A chart directory on disk
    Local(PathBuf),
    /// A packaged `.tgz` / `.tar.gz` chart
    Archive(PathBuf),
    /// An `oci://` registry reference
    Oci(String),
}

impl ChartSource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("oci://") {
            Self::Oci(source.to_string())
        } else if is_archive(source) {
            Self::Archive(PathBuf::from(source))
        } else {
            Self::Local(PathBuf::from(source))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Oci(_))
    }

    /// Produce a local chart directory, unpacking or pulling under
    /// `dest_root` when needed
    pub async fn resolve(&self, dest_root: &Path) -> Result<PathBuf> {
        self.resolve_with(&OciPuller::from_env(), dest_root).await
    }

    /// Like [`ChartSource::resolve`] with an explicit registry client
    pub async fn resolve_with(&self, puller: &OciPuller, dest_root: &Path) -> Result<PathBuf> {
        match self {
            Self::Local(path) => {
                if path.is_dir() {
                    Ok(path.clone())
                } else {
                    Err(RepoError::SourceNotFound { path: path.clone() })
                }
            }
            Self::Archive(path) => {
                if !path.is_file() {
                    return Err(RepoError::SourceNotFound { path: path.clone() });
                }
                tracing::debug!(archive = %path.display(), dest = %dest_root.display(), "unpacking chart archive");
                extract_archive_blocking(path, dest_root).await
            }
            Self::Oci(reference) => puller.pull(reference, dest_root).await,
        }
    }
}

impl fmt::Display for ChartSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) | Self::Archive(path) => write!(f, "{}", path.display()),
            Self::Oci(reference) => f.write_str(reference),
        }
    }
}
