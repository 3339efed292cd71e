//! Error types for chart acquisition

use std::path::PathBuf;
use thiserror::Error;

/// Chart acquisition errors
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Chart source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Invalid OCI reference: {reference}")]
    InvalidOciReference { reference: String },

    #[error("OCI registry error: {message}")]
    OciError { message: String },

    #[error("Manifest for {reference} has no layers")]
    EmptyManifest { reference: String },

    #[error("Failed to extract {}: {source}", archive.display())]
    Extract {
        archive: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RepoError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RepoError>;
