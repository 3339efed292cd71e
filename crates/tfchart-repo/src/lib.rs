//! tfchart Chart Acquisition
//!
//! Turns a chart reference into a local chart directory:
//!
//! - **Local directories**: used in place
//! - **Archives**: `.tgz` / `.tar.gz` packages are unpacked into a cache dir
//! - **OCI registries**: `oci://registry/repo/name:tag` artifacts are pulled
//!   and unpacked, with optional basic auth from the environment
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tfchart_repo::ChartSource;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = ChartSource::parse("oci://ghcr.io/acme/charts/aws-vpc:1.0.0");
//! let chart_dir = source.resolve(Path::new(".tfchart/charts")).await?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod error;
pub mod oci;
pub mod source;

pub use archive::{extract_archive, extract_archive_blocking, is_archive};
pub use error::{RepoError, Result};
pub use oci::{OciPuller, parse_reference};
pub use source::ChartSource;
