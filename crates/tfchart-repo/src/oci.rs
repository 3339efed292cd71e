//! OCI registry client
//!
//! Pulls charts pushed as OCI artifacts: every layer is a gzipped chart
//! tarball, and the manifest's `org.opencontainers.image.title` annotation
//! names the chart.

use oci_distribution::Reference;
use oci_distribution::client::{Client, ClientConfig, ClientProtocol};
use oci_distribution::secrets::RegistryAuth;
use std::path::{Path, PathBuf};

use crate::archive::extract_archive_blocking;
use crate::error::{RepoError, Result};

/// Manifest annotation carrying the chart name
pub const TITLE_ANNOTATION: &str = "org.opencontainers.image.title";

/// Environment variables holding registry credentials
pub const USERNAME_ENV: &str = "TFCHART_REGISTRY_USERNAME";
pub const PASSWORD_ENV: &str = "TFCHART_REGISTRY_PASSWORD";

/// Parse an OCI reference string
///
/// Format: `oci://registry/repo/name:tag` or `registry/repo/name:tag`
pub fn parse_reference(reference: &str) -> Result<Reference> {
    let clean = reference
        .trim_start_matches("oci://")
        .trim_start_matches("https://")
        .trim_start_matches("http://");

    clean
        .parse::<Reference>()
        .map_err(|e| RepoError::InvalidOciReference {
            reference: format!("{}: {}", reference, e),
        })
}

/// Basic auth when both credentials are set, anonymous otherwise
pub fn auth_from(username: Option<String>, password: Option<String>) -> RegistryAuth {
    match (username, password) {
        (Some(user), Some(pass)) if !user.is_empty() => RegistryAuth::Basic(user, pass),
        _ => RegistryAuth::Anonymous,
    }
}

/// Chart name from the manifest annotation, else the repository basename
pub fn chart_name<'a, I>(annotations: I, reference: &Reference) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    annotations
        .into_iter()
        .find(|(key, value)| key.as_str() == TITLE_ANNOTATION && !value.is_empty())
        .map(|(_, value)| value.clone())
        .unwrap_or_else(|| {
            reference
                .repository()
                .rsplit('/')
                .next()
                .unwrap_or_else(|| reference.repository())
                .to_string()
        })
}

/// OCI registry client
pub struct OciPuller {
    client: Client,
    auth: RegistryAuth,
}

impl OciPuller {
    pub fn new(auth: RegistryAuth) -> Self {
        let config = ClientConfig {
            protocol: ClientProtocol::Https,
            ..Default::default()
        };
        Self {
            client: Client::new(config),
            auth,
        }
    }

    /// Build a client using credentials from the environment
    pub fn from_env() -> Self {
        Self::new(auth_from(
            std::env::var(USERNAME_ENV).ok(),
            std::env::var(PASSWORD_ENV).ok(),
        ))
    }

    /// Pull a chart and unpack it under `dest_root`
    ///
    /// Each layer is written to `<dest_root>/<name>.tgz`, unpacked in place
    /// and deleted. Returns `<dest_root>/<name>`.
    pub async fn pull(&self, reference: &str, dest_root: &Path) -> Result<PathBuf> {
        let parsed = parse_reference(reference)?;
        tracing::info!(registry = %reference, "pulling chart");

        let (manifest, digest) = self
            .client
            .pull_image_manifest(&parsed, &self.auth)
            .await
            .map_err(|e| RepoError::OciError {
                message: format!("failed to fetch manifest for {}: {}", reference, e),
            })?;
        tracing::debug!(%digest, layers = manifest.layers.len(), "fetched manifest");

        if manifest.layers.is_empty() {
            return Err(RepoError::EmptyManifest {
                reference: reference.to_string(),
            });
        }

        let name = chart_name(manifest.annotations.iter().flatten(), &parsed);
        tokio::fs::create_dir_all(dest_root)
            .await
            .map_err(|e| RepoError::io(dest_root, e))?;

        let archive_path = dest_root.join(format!("{}.tgz", name));
        for layer in &manifest.layers {
            tracing::info!(name = %name, digest = %layer.digest, "downloading chart layer");

            let mut blob = Vec::with_capacity(usize::try_from(layer.size).unwrap_or_default());
            self.client
                .pull_blob(&parsed, layer, &mut blob)
                .await
                .map_err(|e| RepoError::OciError {
                    message: format!("failed to download layer {}: {}", layer.digest, e),
                })?;

            unpack_layer(&blob, &archive_path, dest_root).await?;
        }

        let chart_dir = dest_root.join(&name);
        tracing::info!(path = %chart_dir.display(), "chart pulled");
        Ok(chart_dir)
    }
}

/// Write a downloaded layer to `archive_path` and unpack it into `dest_root`
///
/// The archive is deleted afterwards whether or not unpacking succeeded.
async fn unpack_layer(blob: &[u8], archive_path: &Path, dest_root: &Path) -> Result<()> {
    let result = match tokio::fs::write(archive_path, blob).await {
        Ok(()) => extract_archive_blocking(archive_path, dest_root).await.map(|_| ()),
        Err(e) => Err(RepoError::io(archive_path, e)),
    };

    match tokio::fs::remove_file(archive_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(file = %archive_path.display(), error = %e, "failed to remove downloaded archive");
        }
    }

    result
}
