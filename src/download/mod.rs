use crate::http::HttpClient;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

/// Downloads `url` into a fresh file at `dest`, creating parent directories.
///
/// On failure the destination must be treated as invalid; it may be missing
/// or truncated.
#[tracing::instrument(skip(runtime, dest, http_client))]
pub async fn download_file<R: Runtime>(
    runtime: &R,
    url: &str,
    dest: &Path,
    http_client: &HttpClient,
) -> Result<()> {
    info!("Downloading file from {}...", url);

    if let Some(parent) = dest.parent() {
        runtime.create_dir_all(parent)?;
    }

    let bytes = http_client
        .download_file(url, || {
            runtime
                .create_file(dest)
                .with_context(|| format!("Failed to create file at {:?}", dest))
        })
        .await?;

    info!("Download complete ({} bytes).", bytes);
    Ok(())
}
