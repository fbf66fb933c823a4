//! HTTP client used for package downloads.

use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use std::io::Write;

use crate::error::PackageError;

/// Thin wrapper over a reqwest `Client`.
///
/// Downloads are single-shot: no retry and no resume.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client with the crate's user agent.
    pub fn build() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("sepia/", env!("SEPIA_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(client))
    }

    /// Downloads `url` into the writer produced by `create_writer`.
    ///
    /// The writer is only created once the server answered with a success
    /// status; a non-success status yields [`PackageError::Download`].
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: FnOnce() -> Result<W>,
    {
        debug!("Downloading file from {}...", url);

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to start download request for {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PackageError::Download {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let mut writer = create_writer()?;
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read chunk from download stream")?
        {
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer.flush().context("Failed to flush downloaded file")?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }
}
