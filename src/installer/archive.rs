use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};

use super::{CONTENT_DIR, Installer, PACKAGE_FILE, Toolbox};
use crate::archive::ArchiveKind;
use crate::error::PackageError;
use crate::package::{CompressedPackage, PackageKind, TarPackage, ZipPackage};
use crate::runtime::Runtime;
use crate::tool::ToolRunner;

/// Download `url` into `cwd` and unpack it.
///
/// Returns the directory holding the unpacked tree for tar and zip, or the
/// decompressed file for gzip.
async fn fetch_and_extract<R: Runtime, T: ToolRunner>(
    toolbox: &Toolbox<'_, R, T>,
    cwd: &Path,
    kind: ArchiveKind,
    url: &str,
) -> Result<PathBuf> {
    let archive = cwd.join(kind.download_name());
    toolbox.download(url, &archive).await?;

    let dest = match kind {
        ArchiveKind::Tar | ArchiveKind::Zip => cwd.join(CONTENT_DIR),
        ArchiveKind::Gzip => cwd.join(PACKAGE_FILE),
    };
    toolbox.extractor().extract(kind, &archive, &dest).await?;
    debug!("Unpacked {:?} into {:?}", archive, dest);
    Ok(dest)
}

fn expect_kind(kind: PackageKind, expected: ArchiveKind, url: &str) -> Result<(), PackageError> {
    match ArchiveKind::from_url(url) {
        Some(found) if found == expected => Ok(()),
        _ => Err(PackageError::InvalidUrl {
            kind,
            url: url.to_string(),
        }),
    }
}

#[async_trait]
impl Installer for CompressedPackage {
    #[tracing::instrument(skip(self, toolbox), fields(package = %self.name))]
    async fn install<R: Runtime, T: ToolRunner>(
        &self,
        toolbox: &Toolbox<'_, R, T>,
        cwd: &Path,
    ) -> Result<PathBuf> {
        let kind = ArchiveKind::from_url(&self.url)
            .ok_or_else(|| PackageError::UnknownArchiveType(self.url.clone()))?;

        if kind == ArchiveKind::Gzip {
            return fetch_and_extract(toolbox, cwd, kind, &self.url).await;
        }

        let bin_path = self.bin_path.as_deref().ok_or_else(|| {
            PackageError::Validation(format!("binPath is required for {} archives", kind))
        })?;
        let content = fetch_and_extract(toolbox, cwd, kind, &self.url).await?;
        Ok(content.join(bin_path))
    }
}

#[async_trait]
impl Installer for TarPackage {
    #[tracing::instrument(skip(self, toolbox), fields(package = %self.name))]
    async fn install<R: Runtime, T: ToolRunner>(
        &self,
        toolbox: &Toolbox<'_, R, T>,
        cwd: &Path,
    ) -> Result<PathBuf> {
        expect_kind(PackageKind::Tar, ArchiveKind::Tar, &self.url)?;
        let content = fetch_and_extract(toolbox, cwd, ArchiveKind::Tar, &self.url).await?;
        Ok(content.join(&self.bin_path))
    }
}

#[async_trait]
impl Installer for ZipPackage {
    #[tracing::instrument(skip(self, toolbox), fields(package = %self.name))]
    async fn install<R: Runtime, T: ToolRunner>(
        &self,
        toolbox: &Toolbox<'_, R, T>,
        cwd: &Path,
    ) -> Result<PathBuf> {
        expect_kind(PackageKind::Zip, ArchiveKind::Zip, &self.url)?;
        let content = fetch_and_extract(toolbox, cwd, ArchiveKind::Zip, &self.url).await?;
        Ok(content.join(&self.bin_path))
    }
}
