//! Archive extraction.
//!
//! The top-level format (tar, zip, gzip) is picked from the file name or URL
//! suffix. Within a tarball the compression is sniffed from magic bytes.
//! Extraction itself runs either through external tools or in-process,
//! depending on [`ExtractorBackend`].

mod builtin;
mod external;

use anyhow::{Context, Result};
use log::debug;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::error::PackageError;
use crate::runtime::Runtime;
use crate::tool::ToolRunner;

/// Top-level archive format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    Tar,
    Zip,
    /// A single gzip-compressed file (not a tarball)
    Gzip,
}

const TAR_SUFFIXES: &[&str] = &[".tar", ".tar.gz", ".tar.bz2", ".tar.xz", ".tgz"];

impl ArchiveKind {
    /// Detect the format from a file name suffix (case-insensitive).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if TAR_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            Some(ArchiveKind::Tar)
        } else if name.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else if name.ends_with(".gz") {
            Some(ArchiveKind::Gzip)
        } else {
            None
        }
    }

    /// Detect the format from a URL, ignoring any query string or fragment.
    pub fn from_url(url: &str) -> Option<Self> {
        match Url::parse(url) {
            Ok(parsed) => Self::from_file_name(parsed.path()),
            Err(_) => Self::from_file_name(url),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveKind::Tar => "tar",
            ArchiveKind::Zip => "zip",
            ArchiveKind::Gzip => "gz",
        }
    }

    /// File name used for the downloaded archive inside a package directory.
    ///
    /// Every tarball is stored as `package.tar`; its compression is sniffed
    /// from content, not the name.
    pub fn download_name(&self) -> String {
        format!("package.{}", self.as_str())
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compression wrapped around a tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

impl TarCompression {
    const GZIP_MAGIC: &'static [u8] = &[0x1f, 0x8b];
    const BZIP2_MAGIC: &'static [u8] = b"BZh";
    const XZ_MAGIC: &'static [u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];

    pub fn from_magic(header: &[u8]) -> Self {
        if header.starts_with(Self::GZIP_MAGIC) {
            TarCompression::Gzip
        } else if header.starts_with(Self::BZIP2_MAGIC) {
            TarCompression::Bzip2
        } else if header.starts_with(Self::XZ_MAGIC) {
            TarCompression::Xz
        } else {
            TarCompression::None
        }
    }

    /// Read the leading bytes of `path` and classify them.
    pub fn sniff<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let mut header = Vec::with_capacity(Self::XZ_MAGIC.len());
        runtime
            .open(path)?
            .take(Self::XZ_MAGIC.len() as u64)
            .read_to_end(&mut header)
            .with_context(|| format!("Failed to read archive header of {:?}", path))?;
        Ok(Self::from_magic(&header))
    }
}

/// How archives are unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorBackend {
    /// Shell out to tar, unzip and gunzip
    #[default]
    External,
    /// Unpack in-process (tar, tar.gz, zip, gz)
    Builtin,
}

/// Extracts archives with the configured backend.
pub struct Extractor<'a, R, T> {
    backend: ExtractorBackend,
    runtime: Arc<R>,
    tools: &'a T,
}

impl<'a, R: Runtime, T: ToolRunner> Extractor<'a, R, T> {
    pub fn new(backend: ExtractorBackend, runtime: Arc<R>, tools: &'a T) -> Self {
        Self {
            backend,
            runtime,
            tools,
        }
    }

    /// Extract `archive` to `dest`.
    ///
    /// For tar and zip `dest` is a directory that receives the unpacked tree.
    /// For gzip it is the path of the single decompressed file, which is
    /// made executable.
    #[tracing::instrument(skip(self))]
    pub async fn extract(&self, kind: ArchiveKind, archive: &Path, dest: &Path) -> Result<()> {
        debug!(
            "Extracting {} archive {:?} to {:?} ({:?} backend)",
            kind, archive, dest, self.backend
        );
        let runtime = self.runtime.as_ref();

        match kind {
            ArchiveKind::Tar => {
                let compression = TarCompression::sniff(runtime, archive)?;
                debug!("Tarball compression detected as {:?}", compression);
                match self.backend {
                    // tar detects the compression on its own
                    ExtractorBackend::External => {
                        external::untar(runtime, self.tools, archive, dest).await
                    }
                    ExtractorBackend::Builtin => {
                        self.run_builtin(archive, dest, move |rt, archive, dest| {
                            builtin::untar(rt, compression, archive, dest)
                        })
                        .await
                    }
                }
            }
            ArchiveKind::Zip => match self.backend {
                ExtractorBackend::External => {
                    external::unzip(runtime, self.tools, archive, dest).await
                }
                ExtractorBackend::Builtin => {
                    self.run_builtin(archive, dest, builtin::unzip::<R>).await
                }
            },
            ArchiveKind::Gzip => match self.backend {
                ExtractorBackend::External => {
                    external::gunzip(runtime, self.tools, archive, dest).await
                }
                ExtractorBackend::Builtin => {
                    self.run_builtin(archive, dest, builtin::gunzip::<R>).await
                }
            },
        }
    }

    /// Run an in-process extraction on the blocking pool. Any failure is
    /// reported as [`PackageError::ExtractionFailed`].
    async fn run_builtin<F>(&self, archive: &Path, dest: &Path, job: F) -> Result<()>
    where
        F: FnOnce(&R, &Path, &Path) -> Result<()> + Send + 'static,
    {
        let runtime = Arc::clone(&self.runtime);
        let (archive_path, dest_path) = (archive.to_path_buf(), dest.to_path_buf());
        let result = tokio::task::spawn_blocking(move || {
            job(runtime.as_ref(), &archive_path, &dest_path)
        })
        .await
        .context("Extraction task panicked")?;

        result.map_err(|err| match err.downcast::<PackageError>() {
            Ok(typed) => typed.into(),
            Err(err) => PackageError::ExtractionFailed {
                archive: archive.to_path_buf(),
                message: format!("{:#}", err),
            }
            .into(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::runtime::RealRuntime;
    use crate::tool::{MockToolRunner, ToolOutput};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_kind_from_file_name() {
        assert_eq!(ArchiveKind::from_file_name("rg.tar"), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_file_name("rg.tar.gz"), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_file_name("rg.TAR.BZ2"), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_file_name("rg.tar.xz"), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_file_name("rg.tgz"), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_file_name("lls.zip"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_file_name("ra.gz"), Some(ArchiveKind::Gzip));
        assert_eq!(ArchiveKind::from_file_name("tool.7z"), None);
        assert_eq!(ArchiveKind::from_file_name("tool"), None);
    }

    #[test]
    fn test_kind_from_url_ignores_query() {
        assert_eq!(
            ArchiveKind::from_url("https://example.com/dl/rg.tar.gz?token=abc"),
            Some(ArchiveKind::Tar)
        );
        assert_eq!(
            ArchiveKind::from_url("https://example.com/dl/lls.zip#frag"),
            Some(ArchiveKind::Zip)
        );
        assert_eq!(ArchiveKind::from_url("https://example.com/zip?x=.zip"), None);
    }

    #[test]
    fn test_download_names() {
        assert_eq!(ArchiveKind::Tar.download_name(), "package.tar");
        assert_eq!(ArchiveKind::Zip.download_name(), "package.zip");
        assert_eq!(ArchiveKind::Gzip.download_name(), "package.gz");
    }

    #[test]
    fn test_compression_from_magic() {
        assert_eq!(TarCompression::from_magic(&[0x1f, 0x8b, 0x08]), TarCompression::Gzip);
        assert_eq!(TarCompression::from_magic(b"BZh91AY"), TarCompression::Bzip2);
        assert_eq!(
            TarCompression::from_magic(&[0xfd, b'7', b'z', b'X', b'Z', 0x00, 0x00]),
            TarCompression::Xz
        );
        assert_eq!(TarCompression::from_magic(b"tool/"), TarCompression::None);
        assert_eq!(TarCompression::from_magic(&[]), TarCompression::None);
    }

    #[test]
    fn test_sniff_ignores_file_name() {
        let dir = tempdir().unwrap();
        // gzip content behind a plain .tar name
        let path = dir.path().join("package.tar");
        fs::write(&path, tar_gz_bytes(&[("tool", "x", 0o755)])).unwrap();

        let compression = TarCompression::sniff(&RealRuntime, &path).unwrap();
        assert_eq!(compression, TarCompression::Gzip);
    }

    #[tokio::test]
    async fn test_builtin_backend_dispatches_tar() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("package.tar");
        fs::write(&archive, tar_gz_bytes(&[("rg-14/rg", "#!/bin/sh\n", 0o755)])).unwrap();
        let content = dir.path().join("content");

        // No expectations: the builtin backend must not spawn tools.
        let tools = MockToolRunner::new();
        let extractor = Extractor::new(ExtractorBackend::Builtin, Arc::new(RealRuntime), &tools);
        extractor
            .extract(ArchiveKind::Tar, &archive, &content)
            .await
            .unwrap();

        assert_eq!(fs::read_to_string(content.join("rg-14/rg")).unwrap(), "#!/bin/sh\n");
    }

    #[tokio::test]
    async fn test_builtin_backend_types_corrupt_zip() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("package.zip");
        fs::write(&archive, b"definitely not a zip").unwrap();

        let tools = MockToolRunner::new();
        let extractor = Extractor::new(ExtractorBackend::Builtin, Arc::new(RealRuntime), &tools);
        let err = extractor
            .extract(ArchiveKind::Zip, &archive, &dir.path().join("content"))
            .await
            .unwrap_err();

        match err.downcast_ref::<PackageError>() {
            Some(PackageError::ExtractionFailed { archive: path, message }) => {
                assert_eq!(path, &archive);
                assert!(message.contains("Failed to parse ZIP archive"));
            }
            other => panic!("Expected extraction failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_builtin_backend_rejects_xz_tarball() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("package.tar");
        fs::write(&archive, [0xfd, b'7', b'z', b'X', b'Z', 0x00, 0x00, 0x01]).unwrap();

        let tools = MockToolRunner::new();
        let extractor = Extractor::new(ExtractorBackend::Builtin, Arc::new(RealRuntime), &tools);
        let err = extractor
            .extract(ArchiveKind::Tar, &archive, &dir.path().join("content"))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PackageError>(),
            Some(PackageError::ExtractionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_external_backend_dispatches_zip() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("package.zip");
        fs::write(&archive, zip_bytes(&[("lls", "bin", 0o755)])).unwrap();
        let content = dir.path().join("content");

        let mut tools = MockToolRunner::new();
        tools
            .expect_run()
            .withf(|inv| inv.program == "unzip")
            .times(1)
            .returning(|_| {
                Ok(ToolOutput {
                    status: Some(0),
                    ..Default::default()
                })
            });

        let extractor = Extractor::new(ExtractorBackend::External, Arc::new(RealRuntime), &tools);
        extractor
            .extract(ArchiveKind::Zip, &archive, &content)
            .await
            .unwrap();
    }
}
