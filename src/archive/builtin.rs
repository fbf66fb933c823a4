//! In-process extraction with the tar, flate2 and zip crates.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::{debug, info};
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use super::TarCompression;
use crate::error::PackageError;
use crate::runtime::Runtime;

/// Executable bit for decompressed single-file packages (rwxr-xr-x).
const EXECUTABLE_MODE: u32 = 0o755;

pub(super) fn untar<R: Runtime>(
    runtime: &R,
    compression: TarCompression,
    archive: &Path,
    dest: &Path,
) -> Result<()> {
    runtime.create_dir_all(dest)?;
    let file = runtime
        .open(archive)
        .with_context(|| format!("Failed to open archive at {:?}", archive))?;

    let reader: Box<dyn Read> = match compression {
        TarCompression::None => file,
        TarCompression::Gzip => Box::new(GzDecoder::new(file)),
        TarCompression::Bzip2 | TarCompression::Xz => {
            return Err(PackageError::ExtractionFailed {
                archive: archive.to_path_buf(),
                message: format!("{:?}-compressed tarballs need the external extractor", compression),
            }
            .into());
        }
    };

    // Archive::unpack refuses entries that would escape `dest`.
    tar::Archive::new(reader)
        .unpack(dest)
        .with_context(|| format!("Failed to unpack {:?} to {:?}", archive, dest))?;

    info!("Extraction complete.");
    Ok(())
}

pub(super) fn unzip<R: Runtime>(runtime: &R, archive: &Path, dest: &Path) -> Result<()> {
    debug!("Extracting zip archive to {:?}...", dest);
    let mut file = runtime
        .open(archive)
        .with_context(|| format!("Failed to open archive at {:?}", archive))?;

    // ZipArchive needs Read + Seek; Runtime::open only gives Read.
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)
        .with_context(|| format!("Failed to read archive {:?}", archive))?;
    let mut zip = ZipArchive::new(std::io::Cursor::new(buffer))
        .with_context(|| format!("Failed to parse ZIP archive {:?}", archive))?;

    runtime.create_dir_all(dest)?;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .with_context(|| format!("Failed to read ZIP entry {}", i))?;

        let entry_path = match entry.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => {
                debug!("Skipping entry with invalid path: {}", entry.name());
                continue;
            }
        };
        let full_path = dest.join(&entry_path);

        if entry.is_dir() {
            runtime.create_dir_all(&full_path)?;
            continue;
        }

        if let Some(parent) = full_path.parent() {
            runtime.create_dir_all(parent)?;
        }
        let mut out = runtime.create_file(&full_path)?;
        std::io::copy(&mut entry, &mut out)
            .with_context(|| format!("Failed to extract file {:?}", full_path))?;
        drop(out);

        if let Some(mode) = entry.unix_mode()
            && let Err(e) = runtime.set_permissions(&full_path, mode)
        {
            debug!("Failed to set permissions on {:?}: {}", full_path, e);
        }
    }

    info!("Extraction complete.");
    Ok(())
}

pub(super) fn gunzip<R: Runtime>(runtime: &R, archive: &Path, dest: &Path) -> Result<()> {
    let file = runtime
        .open(archive)
        .with_context(|| format!("Failed to open archive at {:?}", archive))?;
    let mut decoder = GzDecoder::new(file);

    if let Some(parent) = dest.parent() {
        runtime.create_dir_all(parent)?;
    }
    let mut out = runtime.create_file(dest)?;
    let bytes = std::io::copy(&mut decoder, &mut out)
        .with_context(|| format!("Failed to decompress {:?}", archive))?;
    drop(out);

    runtime.set_permissions(dest, EXECUTABLE_MODE)?;
    debug!("Decompressed {} bytes to {:?}", bytes, dest);
    Ok(())
}
