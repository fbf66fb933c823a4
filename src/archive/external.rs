//! Extraction through the system's tar, unzip and gunzip.

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;

use crate::error::PackageError;
use crate::runtime::Runtime;
use crate::tool::{Invocation, ToolOutput, ToolRunner};

/// Executable bit for decompressed single-file packages (rwxr-xr-x).
const EXECUTABLE_MODE: u32 = 0o755;

pub(super) async fn untar<R: Runtime, T: ToolRunner>(
    runtime: &R,
    tools: &T,
    archive: &Path,
    dest: &Path,
) -> Result<()> {
    runtime.create_dir_all(dest)?;
    let invocation = Invocation::new("tar", archive_dir(archive)?)
        .arg("-xvf")
        .arg(path_arg(archive))
        .arg("-C")
        .arg(path_arg(dest));
    run_checked(tools, &invocation, archive).await?;
    Ok(())
}

pub(super) async fn unzip<R: Runtime, T: ToolRunner>(
    runtime: &R,
    tools: &T,
    archive: &Path,
    dest: &Path,
) -> Result<()> {
    runtime.create_dir_all(dest)?;
    let invocation = Invocation::new("unzip", archive_dir(archive)?)
        .arg("-o")
        .arg(path_arg(archive))
        .arg("-d")
        .arg(path_arg(dest));
    run_checked(tools, &invocation, archive).await?;
    Ok(())
}

pub(super) async fn gunzip<R: Runtime, T: ToolRunner>(
    runtime: &R,
    tools: &T,
    archive: &Path,
    dest: &Path,
) -> Result<()> {
    let invocation = Invocation::new("gunzip", archive_dir(archive)?)
        .arg("-c")
        .arg(path_arg(archive));
    let output = run_checked(tools, &invocation, archive).await?;

    if let Some(parent) = dest.parent() {
        runtime.create_dir_all(parent)?;
    }
    runtime
        .write(dest, &output.stdout)
        .with_context(|| format!("Failed to write decompressed file {:?}", dest))?;
    runtime.set_permissions(dest, EXECUTABLE_MODE)?;
    debug!("Decompressed {} bytes to {:?}", output.stdout.len(), dest);
    Ok(())
}

async fn run_checked<T: ToolRunner>(
    tools: &T,
    invocation: &Invocation,
    archive: &Path,
) -> Result<ToolOutput> {
    let output = tools.run(invocation).await?;
    if !output.success() {
        return Err(PackageError::Extraction {
            archive: archive.to_path_buf(),
            output,
        }
        .into());
    }
    Ok(output)
}

fn archive_dir(archive: &Path) -> Result<&Path> {
    archive
        .parent()
        .with_context(|| format!("Archive {:?} has no parent directory", archive))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
