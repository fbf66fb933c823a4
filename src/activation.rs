//! Publishing entry points into `bin/` and retracting installed packages.

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::PackageError;
use crate::layout::Layout;
use crate::runtime::{Runtime, is_not_found};

/// Expose `entry_point` as `bin/<name>`, replacing whatever was there.
#[tracing::instrument(skip(runtime, layout))]
pub fn publish<R: Runtime>(
    runtime: &R,
    entry_point: &Path,
    layout: &Layout,
    name: &str,
) -> Result<PathBuf> {
    if !runtime.exists(entry_point) {
        return Err(PackageError::MissingBinary(entry_point.to_path_buf()).into());
    }
    let target = std::path::absolute(entry_point)
        .with_context(|| format!("Failed to resolve {:?}", entry_point))?;

    runtime.create_dir_all(&layout.bin_dir())?;

    let link = layout.bin_path(name);
    if runtime.is_symlink(&link) {
        debug!("Replacing existing link {:?}", link);
        runtime.remove_symlink(&link)?;
    } else if runtime.is_dir(&link) {
        debug!("Replacing existing directory {:?}", link);
        runtime.remove_dir_all(&link)?;
    } else if runtime.exists(&link) {
        debug!("Replacing existing file {:?}", link);
        runtime.remove_file(&link)?;
    }

    runtime.symlink(&target, &link)?;
    info!("Linked {:?} -> {:?}", link, target);
    Ok(link)
}

/// Remove `packages/<name>/` and `bin/<name>`.
///
/// Both removals run concurrently on the blocking pool. Either path being
/// absent already counts as success.
#[tracing::instrument(skip(runtime, layout))]
pub async fn retract<R: Runtime>(runtime: Arc<R>, layout: &Layout, name: &str) -> Result<()> {
    let package_dir = layout.package_dir(name);
    let link = layout.bin_path(name);

    let (dir_result, link_result) = tokio::join!(
        remove_blocking(&runtime, &package_dir, R::remove_dir_all),
        remove_blocking(&runtime, &link, R::remove_symlink),
    );
    settle(&package_dir, dir_result)?;
    settle(&link, link_result)?;

    info!("Removed package {}", name);
    Ok(())
}

/// Remove `bin/<name>` if present.
#[tracing::instrument(skip(runtime, layout))]
pub async fn unpublish<R: Runtime>(runtime: &Arc<R>, layout: &Layout, name: &str) -> Result<()> {
    let link = layout.bin_path(name);
    settle(&link, remove_blocking(runtime, &link, R::remove_symlink).await)
}

/// Remove a previous `packages/<name>/` before installing into it again.
#[tracing::instrument(skip(runtime, layout))]
pub async fn clear_package_dir<R: Runtime>(
    runtime: &Arc<R>,
    layout: &Layout,
    name: &str,
) -> Result<()> {
    let dir = layout.package_dir(name);
    match remove_blocking(runtime, &dir, R::remove_dir_all).await {
        Ok(()) => {
            debug!("Removed stale package directory {:?}", dir);
            Ok(())
        }
        Err(err) if is_not_found(&err) => Ok(()),
        Err(err) => Err(err.context(format!("Failed to clear stale package directory {:?}", dir))),
    }
}

async fn remove_blocking<R: Runtime>(
    runtime: &Arc<R>,
    path: &Path,
    remove: fn(&R, &Path) -> Result<()>,
) -> Result<()> {
    let runtime = Arc::clone(runtime);
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || remove(runtime.as_ref(), &path))
        .await
        .context("Removal task panicked")?
}

fn settle(path: &Path, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if is_not_found(&err) => {
            debug!("{:?} was already absent", path);
            Ok(())
        }
        Err(err) => Err(PackageError::Uninstall {
            path: path.to_path_buf(),
            message: format!("{:#}", err),
        }
        .into()),
    }
}
