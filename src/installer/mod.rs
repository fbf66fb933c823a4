//! Per-kind installers.
//!
//! Every installer works inside the package directory it is handed and
//! returns the absolute path of a runnable entry point. None of them touches
//! `bin/`; publishing the entry point is the engine's job.

mod archive;
mod bundler;
mod file;
mod gem;
mod npm;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::archive::Extractor;
use crate::config::Config;
use crate::download::download_file;
use crate::error::PackageError;
use crate::http::HttpClient;
use crate::runtime::Runtime;
use crate::tool::{Invocation, ToolOutput, ToolRunner};

/// Directory that receives unpacked tar and zip archives.
pub const CONTENT_DIR: &str = "content";

/// File name of a downloaded or decompressed single-file binary.
pub const PACKAGE_FILE: &str = "package";

/// Executable bit for single-file packages (rwxr-xr-x).
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Collaborators shared by all installers.
///
/// The runtime is an `Arc` so it can be handed to blocking tasks.
pub struct Toolbox<'a, R, T> {
    pub runtime: &'a Arc<R>,
    pub tools: &'a T,
    pub http: &'a HttpClient,
    pub config: &'a Config,
}

impl<'a, R: Runtime, T: ToolRunner> Toolbox<'a, R, T> {
    pub fn new(runtime: &'a Arc<R>, tools: &'a T, http: &'a HttpClient, config: &'a Config) -> Self {
        Self {
            runtime,
            tools,
            http,
            config,
        }
    }

    pub fn extractor(&self) -> Extractor<'a, R, T> {
        Extractor::new(self.config.extractor, Arc::clone(self.runtime), self.tools)
    }

    pub async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        download_file(self.runtime.as_ref(), url, dest, self.http).await
    }

    /// Run a package-manager step; a non-zero exit becomes the error built
    /// by `failure`.
    async fn run_step<F>(&self, invocation: &Invocation, failure: F) -> Result<ToolOutput>
    where
        F: FnOnce(ToolOutput) -> PackageError + Send,
    {
        let output = self.tools.run(invocation).await?;
        if !output.success() {
            warn!("`{}` failed in {:?}", invocation, invocation.cwd);
            debug!("stdout: {}", output.stdout_lossy());
            debug!("stderr: {}", output.stderr_lossy());
            return Err(failure(output).into());
        }
        Ok(output)
    }
}

#[async_trait]
pub trait Installer: Send + Sync {
    /// Acquire and build the package inside `cwd`, returning its entry point.
    async fn install<R: Runtime, T: ToolRunner>(
        &self,
        toolbox: &Toolbox<'_, R, T>,
        cwd: &Path,
    ) -> Result<PathBuf>;
}
