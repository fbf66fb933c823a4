use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::path::{Path, PathBuf};

use super::{Installer, Toolbox};
use crate::error::PackageError;
use crate::package::GemPackage;
use crate::runtime::Runtime;
use crate::tool::{Invocation, ToolRunner};
use crate::wrapper::make_executable_wrapper;

/// Directory (inside the package) holding generated wrappers.
const WRAPPER_DIR: &str = ".sepia";

#[async_trait]
impl Installer for GemPackage {
    #[tracing::instrument(skip(self, toolbox), fields(package = %self.name))]
    async fn install<R: Runtime, T: ToolRunner>(
        &self,
        toolbox: &Toolbox<'_, R, T>,
        cwd: &Path,
    ) -> Result<PathBuf> {
        info!("Running `gem install {}:{}`", self.name, self.version);
        let invocation = Invocation::new("gem", cwd)
            .args([
                "install",
                "--no-user-install",
                "--no-format-executable",
                "--install-dir=.",
                "--bindir=bin",
                "--no-document",
            ])
            .arg(format!("{}:{}", self.name, self.version))
            .env("GEM_HOME", cwd.to_string_lossy());
        toolbox
            .run_step(&invocation, |output| PackageError::Install {
                package: self.name.clone(),
                output,
            })
            .await?;

        // The gem's binstub only finds its libraries with GEM_HOME set.
        let bin = self.bin_name();
        make_executable_wrapper(
            toolbox.runtime.as_ref(),
            &cwd.join("bin").join(bin),
            &cwd.join(WRAPPER_DIR).join(bin),
            &[("GEM_HOME", cwd)],
        )
    }
}
