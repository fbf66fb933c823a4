use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{Installer, Toolbox};
use crate::error::PackageError;
use crate::package::NpmPackage;
use crate::runtime::Runtime;
use crate::tool::{Invocation, ToolRunner};

#[derive(Serialize)]
struct PackageJson<'a> {
    name: String,
    version: &'static str,
    dependencies: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scripts: Option<&'a BTreeMap<String, String>>,
}

impl<'a> From<&'a NpmPackage> for PackageJson<'a> {
    fn from(pkg: &'a NpmPackage) -> Self {
        Self {
            name: format!("@sepia/{}", pkg.name),
            version: "0.0.0",
            dependencies: &pkg.dependencies,
            scripts: pkg.scripts.as_ref(),
        }
    }
}

#[async_trait]
impl Installer for NpmPackage {
    #[tracing::instrument(skip(self, toolbox), fields(package = %self.name))]
    async fn install<R: Runtime, T: ToolRunner>(
        &self,
        toolbox: &Toolbox<'_, R, T>,
        cwd: &Path,
    ) -> Result<PathBuf> {
        let manifest = serde_json::to_vec_pretty(&PackageJson::from(self))
            .context("Failed to serialize package.json")?;
        toolbox.runtime.write(&cwd.join("package.json"), &manifest)?;

        let program = toolbox.config.npm_installer.program();
        info!("Running `{} install` for {}", program, self.name);
        toolbox
            .run_step(&Invocation::new(program, cwd).arg("install"), |output| {
                PackageError::Install {
                    package: self.name.clone(),
                    output,
                }
            })
            .await?;

        if self.has_build_script() {
            info!("Running `{} run build` for {}", program, self.name);
            toolbox
                .run_step(
                    &Invocation::new(program, cwd).args(["run", "build"]),
                    |output| PackageError::Build {
                        package: self.name.clone(),
                        output,
                    },
                )
                .await?;
        }

        Ok(cwd.join(&self.bin_path))
    }
}
