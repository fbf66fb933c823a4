use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::path::{Path, PathBuf};

use super::{Installer, Toolbox};
use crate::error::PackageError;
use crate::package::{BundlerPackage, GemEntry};
use crate::runtime::Runtime;
use crate::tool::{Invocation, ToolRunner};

fn render_gemfile(gems: &[GemEntry]) -> String {
    let mut lines = vec![
        "# frozen_string_literal: true".to_string(),
        "source 'https://rubygems.org'".to_string(),
    ];
    lines.extend(gems.iter().map(|gem| match gem {
        GemEntry::Name(name) => format!("gem '{}'", name),
        GemEntry::Pinned(name, version) => format!("gem '{}', '{}'", name, version),
    }));
    lines.join("\n")
}

#[async_trait]
impl Installer for BundlerPackage {
    #[tracing::instrument(skip(self, toolbox), fields(package = %self.name))]
    async fn install<R: Runtime, T: ToolRunner>(
        &self,
        toolbox: &Toolbox<'_, R, T>,
        cwd: &Path,
    ) -> Result<PathBuf> {
        toolbox
            .runtime
            .write(&cwd.join("Gemfile"), render_gemfile(&self.gems).as_bytes())?;

        info!("Running `bundle install` for {}", self.name);
        // GEM_HOME keeps every gem inside this package directory.
        let invocation = Invocation::new("bundle", cwd)
            .arg("install")
            .env("GEM_HOME", cwd.to_string_lossy());
        toolbox
            .run_step(&invocation, |output| PackageError::Install {
                package: self.name.clone(),
                output,
            })
            .await?;

        Ok(cwd.join(&self.bin_path))
    }
}
