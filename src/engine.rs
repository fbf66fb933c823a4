//! Installation engine: kind dispatch, package directory lifecycle and
//! activation.

use anyhow::{Context, Result};
use log::{info, warn};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::activation::{clear_package_dir, publish, retract, unpublish};
use crate::config::Config;
use crate::http::HttpClient;
use crate::installer::{Installer, Toolbox};
use crate::layout::Layout;
use crate::orchestrator::{BatchObserver, BatchSummary, Completed, Failure, Operation, run_bounded};
use crate::package::{PackageDescriptor, validate};
use crate::runtime::{RealRuntime, Runtime};
use crate::tool::{SystemToolRunner, ToolRunner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub name: String,
    pub entry_point: PathBuf,
    /// `bin/<name>`
    pub link: PathBuf,
}

pub struct Engine<R, T> {
    runtime: Arc<R>,
    tools: T,
    http: HttpClient,
    config: Config,
}

impl Engine<RealRuntime, SystemToolRunner> {
    /// Engine backed by the real filesystem, process spawning and network.
    pub fn from_config(config: Config) -> Result<Self> {
        Ok(Self::new(config, RealRuntime, SystemToolRunner, HttpClient::build()?))
    }
}

impl<R: Runtime, T: ToolRunner> Engine<R, T> {
    pub fn new(config: Config, runtime: R, tools: T, http: HttpClient) -> Self {
        Self {
            runtime: Arc::new(runtime),
            tools,
            http,
            config,
        }
    }

    /// Install `descriptor` into a fresh `packages/<name>/` and publish its
    /// entry point as `bin/<name>`.
    ///
    /// A previous install is discarded first. If the new one then fails,
    /// `bin/<name>` is removed as well so it never points into the
    /// discarded directory.
    #[tracing::instrument(skip(self, descriptor), fields(package = %descriptor.name(), kind = %descriptor.kind()))]
    pub async fn install(&self, descriptor: &PackageDescriptor) -> Result<InstallReport> {
        let name = descriptor.name();
        let layout = self.config.layout();
        clear_package_dir(&self.runtime, &layout, name).await?;

        match self.build_and_publish(descriptor, &layout).await {
            Ok(report) => {
                info!("Installed {} ({})", name, descriptor.kind());
                Ok(report)
            }
            Err(err) => {
                warn!("Installing {} failed, unpublishing {:?}", name, layout.bin_path(name));
                if let Err(cleanup) = unpublish(&self.runtime, &layout, name).await {
                    warn!("Failed to unpublish {}: {:#}", name, cleanup);
                }
                Err(err)
            }
        }
    }

    async fn build_and_publish(
        &self,
        descriptor: &PackageDescriptor,
        layout: &Layout,
    ) -> Result<InstallReport> {
        let name = descriptor.name();
        let dir = layout.package_dir(name);
        self.runtime.create_dir_all(&dir)?;

        let toolbox = Toolbox::new(&self.runtime, &self.tools, &self.http, &self.config);
        let entry_point = match descriptor {
            PackageDescriptor::Bundler(pkg) => pkg.install(&toolbox, &dir).await?,
            PackageDescriptor::Npm(pkg) => pkg.install(&toolbox, &dir).await?,
            PackageDescriptor::Gem(pkg) => pkg.install(&toolbox, &dir).await?,
            PackageDescriptor::Compressed(pkg) => pkg.install(&toolbox, &dir).await?,
            PackageDescriptor::Tar(pkg) => pkg.install(&toolbox, &dir).await?,
            PackageDescriptor::Zip(pkg) => pkg.install(&toolbox, &dir).await?,
            PackageDescriptor::File(pkg) => pkg.install(&toolbox, &dir).await?,
        };

        let runtime = Arc::clone(&self.runtime);
        let (entry, layout, link_name) = (entry_point.clone(), layout.clone(), name.to_string());
        let link = tokio::task::spawn_blocking(move || {
            publish(runtime.as_ref(), &entry, &layout, &link_name)
        })
        .await
        .context("Publish task panicked")??;

        Ok(InstallReport {
            name: name.to_string(),
            entry_point,
            link,
        })
    }

    /// Remove everything `install` created for `descriptor`. Kind-independent.
    #[tracing::instrument(skip(self, descriptor), fields(package = %descriptor.name()))]
    pub async fn uninstall(&self, descriptor: &PackageDescriptor) -> Result<()> {
        retract(Arc::clone(&self.runtime), &self.config.layout(), descriptor.name()).await
    }

    /// Validate and run `operation` for every raw descriptor, at most
    /// `max_concurrency` at a time. Per-item results go to `observer`; a
    /// failing item never affects its siblings.
    pub async fn run_all<O: BatchObserver>(
        &self,
        items: Vec<Value>,
        operation: Operation,
        observer: &O,
    ) -> BatchSummary {
        let succeeded = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let counts = (&succeeded, &failed);

        info!(
            "Running {} for {} package(s), {} at a time",
            operation,
            items.len(),
            self.config.max_concurrency
        );
        run_bounded(items, self.config.max_concurrency, move |raw| async move {
            match self.run_one(&raw, operation).await {
                Ok(completed) => {
                    counts.0.fetch_add(1, Ordering::SeqCst);
                    observer.on_success(&completed);
                }
                Err(failure) => {
                    counts.1.fetch_add(1, Ordering::SeqCst);
                    observer.on_error(&failure);
                }
            }
        })
        .await;

        BatchSummary {
            succeeded: succeeded.into_inner(),
            failed: failed.into_inner(),
        }
    }

    async fn run_one(&self, raw: &Value, operation: Operation) -> Result<Completed, Failure> {
        let fail = |name: Option<String>, error: anyhow::Error| Failure {
            name,
            operation,
            error,
        };

        let descriptor = validate(raw).map_err(|err| fail(raw_name(raw), err))?;
        let name = descriptor.name().to_string();
        match operation {
            Operation::Install => self
                .install(&descriptor)
                .await
                .map(Completed::Installed)
                .map_err(|err| fail(Some(name), err)),
            Operation::Uninstall => self
                .uninstall(&descriptor)
                .await
                .map(|()| Completed::Uninstalled { name: name.clone() })
                .map_err(|err| fail(Some(name), err)),
        }
    }
}

/// Best-effort package name of a descriptor that failed validation.
fn raw_name(raw: &Value) -> Option<String> {
    raw.get("package")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}
