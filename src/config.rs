//! Engine configuration.
//!
//! The configuration is an explicit value handed to the engine once per
//! batch; nothing reads it ambiently.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;

pub use crate::archive::ExtractorBackend;
use crate::layout::Layout;
use crate::runtime::Runtime;

/// Default number of packages processed at the same time.
pub const DEFAULT_MAX_CONCURRENCY: NonZeroUsize = NonZeroUsize::new(4).unwrap();

/// Client used for `npm`-type packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NpmInstaller {
    #[default]
    Npm,
    Pnpm,
    Yarn,
}

impl NpmInstaller {
    pub fn program(&self) -> &'static str {
        match self {
            NpmInstaller::Npm => "npm",
            NpmInstaller::Pnpm => "pnpm",
            NpmInstaller::Yarn => "yarn",
        }
    }
}

impl fmt::Display for NpmInstaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub install_root: PathBuf,
    pub npm_installer: NpmInstaller,
    pub max_concurrency: NonZeroUsize,
    pub extractor: ExtractorBackend,
}

impl Config {
    /// Configuration rooted at `install_root` with default settings.
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            npm_installer: NpmInstaller::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            extractor: ExtractorBackend::default(),
        }
    }

    pub fn layout(&self) -> Layout {
        Layout::new(self.install_root.clone())
    }
}

/// `<data dir>/sepia`, e.g. `~/.local/share/sepia` on Linux.
pub fn default_install_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    runtime
        .data_dir()
        .map(|dir| dir.join("sepia"))
        .context("Could not determine a data directory; pass --root")
}
