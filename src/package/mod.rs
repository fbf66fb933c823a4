//! Package descriptors.
//!
//! A descriptor is a closed sum over the supported package kinds. On the wire
//! it is an adjacently tagged object: `{"type": "tar", "package": {...}}`.

mod kinds;
mod validate;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use kinds::{
    BundlerPackage, CompressedPackage, FilePackage, GemEntry, GemPackage, NpmPackage, TarPackage,
    ZipPackage,
};
pub use validate::validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "package", rename_all = "lowercase")]
pub enum PackageDescriptor {
    Bundler(BundlerPackage),
    Npm(NpmPackage),
    Gem(GemPackage),
    Compressed(CompressedPackage),
    Tar(TarPackage),
    Zip(ZipPackage),
    File(FilePackage),
}

/// Discriminant of [`PackageDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    Bundler,
    Npm,
    Gem,
    Compressed,
    Tar,
    Zip,
    File,
}

impl PackageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::Bundler => "bundler",
            PackageKind::Npm => "npm",
            PackageKind::Gem => "gem",
            PackageKind::Compressed => "compressed",
            PackageKind::Tar => "tar",
            PackageKind::Zip => "zip",
            PackageKind::File => "file",
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PackageDescriptor {
    pub fn kind(&self) -> PackageKind {
        match self {
            PackageDescriptor::Bundler(_) => PackageKind::Bundler,
            PackageDescriptor::Npm(_) => PackageKind::Npm,
            PackageDescriptor::Gem(_) => PackageKind::Gem,
            PackageDescriptor::Compressed(_) => PackageKind::Compressed,
            PackageDescriptor::Tar(_) => PackageKind::Tar,
            PackageDescriptor::Zip(_) => PackageKind::Zip,
            PackageDescriptor::File(_) => PackageKind::File,
        }
    }

    /// Package name; derives `packages/<name>` and `bin/<name>`.
    pub fn name(&self) -> &str {
        match self {
            PackageDescriptor::Bundler(p) => &p.name,
            PackageDescriptor::Npm(p) => &p.name,
            PackageDescriptor::Gem(p) => &p.name,
            PackageDescriptor::Compressed(p) => &p.name,
            PackageDescriptor::Tar(p) => &p.name,
            PackageDescriptor::Zip(p) => &p.name,
            PackageDescriptor::File(p) => &p.name,
        }
    }
}
