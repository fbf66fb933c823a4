//! Error taxonomy for package installation.
//!
//! These errors travel inside `anyhow::Error`; callers recover the kind with
//! `err.downcast_ref::<PackageError>()`.

use std::fmt;
use std::path::PathBuf;

use crate::package::PackageKind;
use crate::tool::ToolOutput;

#[derive(Debug)]
pub enum PackageError {
    /// Descriptor does not match its kind's schema
    Validation(String),
    /// Server answered a download with a non-success status
    Download { url: String, status: u16 },
    /// An archive tool exited with a non-zero status
    Extraction { archive: PathBuf, output: ToolOutput },
    /// In-process extraction failed or the archive format is unsupported
    ExtractionFailed { archive: PathBuf, message: String },
    /// A package manager's build step failed
    Build { package: String, output: ToolOutput },
    /// A package manager's install step failed
    Install { package: String, output: ToolOutput },
    /// An expected binary is absent after acquisition
    MissingBinary(PathBuf),
    /// URL suffix does not match the declared archive kind
    InvalidUrl { kind: PackageKind, url: String },
    /// URL suffix is not a known compressed format
    UnknownArchiveType(String),
    /// Removing package storage failed for a reason other than absence
    Uninstall { path: PathBuf, message: String },
}

impl fmt::Display for PackageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageError::Validation(msg) => write!(f, "Invalid package descriptor: {}", msg),
            PackageError::Download { url, status } => {
                write!(f, "Failed to download {} (HTTP {})", url, status)
            }
            PackageError::Extraction { archive, output } => {
                write!(f, "Failed to extract {:?}: {}", archive, output)
            }
            PackageError::ExtractionFailed { archive, message } => {
                write!(f, "Failed to extract {:?}: {}", archive, message)
            }
            PackageError::Build { package, output } => {
                write!(f, "Failed to build package {}: {}", package, output)
            }
            PackageError::Install { package, output } => {
                write!(f, "Failed to install package {}: {}", package, output)
            }
            PackageError::MissingBinary(path) => write!(f, "Binary not found: {:?}", path),
            PackageError::InvalidUrl { kind, url } => write!(
                f,
                "Invalid package url (must be a {} file extension): {}",
                kind, url
            ),
            PackageError::UnknownArchiveType(url) => {
                write!(f, "Unknown compressed type: {}", url)
            }
            PackageError::Uninstall { path, message } => {
                write!(f, "Failed to remove {:?}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for PackageError {}

impl PackageError {
    /// Finds a `PackageError` anywhere in an error chain.
    pub fn find(err: &anyhow::Error) -> Option<&PackageError> {
        err.chain().find_map(|cause| cause.downcast_ref::<PackageError>())
    }
}
