use std::path::{Path, PathBuf};

/// On-disk layout of an install root.
///
/// ```text
/// <root>/packages/<name>/   package-private content
/// <root>/bin/<name>         activation symlink
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.packages_dir().join(name)
    }

    pub fn bin_path(&self, name: &str) -> PathBuf {
        self.bin_dir().join(name)
    }
}
