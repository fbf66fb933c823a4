use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{EXECUTABLE_MODE, Installer, PACKAGE_FILE, Toolbox};
use crate::package::FilePackage;
use crate::runtime::Runtime;
use crate::tool::ToolRunner;

#[async_trait]
impl Installer for FilePackage {
    #[tracing::instrument(skip(self, toolbox), fields(package = %self.name))]
    async fn install<R: Runtime, T: ToolRunner>(
        &self,
        toolbox: &Toolbox<'_, R, T>,
        cwd: &Path,
    ) -> Result<PathBuf> {
        let entry = cwd.join(PACKAGE_FILE);
        toolbox.download(&self.url, &entry).await?;
        toolbox.runtime.set_permissions(&entry, EXECUTABLE_MODE)?;
        Ok(entry)
    }
}
