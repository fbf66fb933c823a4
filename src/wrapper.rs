//! Executable wrapper scripts.
//!
//! A wrapper lets a binary live inside a private package directory while
//! exposing one argument-transparent entry point that sets the environment
//! the binary needs.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::error::PackageError;
use crate::runtime::Runtime;

const WRAPPER_MODE: u32 = 0o755;

/// Write a `/bin/sh` wrapper at `wrapper` that exports `env` and execs `target`.
///
/// Fails with [`PackageError::MissingBinary`] when `target` does not exist.
#[tracing::instrument(skip(runtime, env))]
pub fn make_executable_wrapper<R: Runtime>(
    runtime: &R,
    target: &Path,
    wrapper: &Path,
    env: &[(&str, &Path)],
) -> Result<PathBuf> {
    if !runtime.exists(target) {
        return Err(PackageError::MissingBinary(target.to_path_buf()).into());
    }

    let script = render_script(target, env);
    if let Some(parent) = wrapper.parent() {
        runtime.create_dir_all(parent)?;
    }
    runtime
        .write(wrapper, script.as_bytes())
        .with_context(|| format!("Failed to write wrapper {:?}", wrapper))?;
    runtime.set_permissions(wrapper, WRAPPER_MODE)?;

    debug!("Wrapped {:?} with {:?}", target, wrapper);
    Ok(wrapper.to_path_buf())
}

fn render_script(target: &Path, env: &[(&str, &Path)]) -> String {
    let mut script = String::from("#!/bin/sh\n");
    for (key, value) in env {
        script.push_str(&format!(
            "export {}={}\n",
            key,
            shell_quote(&value.to_string_lossy())
        ));
    }
    script.push_str(&format!(
        "exec {} \"$@\"\n",
        shell_quote(&target.to_string_lossy())
    ));
    script
}

/// Single-quote `value` for POSIX sh.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
