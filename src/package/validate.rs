use anyhow::Result;
use reqwest::Url;
use serde_json::Value;
use std::path::{Component, Path};

use super::{PackageDescriptor, PackageKind};
use crate::archive::ArchiveKind;
use crate::error::PackageError;

/// Validate a raw descriptor against its kind's schema.
///
/// Runs before any filesystem or network side effect. Besides
/// [`PackageError::Validation`], URL/kind mismatches surface as
/// [`PackageError::InvalidUrl`] and unknown compressed formats as
/// [`PackageError::UnknownArchiveType`].
pub fn validate(raw: &Value) -> Result<PackageDescriptor> {
    let descriptor: PackageDescriptor = serde_json::from_value(raw.clone())
        .map_err(|e| PackageError::Validation(e.to_string()))?;
    check(&descriptor)?;
    Ok(descriptor)
}

fn check(descriptor: &PackageDescriptor) -> Result<(), PackageError> {
    check_name(descriptor.name())?;

    match descriptor {
        PackageDescriptor::Bundler(pkg) => {
            check_relative("binPath", &pkg.bin_path)?;
            for gem in &pkg.gems {
                if gem.name().is_empty() {
                    return Err(invalid("gem entries must have a non-empty name"));
                }
                check_gemfile_literal("gem name", gem.name())?;
                if let Some(version) = gem.version() {
                    check_gemfile_literal("gem version", version)?;
                }
            }
        }
        PackageDescriptor::Npm(pkg) => {
            check_relative("binPath", &pkg.bin_path)?;
        }
        PackageDescriptor::Gem(pkg) => {
            if pkg.version.is_empty() {
                return Err(invalid("version must not be empty"));
            }
            check_single_component("bin", pkg.bin_name())?;
        }
        PackageDescriptor::Compressed(pkg) => {
            check_url(&pkg.url)?;
            match ArchiveKind::from_url(&pkg.url) {
                Some(ArchiveKind::Tar | ArchiveKind::Zip) => match &pkg.bin_path {
                    Some(bin_path) => check_relative("binPath", bin_path)?,
                    None => return Err(invalid("binPath is required for tar and zip archives")),
                },
                Some(ArchiveKind::Gzip) => {
                    if let Some(bin_path) = &pkg.bin_path {
                        check_relative("binPath", bin_path)?;
                    }
                }
                None => return Err(PackageError::UnknownArchiveType(pkg.url.clone())),
            }
        }
        PackageDescriptor::Tar(pkg) => {
            check_url(&pkg.url)?;
            check_suffix(PackageKind::Tar, ArchiveKind::Tar, &pkg.url)?;
            check_relative("binPath", &pkg.bin_path)?;
        }
        PackageDescriptor::Zip(pkg) => {
            check_url(&pkg.url)?;
            check_suffix(PackageKind::Zip, ArchiveKind::Zip, &pkg.url)?;
            check_relative("binPath", &pkg.bin_path)?;
        }
        PackageDescriptor::File(pkg) => {
            check_url(&pkg.url)?;
        }
    }

    Ok(())
}

fn invalid(msg: impl Into<String>) -> PackageError {
    PackageError::Validation(msg.into())
}

fn check_name(name: &str) -> Result<(), PackageError> {
    check_single_component("name", name)
}

/// `value` must be exactly one normal path component.
fn check_single_component(field: &str, value: &str) -> Result<(), PackageError> {
    let mut components = Path::new(value).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if value.is_empty() || !single || value.contains(['/', '\\']) {
        return Err(invalid(format!(
            "{} must be a single path component, got {:?}",
            field, value
        )));
    }
    Ok(())
}

/// `value` must be a relative path that stays inside its base directory.
fn check_relative(field: &str, value: &str) -> Result<(), PackageError> {
    let path = Path::new(value);
    let has_normal = path
        .components()
        .any(|c| matches!(c, Component::Normal(_)));
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if !has_normal || escapes {
        return Err(invalid(format!(
            "{} must be a relative path inside the package, got {:?}",
            field, value
        )));
    }
    Ok(())
}

/// `value` is rendered inside a single-quoted Ruby string in the Gemfile.
fn check_gemfile_literal(field: &str, value: &str) -> Result<(), PackageError> {
    if value.contains(['\'', '\\', '\n', '\r']) {
        return Err(invalid(format!(
            "{} must not contain quotes, backslashes or line breaks, got {:?}",
            field, value
        )));
    }
    Ok(())
}

fn check_url(url: &str) -> Result<(), PackageError> {
    let parsed = Url::parse(url).map_err(|e| invalid(format!("invalid url {:?}: {}", url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("url must use http or https: {}", url)));
    }
    Ok(())
}

fn check_suffix(kind: PackageKind, expected: ArchiveKind, url: &str) -> Result<(), PackageError> {
    if ArchiveKind::from_url(url) != Some(expected) {
        return Err(PackageError::InvalidUrl {
            kind,
            url: url.to_string(),
        });
    }
    Ok(())
}
