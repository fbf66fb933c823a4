use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Gems resolved by `bundle install` from a generated Gemfile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundlerPackage {
    pub name: String,
    pub bin_path: String,
    pub gems: Vec<GemEntry>,
}

/// A Gemfile entry: `"rubocop"` or `["rubocop", "1.60.0"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GemEntry {
    Name(String),
    Pinned(String, String),
}

impl GemEntry {
    pub fn name(&self) -> &str {
        match self {
            GemEntry::Name(name) | GemEntry::Pinned(name, _) => name,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            GemEntry::Name(_) => None,
            GemEntry::Pinned(_, version) => Some(version),
        }
    }
}

/// npm-family package built from a synthetic `package.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpmPackage {
    pub name: String,
    pub bin_path: String,
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<BTreeMap<String, String>>,
}

impl NpmPackage {
    pub fn has_build_script(&self) -> bool {
        self.scripts
            .as_ref()
            .is_some_and(|scripts| scripts.contains_key("build"))
    }
}

/// A single gem installed with `gem install`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GemPackage {
    pub name: String,
    pub version: String,
    /// Executable name; defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<String>,
}

impl GemPackage {
    pub fn bin_name(&self) -> &str {
        self.bin.as_deref().unwrap_or(&self.name)
    }
}

/// Archive whose format is detected from the URL suffix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedPackage {
    pub name: String,
    pub url: String,
    /// Binary inside the unpacked tree; unused for single-file `.gz`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TarPackage {
    pub name: String,
    pub url: String,
    pub bin_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZipPackage {
    pub name: String,
    pub url: String,
    pub bin_path: String,
}

/// A plain downloadable executable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePackage {
    pub name: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gem_entries_accept_bare_and_pinned() {
        let pkg: BundlerPackage = serde_json::from_value(json!({
            "name": "rubocop",
            "binPath": "bin/rubocop",
            "gems": ["rubocop", ["rubocop-rails", "2.23.1"]]
        }))
        .unwrap();

        assert_eq!(
            pkg.gems,
            vec![
                GemEntry::Name("rubocop".to_string()),
                GemEntry::Pinned("rubocop-rails".to_string(), "2.23.1".to_string()),
            ]
        );
        assert_eq!(pkg.gems[1].name(), "rubocop-rails");
        assert_eq!(pkg.gems[0].version(), None);
        assert_eq!(pkg.gems[1].version(), Some("2.23.1"));
    }

    #[test]
    fn test_gem_bin_defaults_to_name() {
        let pkg: GemPackage =
            serde_json::from_value(json!({ "name": "solargraph", "version": "0.50.0" })).unwrap();
        assert_eq!(pkg.bin_name(), "solargraph");

        let pkg: GemPackage = serde_json::from_value(
            json!({ "name": "haml_lint", "version": "0.51.0", "bin": "haml-lint" }),
        )
        .unwrap();
        assert_eq!(pkg.bin_name(), "haml-lint");
    }

    #[test]
    fn test_npm_build_script_detection() {
        let mut pkg: NpmPackage = serde_json::from_value(json!({
            "name": "typescript-language-server",
            "binPath": "node_modules/.bin/typescript-language-server",
            "dependencies": { "typescript-language-server": "4.3.3" }
        }))
        .unwrap();
        assert!(!pkg.has_build_script());

        pkg.scripts = Some(BTreeMap::from([("build".to_string(), "tsc".to_string())]));
        assert!(pkg.has_build_script());
    }
}
