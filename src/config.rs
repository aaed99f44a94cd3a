//! Manifest parsing (`rvend.toml`).
//!
//! A manifest declares a package's direct dependencies as an ordered list of
//! `[[import]]` tables. Declaration order is processing order.
//!
//! ```toml
//! [package]
//! name = "app"
//! vendor_dir = "third_party"
//!
//! [[import]]
//! name = "github.com/fmtlib/fmt"
//! tag = "10.2.1"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// File name of a package manifest.
pub const MANIFEST_FILE: &str = "rvend.toml";

/// Vendor directory used when neither the CLI nor the root manifest names one.
pub const DEFAULT_VENDOR_DIR: &str = "vendor";

/// Vendor segment inside a vendored package. Never configurable, so a root
/// override cannot leak into embedded vendor trees.
pub const NESTED_VENDOR_DIR: &str = "vendor";

#[derive(Deserialize, Debug, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub package: PackageConfig,
    #[serde(default, rename = "import")]
    pub imports: Vec<Import>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct PackageConfig {
    pub name: Option<String>,
    /// Root vendor directory override. Ignored for nested packages.
    pub vendor_dir: Option<String>,
}

/// One declared dependency.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Import {
    pub name: String,
    pub repo: Option<String>,
    pub vcs: Option<String>,
    pub tag: Option<String>,
    pub branch: Option<String>,
    pub rev: Option<String>,
}

/// What a dependency is pinned to. `rev` wins over `tag`, `tag` over `branch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pin<'a> {
    Rev(&'a str),
    Tag(&'a str),
    Branch(&'a str),
}

impl Import {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Repository location, falling back to `https://<name>`.
    pub fn remote(&self) -> String {
        match self.repo.as_deref() {
            Some(repo) if !repo.trim().is_empty() => repo.to_string(),
            _ => format!("https://{}", self.name),
        }
    }

    pub fn vcs_kind(&self) -> &str {
        self.vcs.as_deref().unwrap_or("git")
    }

    pub fn pin(&self) -> Option<Pin<'_>> {
        if let Some(rev) = self.rev.as_deref() {
            return Some(Pin::Rev(rev));
        }
        if let Some(tag) = self.tag.as_deref() {
            return Some(Pin::Tag(tag));
        }
        self.branch.as_deref().map(Pin::Branch)
    }
}

impl Config {
    /// Parses manifest text and validates import names.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for imp in &self.imports {
            if !is_valid_import_name(&imp.name) {
                anyhow::bail!(
                    "Invalid import name '{}': expected a relative path without '.' or '..'",
                    imp.name
                );
            }
        }
        Ok(())
    }

    /// Root vendor directory for this project: the CLI override first, then
    /// `[package].vendor_dir`, then `vendor`.
    pub fn vendor_root(&self, project_dir: &Path, cli_override: Option<&str>) -> PathBuf {
        let name = cli_override
            .or(self.package.vendor_dir.as_deref())
            .unwrap_or(DEFAULT_VENDOR_DIR);
        project_dir.join(name)
    }
}

fn is_valid_import_name(name: &str) -> bool {
    !name.trim().is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILE)
}

/// Reads and parses the manifest in `dir`.
pub fn load_manifest(dir: &Path) -> Result<Config> {
    let path = manifest_path(dir);
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "{} not found in {}",
            MANIFEST_FILE,
            dir.display()
        ));
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Config::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Source of package manifests.
pub trait ManifestLoader: Send + Sync {
    fn load(&self, dir: &Path) -> Result<Config>;
}

/// Loads `rvend.toml` from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct TomlManifest;

impl ManifestLoader for TomlManifest {
    fn load(&self, dir: &Path) -> Result<Config> {
        load_manifest(dir)
    }
}
