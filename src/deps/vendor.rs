//! Vendor tree layout helpers.
//!
//! Root imports live at `<vendor root>/<name>`. A vendored package's own
//! dependencies live at `<vendor root>/<name>/vendor/<nested>`, where the
//! `vendor` segment is fixed regardless of how the root is configured.

use crate::config::{MANIFEST_FILE, NESTED_VENDOR_DIR};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Makes sure `dir` exists as a directory, creating missing ancestors.
///
/// An existing directory is left alone. An existing non-directory at `dir` is
/// a conflict and is rejected rather than silently shadowed.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => {
            return Err(anyhow::anyhow!(
                "{} exists and is not a directory",
                dir.display()
            ));
        }
        Err(_) => {}
    }
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))
}

/// True when `dir` holds its own manifest as a regular file. Never fails.
pub fn has_own_manifest(dir: &Path) -> bool {
    fs::metadata(dir.join(MANIFEST_FILE))
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Location of a root import inside the vendor root.
pub fn package_dir(vendor_root: &Path, name: &str) -> PathBuf {
    vendor_root.join(name)
}

/// Location of a nested import inside a vendored package.
pub fn nested_dir(package_dir: &Path, name: &str) -> PathBuf {
    package_dir.join(NESTED_VENDOR_DIR).join(name)
}
