//! `rvend status`: which vendored packages ship their own manifest.

use crate::config::{Config, MANIFEST_FILE};
use crate::deps::{has_own_manifest, package_dir};
use colored::*;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    /// Not vendored yet.
    Missing,
    /// Vendored, no manifest of its own.
    Plain,
    /// Vendored with its own manifest; `rvend sync` will fetch its imports.
    Managed,
}

pub fn package_states(config: &Config, vendor_root: &Path) -> Vec<(String, PackageState)> {
    config
        .imports
        .iter()
        .map(|imp| {
            let base = package_dir(vendor_root, &imp.name);
            let state = if has_own_manifest(&base) {
                PackageState::Managed
            } else if base.is_dir() {
                PackageState::Plain
            } else {
                PackageState::Missing
            };
            (imp.name.clone(), state)
        })
        .collect()
}

pub fn print_status(config: &Config, vendor_root: &Path) {
    println!("Vendor root: {}", vendor_root.display());
    let states = package_states(config, vendor_root);
    if states.is_empty() {
        println!("{} No imports.", "!".yellow());
        return;
    }
    for (name, state) in states {
        let label = match state {
            PackageState::Managed => format!("{} {}", "✓".green(), MANIFEST_FILE),
            PackageState::Plain => format!("{} no {}", "-".dimmed(), MANIFEST_FILE),
            PackageState::Missing => format!("{} not vendored", "x".red()),
        };
        println!("   {:<40} {}", name, label);
    }
}
