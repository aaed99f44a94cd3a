//! Dependency tree visualization.
//!
//! `rvend tree` prints the root imports and, one level down, the imports each
//! vendored package declares in its own manifest.
//!
//! ## Example Output
//!
//! ```text
//! app
//! ├── github.com/org/net (tag: v1.4.0)
//! │   ├── github.com/org/bytes (branch: main)
//! │   └── github.com/org/log (git: https://github.com/org/log)
//! └── github.com/org/cli (no rvend.toml)
//! ```

use crate::config::{Config, Import, MANIFEST_FILE, ManifestLoader};
use crate::deps::package_dir;
use colored::*;
use std::path::Path;

pub fn print_tree(config: &Config, vendor_root: &Path, loader: &dyn ManifestLoader) {
    for line in tree_lines(config, vendor_root, loader) {
        println!("{}", line);
    }
}

/// Renders the tree, one string per output line.
pub fn tree_lines(config: &Config, vendor_root: &Path, loader: &dyn ManifestLoader) -> Vec<String> {
    let root = config.package.name.as_deref().unwrap_or("(root)");
    let mut lines = vec![root.bold().cyan().to_string()];

    if config.imports.is_empty() {
        lines.push("└── (no imports)".to_string());
        return lines;
    }

    let count = config.imports.len();
    for (i, imp) in config.imports.iter().enumerate() {
        let is_last = i == count - 1;
        let (prefix, indent) = if is_last {
            ("└──", "    ")
        } else {
            ("├──", "│   ")
        };

        let base = package_dir(vendor_root, &imp.name);
        match loader.load(&base) {
            Ok(nested) => {
                lines.push(format!("{} {} ({})", prefix, imp.name.bold(), describe(imp)));
                let nested_count = nested.imports.len();
                for (j, child) in nested.imports.iter().enumerate() {
                    let child_prefix = if j == nested_count - 1 {
                        "└──"
                    } else {
                        "├──"
                    };
                    lines.push(format!(
                        "{}{} {} ({})",
                        indent,
                        child_prefix,
                        child.name,
                        describe(child)
                    ));
                }
            }
            Err(_) => {
                lines.push(format!(
                    "{} {} ({})",
                    prefix,
                    imp.name.bold(),
                    format!("no {}", MANIFEST_FILE).dimmed()
                ));
            }
        }
    }

    lines
}

fn describe(imp: &Import) -> String {
    if let Some(r) = &imp.rev {
        format!("rev: {:.7}", r.dimmed())
    } else if let Some(t) = &imp.tag {
        format!("tag: {}", t.green())
    } else if let Some(b) = &imp.branch {
        format!("branch: {}", b.yellow())
    } else {
        format!("git: {}", imp.remote().dimmed())
    }
}
