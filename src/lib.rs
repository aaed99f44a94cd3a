//! # rvend - recursive vendor synchronizer
//!
//! rvend fills in the nested dependencies of vendored packages. Each package
//! already vendored at `<vendor root>/<name>` may ship its own `rvend.toml`;
//! rvend reads it and fetches every import it declares into that package's
//! private `vendor/` directory, without the root project knowing the full
//! dependency graph.
//!
//! ## Quick Start
//!
//! ```bash
//! # Fetch nested dependencies of everything under ./vendor
//! rvend sync
//!
//! # See which vendored packages declare dependencies
//! rvend status
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Manifest parsing (`rvend.toml`)
//! - [`deps`] - Fetching, vendor layout and the recursive walk
//! - [`report`] - Status reporting

/// Manifest parsing (`rvend.toml`).
pub mod config;

/// Dependency fetching, vendor layout and synchronization.
pub mod deps;

/// Informational and warning channels.
pub mod report;

/// Vendored package status.
pub mod status;

/// Dependency tree visualization.
pub mod tree;
