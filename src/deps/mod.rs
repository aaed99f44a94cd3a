//! Dependency fetching and vendoring.
//!
//! - **Fetching**: retrieve a dependency from git into a directory
//! - **Vendoring**: vendor tree layout, directory creation, manifest checks
//! - **Synchronization**: the recursive walk over vendored packages
//!
//! ## Commands
//!
//! - `rvend sync` - Fetch the nested dependencies of every vendored package
//! - `rvend status` - Show which vendored packages ship their own manifest

mod fetch;
mod sync;
mod vendor;

pub use fetch::{Fetcher, GitFetcher};
pub use sync::{ImportOutcome, PackageSummary, SyncOptions, Syncer};
pub use vendor::{ensure_dir, has_own_manifest, nested_dir, package_dir};
