//! Recursive vendor synchronization.
//!
//! The walker visits every root import at `<vendor root>/<name>`, reads the
//! manifest that package ships, and fetches each import it declares into
//! `<vendor root>/<name>/vendor/<nested>`. One manifest level is expanded per
//! walk.
//!
//! Failures never stop the walk: a package whose manifest cannot be loaded is
//! reported and passed over, and a nested import whose directory or fetch
//! fails is reported and skipped while its siblings are still attempted.

use super::fetch::Fetcher;
use super::vendor::{ensure_dir, has_own_manifest, nested_dir, package_dir};
use crate::config::{Config, Import, MANIFEST_FILE, ManifestLoader};
use crate::report::{Recorder, Reporter};
use anyhow::Result;
use rayon::prelude::*;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Root packages synchronized at once. `1` walks strictly in order.
    pub jobs: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { jobs: 1 }
    }
}

/// Result of one nested import attempt.
#[derive(Debug)]
pub enum ImportOutcome {
    Fetched,
    VendorDirFailed(anyhow::Error),
    FetchFailed(anyhow::Error),
}

/// Per-package tally. Failed attempts are counted, never returned as errors.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PackageSummary {
    pub fetched: usize,
    pub skipped: usize,
}

pub struct Syncer<'a> {
    loader: &'a dyn ManifestLoader,
    fetcher: &'a dyn Fetcher,
    reporter: &'a dyn Reporter,
    options: SyncOptions,
}

impl<'a> Syncer<'a> {
    pub fn new(
        loader: &'a dyn ManifestLoader,
        fetcher: &'a dyn Fetcher,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            loader,
            fetcher,
            reporter,
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Synchronizes the nested dependencies of every import in `config`.
    ///
    /// Every import is visited exactly once, in declaration order, whatever
    /// happens to the others.
    pub fn recurse(&self, config: &Config, vendor_root: &Path) {
        self.reporter.info("Checking dependencies for updates.");

        if config.imports.is_empty() {
            self.reporter.info("No imports.");
            return;
        }

        let results = if self.options.jobs > 1 && config.imports.len() > 1 {
            self.walk_parallel(&config.imports, vendor_root)
        } else {
            self.walk_sequential(&config.imports, vendor_root)
        };
        self.report_summary(&results);
    }

    /// Loads the manifest in `dir` and fetches each import it declares into
    /// `dir/vendor/<name>`.
    ///
    /// Only a manifest that cannot be loaded is an error; nothing is fetched
    /// in that case.
    pub fn sync_package(&self, dir: &Path) -> Result<PackageSummary> {
        self.sync_package_with(dir, self.reporter)
    }

    fn walk_sequential(
        &self,
        imports: &[Import],
        vendor_root: &Path,
    ) -> Vec<Option<PackageSummary>> {
        imports
            .iter()
            .map(|imp| self.visit(imp, vendor_root, self.reporter))
            .collect()
    }

    /// Runs packages on a bounded pool, buffering each package's reports and
    /// replaying them in declaration order afterwards.
    ///
    /// Imports whose vendor directories overlap run in the same task, in
    /// declaration order, so no two tasks ever write into one target.
    fn walk_parallel(
        &self,
        imports: &[Import],
        vendor_root: &Path,
    ) -> Vec<Option<PackageSummary>> {
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs)
            .build()
        {
            Ok(pool) => pool,
            Err(err) => {
                self.reporter
                    .warn(&format!("Falling back to sequential sync: {}", err));
                return self.walk_sequential(imports, vendor_root);
            }
        };

        let groups = overlapping_groups(imports);
        let grouped: Vec<Vec<(usize, Recorder, Option<PackageSummary>)>> = pool.install(|| {
            groups
                .par_iter()
                .map(|group| {
                    group
                        .iter()
                        .map(|&i| {
                            let recorder = Recorder::new();
                            let summary = self.visit(&imports[i], vendor_root, &recorder);
                            (i, recorder, summary)
                        })
                        .collect()
                })
                .collect()
        });

        let mut buffered: Vec<_> = grouped.into_iter().flatten().collect();
        buffered.sort_by_key(|(i, _, _)| *i);
        buffered
            .into_iter()
            .map(|(_, recorder, summary)| {
                recorder.replay(self.reporter);
                summary
            })
            .collect()
    }

    fn visit(
        &self,
        imp: &Import,
        vendor_root: &Path,
        reporter: &dyn Reporter,
    ) -> Option<PackageSummary> {
        let base = package_dir(vendor_root, &imp.name);
        reporter.info(&format!(
            "Looking in {} for a {} file.",
            imp.name, MANIFEST_FILE
        ));
        if has_own_manifest(&base) {
            reporter.info(&format!("Package {} declares its own dependencies.", imp.name));
        } else {
            reporter.info(&format!("Package {} has no {}.", imp.name, MANIFEST_FILE));
        }

        // Synchronization runs whether or not the manifest was found; a
        // missing one surfaces as a load failure below.
        reporter.info(&format!("Synchronizing nested dependencies of {}", imp.name));
        match self.sync_package_with(&base, reporter) {
            Ok(summary) => Some(summary),
            Err(err) => {
                reporter.warn(&format!(
                    "Failed to update dependency {}: {:#}",
                    imp.name, err
                ));
                None
            }
        }
    }

    fn sync_package_with(&self, dir: &Path, reporter: &dyn Reporter) -> Result<PackageSummary> {
        let config = self.loader.load(dir)?;
        let mut summary = PackageSummary::default();

        for imp in &config.imports {
            reporter.info(&format!(
                "Importing {} to project {}",
                imp.name,
                dir.display()
            ));
            match self.fetch_nested(dir, imp) {
                ImportOutcome::Fetched => summary.fetched += 1,
                ImportOutcome::VendorDirFailed(err) => {
                    reporter.warn(&format!(
                        "Skipped getting {} (vendor/ error): {:#}",
                        imp.name, err
                    ));
                    summary.skipped += 1;
                }
                ImportOutcome::FetchFailed(err) => {
                    reporter.warn(&format!("Skipped getting {}: {:#}", imp.name, err));
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }

    fn fetch_nested(&self, dir: &Path, imp: &Import) -> ImportOutcome {
        let target = nested_dir(dir, &imp.name);
        if let Err(err) = ensure_dir(&target) {
            return ImportOutcome::VendorDirFailed(err);
        }
        match self.fetcher.fetch(imp, &target) {
            Ok(()) => ImportOutcome::Fetched,
            Err(err) => ImportOutcome::FetchFailed(err),
        }
    }

    fn report_summary(&self, results: &[Option<PackageSummary>]) {
        let synced: Vec<_> = results.iter().flatten().collect();
        let fetched: usize = synced.iter().map(|s| s.fetched).sum();
        let skipped: usize = synced.iter().map(|s| s.skipped).sum();
        self.reporter.info(&format!(
            "Synchronized {} of {} packages ({} nested imports fetched, {} skipped).",
            synced.len(),
            results.len(),
            fetched,
            skipped
        ));
    }
}

/// Partitions import indices so that imports sharing a vendor directory, or
/// nested inside another's, land in the same group. Groups and their members
/// keep declaration order.
fn overlapping_groups(imports: &[Import]) -> Vec<Vec<usize>> {
    let mut label: Vec<usize> = (0..imports.len()).collect();
    for j in 0..imports.len() {
        for i in 0..j {
            if !paths_overlap(&imports[i].name, &imports[j].name) {
                continue;
            }
            let (keep, drop) = (label[i].min(label[j]), label[i].max(label[j]));
            for l in label.iter_mut().filter(|l| **l == drop) {
                *l = keep;
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of_label: Vec<Option<usize>> = vec![None; imports.len()];
    for (i, &l) in label.iter().enumerate() {
        match group_of_label[l] {
            Some(g) => groups[g].push(i),
            None => {
                group_of_label[l] = Some(groups.len());
                groups.push(vec![i]);
            }
        }
    }
    groups
}

fn paths_overlap(a: &str, b: &str) -> bool {
    let (a, b) = (Path::new(a), Path::new(b));
    a.starts_with(b) || b.starts_with(a)
}
