//! Integration tests for the recursive walk.
//!
//! Manifests are real `rvend.toml` files in temp directories; the fetcher is
//! a recording fake so no network or git is involved.

use anyhow::Result;
use rvend::config::{Config, Import, MANIFEST_FILE, ManifestLoader, TomlManifest};
use rvend::deps::{Fetcher, SyncOptions, Syncer};
use rvend::report::{Event, Recorder};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Default)]
struct RecordingFetcher {
    fail: HashSet<String>,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl RecordingFetcher {
    fn failing(names: &[&str]) -> Self {
        Self {
            fail: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }

    fn names(&self) -> Vec<String> {
        self.calls().into_iter().map(|(name, _)| name).collect()
    }
}

impl Fetcher for RecordingFetcher {
    fn fetch(&self, import: &Import, target: &Path) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((import.name.clone(), target.to_path_buf()));
        if self.fail.contains(&import.name) {
            anyhow::bail!("remote for {} unreachable", import.name);
        }
        fs::write(target.join("fetched"), &import.name)?;
        Ok(())
    }
}

/// Counts manifest loads, delegating to the real loader.
#[derive(Default)]
struct CountingLoader {
    loads: Mutex<Vec<PathBuf>>,
}

impl ManifestLoader for CountingLoader {
    fn load(&self, dir: &Path) -> Result<Config> {
        self.loads.lock().unwrap().push(dir.to_path_buf());
        TomlManifest.load(dir)
    }
}

fn manifest_with(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| format!("[[import]]\nname = \"{n}\"\n"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn write_manifest(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(MANIFEST_FILE), manifest_with(names)).unwrap();
}

fn root_config(names: &[&str]) -> Config {
    Config::parse(&manifest_with(names)).unwrap()
}

#[test]
fn test_every_root_import_is_synchronized_once() {
    let tmp = tempfile::tempdir().unwrap();
    let vendor = tmp.path().join("vendor");
    write_manifest(&vendor.join("b"), &["x"]);

    let loader = CountingLoader::default();
    let fetcher = RecordingFetcher::failing(&["x"]);
    let rec = Recorder::new();
    Syncer::new(&loader, &fetcher, &rec).recurse(&root_config(&["a", "b", "c"]), &vendor);

    let loads = loader.loads.lock().unwrap().clone();
    assert_eq!(
        loads,
        vec![vendor.join("a"), vendor.join("b"), vendor.join("c")]
    );
}

#[test]
fn test_missing_manifest_does_not_stop_siblings() {
    let tmp = tempfile::tempdir().unwrap();
    let vendor = tmp.path().join("vendor");
    fs::create_dir_all(vendor.join("a")).unwrap();
    write_manifest(&vendor.join("b"), &["x"]);

    let fetcher = RecordingFetcher::default();
    let rec = Recorder::new();
    Syncer::new(&TomlManifest, &fetcher, &rec).recurse(&root_config(&["a", "b"]), &vendor);

    assert_eq!(
        fetcher.calls(),
        vec![("x".to_string(), vendor.join("b").join("vendor").join("x"))]
    );
    assert!(!vendor.join("a").join("vendor").exists());

    let warnings = rec.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("Failed to update dependency a"));
    assert!(warnings[0].contains(MANIFEST_FILE));
}

#[test]
fn test_malformed_manifest_fetches_nothing_for_that_package() {
    let tmp = tempfile::tempdir().unwrap();
    let vendor = tmp.path().join("vendor");
    fs::create_dir_all(vendor.join("broken")).unwrap();
    fs::write(vendor.join("broken").join(MANIFEST_FILE), "[[import]\nname =").unwrap();
    write_manifest(&vendor.join("ok"), &["y"]);

    let fetcher = RecordingFetcher::default();
    let rec = Recorder::new();
    Syncer::new(&TomlManifest, &fetcher, &rec).recurse(&root_config(&["broken", "ok"]), &vendor);

    assert_eq!(fetcher.names(), vec!["y".to_string()]);
    assert!(rec.warnings()[0].contains("Failed to parse"));
}

#[test]
fn test_fetch_failure_continues_with_later_imports() {
    let tmp = tempfile::tempdir().unwrap();
    let pkg = tmp.path().join("p");
    write_manifest(&pkg, &["x", "y", "z"]);

    let fetcher = RecordingFetcher::failing(&["x"]);
    let rec = Recorder::new();
    let summary = Syncer::new(&TomlManifest, &fetcher, &rec)
        .sync_package(&pkg)
        .unwrap();

    assert_eq!(fetcher.names(), vec!["x", "y", "z"]);
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(rec.warnings().len(), 1);
    assert!(rec.warnings()[0].starts_with("Skipped getting x"));
    assert!(pkg.join("vendor").join("z").join("fetched").exists());
}

#[test]
fn test_vendor_dir_failure_skips_only_that_import() {
    let tmp = tempfile::tempdir().unwrap();
    let pkg = tmp.path().join("p");
    write_manifest(&pkg, &["x", "y"]);
    fs::create_dir_all(pkg.join("vendor")).unwrap();
    fs::write(pkg.join("vendor").join("x"), "squatter").unwrap();

    let fetcher = RecordingFetcher::default();
    let rec = Recorder::new();
    let summary = Syncer::new(&TomlManifest, &fetcher, &rec)
        .sync_package(&pkg)
        .unwrap();

    assert_eq!(fetcher.names(), vec!["y".to_string()]);
    assert_eq!(summary.skipped, 1);
    let warnings = rec.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("Skipped getting x (vendor/ error)"));
}

#[test]
fn test_empty_root_only_reports() {
    let tmp = tempfile::tempdir().unwrap();
    let vendor = tmp.path().join("vendor");

    let fetcher = RecordingFetcher::default();
    let rec = Recorder::new();
    Syncer::new(&TomlManifest, &fetcher, &rec).recurse(&Config::default(), &vendor);

    assert_eq!(
        rec.events(),
        vec![
            Event::Info("Checking dependencies for updates.".to_string()),
            Event::Info("No imports.".to_string()),
        ]
    );
    assert!(fetcher.calls().is_empty());
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn test_resync_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let vendor = tmp.path().join("vendor");
    write_manifest(&vendor.join("a"), &["x"]);
    let config = root_config(&["a"]);

    let fetcher = RecordingFetcher::default();
    let rec = Recorder::new();
    let syncer = Syncer::new(&TomlManifest, &fetcher, &rec);
    syncer.recurse(&config, &vendor);
    syncer.recurse(&config, &vendor);

    assert_eq!(fetcher.names(), vec!["x", "x"]);
    assert!(rec.warnings().is_empty());
}

#[test]
fn test_nested_vendor_ignores_root_override() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = root_config(&["a"]);
    config.package.vendor_dir = Some("third_party".to_string());
    let vendor = config.vendor_root(tmp.path(), None);
    write_manifest(&vendor.join("a"), &["x"]);

    let fetcher = RecordingFetcher::default();
    let rec = Recorder::new();
    Syncer::new(&TomlManifest, &fetcher, &rec).recurse(&config, &vendor);

    assert_eq!(
        fetcher.calls()[0].1,
        tmp.path().join("third_party").join("a").join("vendor").join("x")
    );
}

#[test]
fn test_parallel_walk_reports_in_declaration_order() {
    let names = ["a", "b", "c", "d", "e", "f"];
    let run = |jobs: usize| {
        let tmp = tempfile::tempdir().unwrap();
        let vendor = tmp.path().join("vendor");
        for (i, name) in names.iter().enumerate() {
            if i % 3 != 0 {
                write_manifest(&vendor.join(name), &["x", "y"]);
            }
        }
        let fetcher = RecordingFetcher::failing(&["y"]);
        let rec = Recorder::new();
        Syncer::new(&TomlManifest, &fetcher, &rec)
            .with_options(SyncOptions { jobs })
            .recurse(&root_config(&names), &vendor);

        // Paths differ per temp dir; compare with the vendor root stripped.
        let prefix = vendor.display().to_string();
        let events: Vec<Event> = rec
            .events()
            .into_iter()
            .map(|e| match e {
                Event::Info(m) => Event::Info(m.replace(&prefix, "<vendor>")),
                Event::Warn(m) => Event::Warn(m.replace(&prefix, "<vendor>")),
            })
            .collect();
        (events, fetcher.calls().len())
    };

    let (sequential, seq_calls) = run(1);
    let (parallel, par_calls) = run(4);
    assert_eq!(sequential, parallel);
    assert_eq!(seq_calls, par_calls);
    assert_eq!(seq_calls, 8);
}

/// Fails the test if two fetches ever target the same directory at once.
#[derive(Default)]
struct InFlightFetcher {
    in_flight: Mutex<HashSet<PathBuf>>,
    collided: Mutex<bool>,
    calls: Mutex<usize>,
}

impl Fetcher for InFlightFetcher {
    fn fetch(&self, _import: &Import, target: &Path) -> Result<()> {
        if !self.in_flight.lock().unwrap().insert(target.to_path_buf()) {
            *self.collided.lock().unwrap() = true;
        }
        std::thread::sleep(std::time::Duration::from_millis(30));
        self.in_flight.lock().unwrap().remove(target);
        *self.calls.lock().unwrap() += 1;
        Ok(())
    }
}

#[test]
fn test_parallel_walk_never_shares_a_target() {
    let tmp = tempfile::tempdir().unwrap();
    let vendor = tmp.path().join("vendor");
    write_manifest(&vendor.join("a"), &["x"]);
    write_manifest(&vendor.join("a").join("vendor").join("x"), &["y"]);
    write_manifest(&vendor.join("b"), &["x"]);

    let fetcher = InFlightFetcher::default();
    let rec = Recorder::new();
    Syncer::new(&TomlManifest, &fetcher, &rec)
        .with_options(SyncOptions { jobs: 4 })
        .recurse(&root_config(&["a", "a", "a/vendor/x", "b"]), &vendor);

    assert!(!*fetcher.collided.lock().unwrap());
    assert_eq!(*fetcher.calls.lock().unwrap(), 4);
    assert!(rec.warnings().is_empty());
}
