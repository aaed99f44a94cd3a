//! # rvend CLI Entry Point
//!
//! Parses CLI arguments using clap and routes commands to the library.
//!
//! ## Commands
//!
//! - `sync` - Fetch nested dependencies of every vendored root import
//! - `status` - Show which vendored packages ship a manifest
//! - `tree` - Show root imports and the imports they declare
//! - `completions` - Print a shell completion script

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::path::{Path, PathBuf};

use rvend::config::{self, Config, MANIFEST_FILE, TomlManifest};
use rvend::deps::{GitFetcher, SyncOptions, Syncer};
use rvend::report::ConsoleReporter;
use rvend::status;
use rvend::tree;

#[derive(Parser)]
#[command(name = "rvend")]
#[command(about = "Recursive vendor synchronizer", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ProjectArgs {
    /// Directory containing the root rvend.toml
    #[arg(long, default_value = ".")]
    manifest: PathBuf,
    /// Root vendor directory name, overriding [package].vendor_dir
    #[arg(long)]
    vendor_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the dependencies each vendored package declares
    Sync {
        #[command(flatten)]
        project: ProjectArgs,
        /// Number of vendored packages synchronized at once
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,
        /// Only print warnings
        #[arg(short, long)]
        quiet: bool,
        /// Disable download spinners
        #[arg(long)]
        no_progress: bool,
    },
    /// Show which vendored packages declare their own dependencies
    Status {
        #[command(flatten)]
        project: ProjectArgs,
    },
    /// Show root imports and the imports each vendored package declares
    Tree {
        #[command(flatten)]
        project: ProjectArgs,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Sync {
            project,
            jobs,
            quiet,
            no_progress,
        } => {
            let (config, vendor_root) = load_project(project)?;
            let reporter = ConsoleReporter::new(*quiet);
            // Spinners interleave badly with buffered parallel output.
            let fetcher = GitFetcher::new(!*no_progress && !*quiet && *jobs <= 1);
            let options = SyncOptions {
                jobs: (*jobs).max(1),
            };
            Syncer::new(&TomlManifest, &fetcher, &reporter)
                .with_options(options)
                .recurse(&config, &vendor_root);
            if !*quiet {
                println!("{} Sync complete.", "✓".green());
            }
            Ok(())
        }
        Commands::Status { project } => {
            let (config, vendor_root) = load_project(project)?;
            status::print_status(&config, &vendor_root);
            Ok(())
        }
        Commands::Tree { project } => {
            let (config, vendor_root) = load_project(project)?;
            tree::print_tree(&config, &vendor_root, &TomlManifest);
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    }
}

fn load_project(project: &ProjectArgs) -> Result<(Config, PathBuf)> {
    let config = load_root_config(&project.manifest)?;
    let vendor_root = config.vendor_root(&project.manifest, project.vendor_dir.as_deref());
    Ok((config, vendor_root))
}

fn load_root_config(dir: &Path) -> Result<Config> {
    if !config::manifest_path(dir).exists() {
        return Err(anyhow::anyhow!(
            "{} not found in {}.\n\n\
            💡 Tip: Run rvend from your project root or pass --manifest <dir>.",
            MANIFEST_FILE,
            dir.display()
        ));
    }
    config::load_manifest(dir).context("Root manifest is invalid")
}
