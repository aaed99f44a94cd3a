//! Git retrieval of a single dependency into a target directory.
//!
//! ## Behaviour
//!
//! - Empty or missing target: clone the import's remote into it
//! - Existing checkout: fetch branches and tags from `origin`
//! - `rev` / `tag` / `branch` pins: forced detached checkout of that commit
//! - Anything else already in the target: refuse, leave it untouched

use crate::config::{Import, Pin};
use anyhow::{Context, Result};
use colored::*;

use git2::Repository;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;

/// Materializes an import's source into a directory.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, import: &Import, target: &Path) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GitFetcher {
    /// Show a spinner while cloning.
    pub progress: bool,
}

impl GitFetcher {
    pub fn new(progress: bool) -> Self {
        Self { progress }
    }

    fn open_or_clone(&self, name: &str, url: &str, target: &Path) -> Result<(Repository, bool)> {
        if target.join(".git").exists() {
            let repo = Repository::open(target)
                .with_context(|| format!("Failed to open vendored checkout of '{}'", name))?;
            update_from_origin(&repo, name)?;
            return Ok((repo, false));
        }

        if target.exists() && !is_empty_dir(target)? {
            return Err(anyhow::anyhow!(
                "{} is not empty and is not a git checkout",
                target.display()
            ));
        }

        let pb = self.spinner(format!("Downloading {}...", name));
        match Repository::clone(url, target) {
            Ok(repo) => {
                if let Some(pb) = pb {
                    pb.finish_with_message(format!("{} Downloaded {}", "✓".green(), name));
                }
                Ok((repo, true))
            }
            Err(err) => {
                if let Some(pb) = pb {
                    pb.finish_with_message(format!("{} Failed {}", "x".red(), name));
                }
                Err(clone_failure(name, url, err.message(), target))
            }
        }
    }

    fn spinner(&self, msg: String) -> Option<ProgressBar> {
        if !self.progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.blue} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷"),
        );
        pb.set_message(msg);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    }
}

impl Fetcher for GitFetcher {
    fn fetch(&self, import: &Import, target: &Path) -> Result<()> {
        let vcs = import.vcs_kind();
        if vcs != "git" {
            return Err(anyhow::anyhow!(
                "Unsupported vcs '{}' for '{}' (only git is supported)",
                vcs,
                import.name
            ));
        }

        let url = import.remote();
        let (repo, fresh) = self.open_or_clone(&import.name, &url, target)?;

        match import.pin() {
            Some(pin) => {
                if fresh && matches!(pin, Pin::Tag(_)) {
                    // Clones only follow tags reachable from fetched heads.
                    update_from_origin(&repo, &import.name)?;
                }
                let (oid, checkout_msg) = resolve_pin(&repo, pin)
                    .with_context(|| format!("Cannot pin '{}'", import.name))?;
                checkout_detached(&repo, oid, &checkout_msg)?;
            }
            None if !fresh => fast_forward_head(&repo)?,
            None => {}
        }
        Ok(())
    }
}

/// Builds the error for a failed clone after emptying the target so the next
/// run can clone again. A failed cleanup is part of the message.
fn clone_failure(name: &str, url: &str, reason: &str, target: &Path) -> anyhow::Error {
    let cleanup = if target.exists() {
        clear_dir_contents(target).err()
    } else {
        None
    };
    match cleanup {
        None => anyhow::anyhow!("Failed to clone '{}' from {}: {}", name, url, reason),
        Some(cleanup_err) => anyhow::anyhow!(
            "Failed to clone '{}' from {}: {} (cleanup of {} also failed: {:#})",
            name,
            url,
            reason,
            target.display(),
            cleanup_err
        ),
    }
}

fn update_from_origin(repo: &Repository, name: &str) -> Result<()> {
    let mut remote = repo
        .find_remote("origin")
        .with_context(|| format!("Vendored checkout of '{}' has no origin remote", name))?;
    remote
        .fetch(
            &[
                "+refs/heads/*:refs/remotes/origin/*",
                "+refs/tags/*:refs/tags/*",
            ],
            None,
            None,
        )
        .with_context(|| format!("Failed to fetch updates for '{}'", name))?;
    Ok(())
}

fn resolve_pin(repo: &Repository, pin: Pin<'_>) -> Result<(git2::Oid, String)> {
    match pin {
        Pin::Rev(rev) => {
            let commit = repo
                .revparse_single(rev)
                .and_then(|obj| obj.peel_to_commit())
                .with_context(|| format!("commit {} not found", short_hash(rev)))?;
            Ok((commit.id(), format!("commit {}", short_hash(rev))))
        }
        Pin::Tag(tag) => {
            let refname = format!("refs/tags/{}", tag);
            let commit = repo
                .find_reference(&refname)
                .and_then(|reference| reference.peel_to_commit())
                .with_context(|| format!("tag {} not found", tag))?;
            Ok((commit.id(), format!("tag {}", tag)))
        }
        Pin::Branch(branch) => find_branch_commit(repo, branch)
            .map(|oid| (oid, format!("branch {}", branch)))
            .ok_or_else(|| anyhow::anyhow!("branch {} not found", branch)),
    }
}

fn find_branch_commit(repo: &Repository, branch: &str) -> Option<git2::Oid> {
    // Remote first: after an update the local branch may be behind.
    if let Some(oid) = find_remote_branch(repo, branch) {
        return Some(oid);
    }

    if let Ok(reference) = repo.find_branch(branch, git2::BranchType::Local)
        && let Ok(commit) = reference.get().peel_to_commit()
    {
        return Some(commit.id());
    }

    None
}

/// First seven characters of a revision, cut on a char boundary.
fn short_hash(rev: &str) -> &str {
    rev.char_indices().nth(7).map_or(rev, |(i, _)| &rev[..i])
}

fn checkout_detached(repo: &Repository, oid: git2::Oid, checkout_msg: &str) -> Result<()> {
    let obj = repo.find_object(oid, None)?;
    let mut checkout_opts = git2::build::CheckoutBuilder::new();
    checkout_opts.force();
    repo.checkout_tree(&obj, Some(&mut checkout_opts))
        .with_context(|| format!("Failed to checkout {}", checkout_msg))?;
    repo.set_head_detached(oid)?;
    Ok(())
}

/// Moves the checked-out branch to its `origin` counterpart. Detached heads
/// are left where they are.
fn fast_forward_head(repo: &Repository) -> Result<()> {
    let Ok(head) = repo.head() else {
        return Ok(());
    };
    if !head.is_branch() {
        return Ok(());
    }
    let (Some(refname), Some(branch)) = (head.name(), head.shorthand()) else {
        return Ok(());
    };
    let refname = refname.to_string();
    let Some(oid) = find_remote_branch(repo, branch) else {
        return Ok(());
    };

    let obj = repo.find_object(oid, None)?;
    let mut checkout_opts = git2::build::CheckoutBuilder::new();
    checkout_opts.force();
    repo.checkout_tree(&obj, Some(&mut checkout_opts))
        .context("Failed to update working tree")?;
    repo.find_reference(&refname)?
        .set_target(oid, "rvend: fast-forward")?;
    Ok(())
}

fn find_remote_branch(repo: &Repository, branch: &str) -> Option<git2::Oid> {
    let remote_ref = format!("origin/{}", branch);
    let reference = repo
        .find_branch(&remote_ref, git2::BranchType::Remote)
        .ok()?;
    reference.get().peel_to_commit().ok().map(|c| c.id())
}

fn is_empty_dir(dir: &Path) -> Result<bool> {
    let mut entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    Ok(entries.next().is_none())
}

fn clear_dir_contents(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
