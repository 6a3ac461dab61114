//! Git adapter.
//!
//! Every call is an argument-list invocation of `git` (no shell), so branch
//! names, commit messages and URLs are passed through verbatim. A non-zero
//! exit becomes an error carrying git's stderr.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

use crate::error::WorkspaceError;

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Full clone of `url` into `dest`. A failed clone carries git's stderr.
    #[instrument(skip_all, fields(url))]
    pub fn clone_into(url: &str, dest: &Path) -> Result<(), WorkspaceError> {
        debug!(dest = %dest.display(), "cloning repository");
        let output = Command::new("git")
            .arg("clone")
            .arg("--")
            .arg(url)
            .arg(dest)
            .output()
            .map_err(|source| WorkspaceError::CloneSpawn {
                url: url.to_string(),
                source,
            })?;
        if !output.status.success() {
            return Err(WorkspaceError::Clone {
                url: url.to_string(),
                diagnostic: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// Create and checkout a new branch at current HEAD.
    #[instrument(skip_all, fields(branch))]
    pub fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        debug!(branch, "creating and checking out new branch");
        self.run_checked(&["checkout", "-b", branch])?;
        Ok(())
    }

    /// Stage all changes, including deletions and untracked files.
    pub fn add_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// True if there is anything staged for commit.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let out = self.run_checked(&["diff", "--cached", "--name-only"])?;
        Ok(!String::from_utf8_lossy(&out.stdout).trim().is_empty())
    }

    /// Commit staged changes with a message.
    ///
    /// If there are no staged changes, this returns Ok(false) and does nothing.
    #[instrument(skip_all)]
    pub fn commit_staged(&self, message: &str) -> Result<bool> {
        if !self.has_staged_changes()? {
            debug!("no staged changes, skipping commit");
            return Ok(false);
        }
        debug!("committing staged changes");
        self.run_checked(&["commit", "-m", message])?;
        Ok(true)
    }

    /// Push `branch` to `remote` and set it as upstream.
    #[instrument(skip_all, fields(remote, branch))]
    pub fn push_upstream(&self, remote: &str, branch: &str) -> Result<()> {
        debug!("pushing branch");
        self.run_checked(&["push", "-u", remote, branch])?;
        Ok(())
    }

    /// Configured (fetch) URL of `remote`.
    pub fn remote_url(&self, remote: &str) -> Result<String> {
        let out = self.run_capture(&["remote", "get-url", remote])?;
        Ok(out.trim().to_string())
    }

    pub(crate) fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    pub(crate) fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}
