//! Remote mutations: branch, commit, push, and the pull request.
//!
//! The pipeline only reaches a [`Publisher`] after verification has passed.
//! Every method except [`Publisher::open_pull_request`] may fail; that one is
//! best effort and reports the payload when the API call does not succeed.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, instrument, warn};

use crate::BoxFuture;
use crate::core::branch::branch_name_now;
use crate::core::remote::parse_remote_url;
use crate::core::types::{PrData, PullRequestOutcome, RepoInfo};
use crate::io::config::GitHubConfig;
use crate::io::git::Git;
use crate::io::github::{GitHubClient, PullRequestError};

pub trait Publisher: Send + Sync {
    /// Create and check out a fresh `fix/...` branch; returns its name.
    fn create_branch(&self, repo_dir: &Path) -> Result<String>;
    /// Stage everything and commit. Nothing to commit is an error.
    fn commit(&self, repo_dir: &Path, message: &str) -> Result<()>;
    fn push(&self, repo_dir: &Path, branch: &str) -> Result<()>;
    fn repo_info(&self, repo_dir: &Path) -> Result<RepoInfo>;
    /// Never fails.
    fn open_pull_request<'a>(
        &'a self,
        repo: &'a RepoInfo,
        branch: &'a str,
        title: &'a str,
        body: &'a str,
    ) -> BoxFuture<'a, PullRequestOutcome>;
}

/// Publishes with the `git` CLI and the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitPublisher {
    github: GitHubClient,
    remote: String,
    base_branch: String,
}

impl GitPublisher {
    pub fn from_config(cfg: &GitHubConfig) -> Result<Self> {
        let github = GitHubClient::from_config(cfg).context("build GitHub client")?;
        if !github.has_token() {
            info!("no GitHub token configured, pull requests will be returned as payloads");
        }
        Ok(Self {
            github,
            remote: cfg.remote.clone(),
            base_branch: cfg.base_branch.clone(),
        })
    }

    fn payload(&self, repo: &RepoInfo, branch: &str, title: &str, body: &str) -> PrData {
        PrData {
            owner: repo.owner.clone(),
            repo: repo.name.clone(),
            head: branch.to_string(),
            base: self.base_branch.clone(),
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    async fn create_pull_request(&self, payload: PrData) -> PullRequestOutcome {
        match self.github.create_pull_request(&payload).await {
            Ok(created) => {
                info!(url = %created.url, number = created.number, "pull request created");
                PullRequestOutcome {
                    payload,
                    url: Some(created.url),
                    number: Some(created.number),
                    created_via_api: true,
                }
            }
            Err(PullRequestError::MissingToken) => {
                info!("no GitHub token; returning pull request payload");
                PullRequestOutcome::payload_only(payload)
            }
            Err(err) => {
                warn!(error = %err, "pull request creation failed; returning payload");
                PullRequestOutcome::payload_only(payload)
            }
        }
    }
}

impl Publisher for GitPublisher {
    #[instrument(skip_all, fields(repo = %repo_dir.display()))]
    fn create_branch(&self, repo_dir: &Path) -> Result<String> {
        let branch = branch_name_now();
        Git::new(repo_dir)
            .checkout_new_branch(&branch)
            .with_context(|| format!("create branch {branch}"))?;
        Ok(branch)
    }

    #[instrument(skip_all, fields(repo = %repo_dir.display()))]
    fn commit(&self, repo_dir: &Path, message: &str) -> Result<()> {
        let git = Git::new(repo_dir);
        git.add_all().context("stage changes")?;
        if !git.commit_staged(message).context("commit changes")? {
            bail!("nothing to commit");
        }
        Ok(())
    }

    #[instrument(skip_all, fields(repo = %repo_dir.display(), branch))]
    fn push(&self, repo_dir: &Path, branch: &str) -> Result<()> {
        Git::new(repo_dir)
            .push_upstream(&self.remote, branch)
            .with_context(|| format!("push {branch} to {}", self.remote))
    }

    fn repo_info(&self, repo_dir: &Path) -> Result<RepoInfo> {
        let url = Git::new(repo_dir)
            .remote_url(&self.remote)
            .with_context(|| format!("read url of remote {}", self.remote))?;
        Ok(parse_remote_url(&url)?)
    }

    fn open_pull_request<'a>(
        &'a self,
        repo: &'a RepoInfo,
        branch: &'a str,
        title: &'a str,
        body: &'a str,
    ) -> BoxFuture<'a, PullRequestOutcome> {
        let payload = self.payload(repo, branch, title, body);
        Box::pin(self.create_pull_request(payload))
    }
}
