//! Run orchestration.
//!
//! A run moves through [`Stage`]s strictly in order:
//!
//! ```text
//! Start -> Cloned -> BaselineTested -> Planned -> Applied -> Verified -> Published
//!                                         |                     |
//!                                         v                     v
//!                                   NeedsExternal             Failed
//! ```
//!
//! The transition out of `Applied` is the verification gate: the publisher is
//! only reached when the post-patch test run succeeds. Unexpected failures at
//! any stage end the run with [`RunResult::Error`]. The workspace is deleted
//! only after a successful publish; every other outcome leaves it on disk.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info, instrument};

use crate::core::report::{ReportInputs, pr_title, render_pr_body};
use crate::core::types::{Patch, RunResult, TestResult};
use crate::io::apply::apply_patch;
use crate::io::config::AutofixConfig;
use crate::io::reasoning::{ChatCompletionsClient, ReasoningService};
use crate::io::test_runner::{ManifestTestRunner, TestRunner};
use crate::io::workspace::{Workspace, WorkspaceManager};
use crate::patch::candidates::relative_label;
use crate::patch::{PatchProvider, generate_plan};
use crate::publish::{GitPublisher, Publisher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Cloned,
    BaselineTested,
    Planned,
    Applied,
    Verified,
    Published,
    NeedsExternal,
    Failed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Cloned => "cloned",
            Self::BaselineTested => "baseline_tested",
            Self::Planned => "planned",
            Self::Applied => "applied",
            Self::Verified => "verified",
            Self::Published => "published",
            Self::NeedsExternal => "needs_external",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline wired to the production collaborators.
pub type DefaultPipeline = Pipeline<ManifestTestRunner, ChatCompletionsClient, GitPublisher>;

pub struct Pipeline<T, R, P> {
    workspaces: WorkspaceManager,
    tests: T,
    patches: PatchProvider<R>,
    publisher: P,
}

impl DefaultPipeline {
    pub fn from_config(cfg: &AutofixConfig) -> Result<Self> {
        let patches = PatchProvider::new(ChatCompletionsClient::from_config(&cfg.reasoning)?);
        info!(external_patches = patches.has_reasoning(), "patch sources configured");
        Ok(Self::new(
            WorkspaceManager::new(&cfg.workspace_root),
            ManifestTestRunner::from_config(&cfg.tests),
            patches,
            GitPublisher::from_config(&cfg.github)?,
        ))
    }
}

impl<T, R, P> Pipeline<T, R, P>
where
    T: TestRunner,
    R: ReasoningService,
    P: Publisher,
{
    pub fn new(
        workspaces: WorkspaceManager,
        tests: T,
        patches: PatchProvider<R>,
        publisher: P,
    ) -> Self {
        Self {
            workspaces,
            tests,
            patches,
            publisher,
        }
    }

    /// Run the whole pipeline for one repository and goal.
    ///
    /// Never fails: environment errors become [`RunResult::Error`].
    #[instrument(skip_all, fields(repo = repo_location))]
    pub async fn run(&self, repo_location: &str, goal: &str) -> RunResult {
        transition(Stage::Start);
        match self.execute(repo_location, goal).await {
            Ok(result) => result,
            Err(err) => {
                error!(error = %format!("{err:#}"), "run failed");
                RunResult::from_error(&err)
            }
        }
    }

    async fn execute(&self, repo_location: &str, goal: &str) -> Result<RunResult> {
        let workspace = self
            .workspaces
            .materialize(repo_location)
            .with_context(|| format!("prepare workspace for {repo_location}"))?;
        transition(Stage::Cloned);
        let repo_dir = workspace.repo_dir.as_path();

        let baseline = self.tests.run(repo_dir);
        info!(success = baseline.success, "baseline recorded");
        transition(Stage::BaselineTested);

        let Some(patch) = self.choose_patch(repo_dir, goal, &baseline).await else {
            let plan = generate_plan(repo_dir, goal, &baseline.output)
                .context("generate fallback plan")?;
            transition(Stage::NeedsExternal);
            return Ok(RunResult::NeedsLlm {
                plan,
                repo_path: workspace.repo_dir.clone(),
                work_dir: workspace.root_dir.clone(),
                baseline_result: baseline,
            });
        };
        transition(Stage::Planned);

        apply_patch(&patch).context("apply patch")?;
        transition(Stage::Applied);

        let verify = self.tests.run(repo_dir);
        if !verify.success {
            info!(workspace = %workspace.root_dir.display(), "verification failed; workspace kept");
            transition(Stage::Failed);
            return Ok(RunResult::VerifyFailed {
                output: verify.output,
            });
        }
        transition(Stage::Verified);

        let result = self.publish(&workspace, &patch, &baseline, &verify).await?;
        self.workspaces.teardown(&workspace);
        transition(Stage::Published);
        Ok(result)
    }

    async fn choose_patch(
        &self,
        repo_dir: &Path,
        goal: &str,
        baseline: &TestResult,
    ) -> Option<Patch> {
        if let Some(patch) = self.patches.provide(repo_dir, goal, &baseline.output) {
            return Some(patch);
        }
        self.patches
            .provide_external(repo_dir, goal, &baseline.output)
            .await
    }

    async fn publish(
        &self,
        workspace: &Workspace,
        patch: &Patch,
        baseline: &TestResult,
        verify: &TestResult,
    ) -> Result<RunResult> {
        let repo_dir = workspace.repo_dir.as_path();
        let branch = self.publisher.create_branch(repo_dir)?;
        self.publisher.commit(repo_dir, &patch.summary)?;
        self.publisher.push(repo_dir, &branch)?;
        let repo_info = self.publisher.repo_info(repo_dir)?;

        let file = relative_label(repo_dir, &patch.target_file)
            .unwrap_or_else(|| patch.target_file.display().to_string());
        let title = pr_title(&patch.summary);
        let body = render_pr_body(&ReportInputs {
            summary: &patch.summary,
            file: &file,
            before: &baseline.output,
            after: &verify.output,
        })
        .context("render pull request body")?;

        let outcome = self
            .publisher
            .open_pull_request(&repo_info, &branch, &title, &body)
            .await;

        Ok(RunResult::Success {
            pr_data: outcome.payload,
            pr_url: outcome.url,
            pr_number: outcome.number,
            created_via_api: outcome.created_via_api,
            branch_name: branch,
            repo_info,
        })
    }
}

fn transition(stage: Stage) {
    info!(stage = %stage, "stage");
}
