//! Records passed between pipeline components.
//!
//! [`RunResult`] is the externally observable outcome of a run. Its JSON form
//! (a `status` tag plus camelCase fields) is consumed by the CLI `--json` mode
//! and the HTTP facade, so field names must stay stable.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Output recorded when discovery finds no test command.
pub const NO_TEST_COMMAND: &str = "No test command found";

/// A single-file, exact-fragment text substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    /// Absolute path of the file to edit.
    pub target_file: PathBuf,
    /// Exact text whose first occurrence is replaced.
    pub old_fragment: String,
    /// Replacement text.
    pub new_fragment: String,
    /// Human-readable description; used as commit message and PR title suffix.
    pub summary: String,
}

/// Outcome of one test invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub success: bool,
    /// Captured stdout followed by stderr.
    pub output: String,
    /// Invocation used, or `None` when no test command was discovered.
    pub command: Option<String>,
}

impl TestResult {
    pub fn no_command() -> Self {
        Self {
            success: false,
            output: NO_TEST_COMMAND.to_string(),
            command: None,
        }
    }
}

/// Hosting coordinates parsed from the repository remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub owner: String,
    pub name: String,
}

/// Pull-request payload, sent to the hosting API or handed back for
/// out-of-band creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrData {
    pub owner: String,
    pub repo: String,
    pub head: String,
    pub base: String,
    pub title: String,
    pub body: String,
}

/// Result of the best-effort pull-request step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestOutcome {
    pub payload: PrData,
    pub url: Option<String>,
    pub number: Option<u64>,
    pub created_via_api: bool,
}

impl PullRequestOutcome {
    /// Payload only; the PR must be created out of band.
    pub fn payload_only(payload: PrData) -> Self {
        Self {
            payload,
            url: None,
            number: None,
            created_via_api: false,
        }
    }
}

/// Diagnostic bundle produced when no patch is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackPlan {
    /// Candidate files, relative to the repository root.
    pub files: Vec<String>,
    /// Current content of each candidate file.
    pub file_contents: BTreeMap<String, String>,
    /// Baseline test output.
    pub test_output: String,
    pub goal: String,
}

/// Terminal status of a run. Exactly one is produced per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "status",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum RunResult {
    Success {
        pr_data: PrData,
        pr_url: Option<String>,
        pr_number: Option<u64>,
        created_via_api: bool,
        branch_name: String,
        repo_info: RepoInfo,
    },
    VerifyFailed {
        output: String,
    },
    NeedsLlm {
        plan: FallbackPlan,
        repo_path: PathBuf,
        work_dir: PathBuf,
        baseline_result: TestResult,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
    },
}

impl RunResult {
    /// Build an `error` result from an error chain: the outermost context is the
    /// message, the remaining chain (if any) is the cause.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let cause = err
            .chain()
            .skip(1)
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        Self::Error {
            message: err.to_string(),
            cause: (!cause.is_empty()).then(|| cause.join(": ")),
        }
    }

    /// Wire name of the status tag.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::VerifyFailed { .. } => "verify_failed",
            Self::NeedsLlm { .. } => "needs_llm",
            Self::Error { .. } => "error",
        }
    }
}
