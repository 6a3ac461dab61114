//! Patch selection.
//!
//! [`PatchProvider::provide`] consults the built-in table; when that yields
//! nothing the pipeline calls [`PatchProvider::provide_external`], which asks
//! the reasoning service and validates its reply. Neither path ever fails:
//! every problem is logged and reported as `None`.

pub mod builtin;
pub mod candidates;
pub mod external;
pub mod plan;

use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::core::types::Patch;
use crate::io::reasoning::ReasoningService;
use crate::patch::candidates::find_candidates;
use crate::patch::external::{render_prompt, resolve_proposal, validate_reply};

pub use plan::generate_plan;

/// Deadline for one reasoning round trip.
pub const EXTERNAL_PATCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PatchProvider<R> {
    reasoning: Option<R>,
}

impl<R: ReasoningService> PatchProvider<R> {
    /// `None` disables the external path.
    pub fn new(reasoning: Option<R>) -> Self {
        Self { reasoning }
    }

    pub fn has_reasoning(&self) -> bool {
        self.reasoning.is_some()
    }

    /// Built-in fix for `goal`, validated against the files in `repo_dir`.
    ///
    /// A built-in whose file or fragment no longer matches the repository is
    /// skipped.
    #[instrument(skip_all, fields(repo = %repo_dir.display()))]
    pub fn provide(&self, repo_dir: &Path, goal: &str, _baseline_output: &str) -> Option<Patch> {
        let fix = builtin::lookup(goal)?;
        match resolve_proposal(repo_dir, fix.to_proposal()) {
            Ok(patch) => {
                info!(marker = fix.marker, file = fix.file, "built-in fix selected");
                Some(patch)
            }
            Err(rejection) => {
                warn!(marker = fix.marker, %rejection, "built-in fix does not match repository");
                None
            }
        }
    }

    /// Ask the reasoning service for a patch and validate the reply.
    #[instrument(skip_all, fields(repo = %repo_dir.display()))]
    pub async fn provide_external(
        &self,
        repo_dir: &Path,
        goal: &str,
        test_output: &str,
    ) -> Option<Patch> {
        let Some(reasoning) = self.reasoning.as_ref() else {
            debug!("no reasoning service configured");
            return None;
        };

        let Some(target) = find_candidates(repo_dir, goal).into_iter().next() else {
            warn!("no candidate file to analyze");
            return None;
        };
        let content = match fs::read_to_string(repo_dir.join(&target)) {
            Ok(content) => content,
            Err(err) => {
                warn!(file = %target, error = %err, "read analysis target");
                return None;
            }
        };
        let prompt = match render_prompt(goal, &target, &content, test_output) {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!(error = %err, "render patch prompt");
                return None;
            }
        };

        debug!(file = %target, "requesting external patch");
        let call = tokio::time::timeout(EXTERNAL_PATCH_TIMEOUT, reasoning.complete(&prompt));
        let reply = match call.await {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                warn!(error = %format!("{err:#}"), "reasoning service call failed");
                return None;
            }
            Err(_) => {
                warn!(
                    timeout_secs = EXTERNAL_PATCH_TIMEOUT.as_secs(),
                    "reasoning service timed out"
                );
                return None;
            }
        };

        match validate_reply(repo_dir, &reply) {
            Ok(patch) => {
                info!(file = %patch.target_file.display(), "external patch accepted");
                Some(patch)
            }
            Err(rejection) => {
                warn!(%rejection, "external patch rejected");
                None
            }
        }
    }
}
