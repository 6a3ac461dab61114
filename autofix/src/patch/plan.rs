//! Fallback plan for runs where no patch could be produced.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, instrument};

use crate::core::types::FallbackPlan;
use crate::patch::candidates::find_candidates;

/// Gather candidate files and their contents for out-of-band analysis.
///
/// Fails when the repository has no candidate source files.
#[instrument(skip_all, fields(repo = %repo_dir.display()))]
pub fn generate_plan(repo_dir: &Path, goal: &str, baseline_output: &str) -> Result<FallbackPlan> {
    let files = find_candidates(repo_dir, goal);
    if files.is_empty() {
        bail!("no candidate source files found in {}", repo_dir.display());
    }

    let mut file_contents = BTreeMap::new();
    for file in &files {
        let path = repo_dir.join(file);
        let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        file_contents.insert(file.clone(), String::from_utf8_lossy(&bytes).into_owned());
    }
    debug!(count = files.len(), "fallback plan assembled");

    Ok(FallbackPlan {
        files,
        file_contents,
        test_output: baseline_output.to_string(),
        goal: goal.to_string(),
    })
}
