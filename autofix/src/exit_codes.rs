//! Stable exit codes for the `autofix` CLI.

use crate::core::types::RunResult;

/// Tests passed after the patch and the branch was published.
pub const OK: i32 = 0;
/// The run hit an environment error (clone, git, apply, config, ...).
pub const ERROR: i32 = 1;
/// The patch was applied but the tests still fail.
pub const VERIFY_FAILED: i32 = 2;
/// No patch was available; a fallback plan was produced instead.
pub const NEEDS_LLM: i32 = 3;

/// Map a terminal status to its exit code.
pub fn for_result(result: &RunResult) -> i32 {
    match result {
        RunResult::Success { .. } => OK,
        RunResult::VerifyFailed { .. } => VERIFY_FAILED,
        RunResult::NeedsLlm { .. } => NEEDS_LLM,
        RunResult::Error { .. } => ERROR,
    }
}
