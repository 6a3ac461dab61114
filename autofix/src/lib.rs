//! Verified single-patch repair pipeline.
//!
//! A run materializes a repository into an isolated workspace, records a
//! baseline test run, applies exactly one text patch, re-runs the tests, and
//! only when they pass pushes a branch and opens a pull request. The crate is
//! split the same way every step is:
//!
//! - **[`core`]**: Pure logic (fragment replacement, remote parsing, branch
//!   naming, report rendering, result types). No I/O.
//! - **[`io`]**: Side-effecting collaborators (filesystem, git, test
//!   processes, HTTP clients). Each sits behind a small trait or struct so
//!   tests can substitute fakes.
//!
//! [`patch`] chooses the patch, [`publish`] performs the remote mutations, and
//! [`pipeline`] sequences everything behind the verification gate.

use std::future::Future;
use std::pin::Pin;

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod patch;
pub mod pipeline;
pub mod publish;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Boxed, sendable future used at the async trait seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
