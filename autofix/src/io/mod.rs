//! Side-effecting collaborators used by the pipeline.

pub mod apply;
pub mod config;
pub mod git;
pub mod github;
pub mod process;
pub mod reasoning;
pub mod test_runner;
pub mod workspace;
