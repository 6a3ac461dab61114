//! Shared application state for the HTTP facade.

use std::sync::Arc;

use autofix::BoxFuture;
use autofix::core::types::RunResult;
use autofix::io::reasoning::ReasoningService;
use autofix::io::test_runner::TestRunner;
use autofix::pipeline::Pipeline;
use autofix::publish::Publisher;
use tokio::sync::Mutex;

/// Object-safe view of a pipeline so handlers need no type parameters.
pub trait RunPipeline: Send + Sync {
    fn run<'a>(&'a self, repo: &'a str, goal: &'a str) -> BoxFuture<'a, RunResult>;
}

impl<T, R, P> RunPipeline for Pipeline<T, R, P>
where
    T: TestRunner,
    R: ReasoningService,
    P: Publisher,
{
    fn run<'a>(&'a self, repo: &'a str, goal: &'a str) -> BoxFuture<'a, RunResult> {
        Box::pin(Pipeline::run(self, repo, goal))
    }
}

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<dyn RunPipeline>,
    /// Held for the duration of a run; runs never overlap.
    pub run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(pipeline: Arc<dyn RunPipeline>) -> Self {
        Self {
            pipeline,
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}
