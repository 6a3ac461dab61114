//! HTTP route handlers.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tracing::info;

use autofix::core::types::RunResult;

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/run", post(run))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub repo: String,
    pub goal: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// POST /api/run - run the pipeline once and return its `RunResult`.
///
/// Every terminal status is a 200; only malformed requests are rejected.
async fn run(State(state): State<AppState>, Json(req): Json<RunRequest>) -> Response {
    let repo = req.repo.trim();
    let goal = req.goal.trim();
    if repo.is_empty() || goal.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "repo and goal must be non-empty".to_string(),
            }),
        )
            .into_response();
    }

    let _guard = state.run_lock.lock().await;
    info!(repo, "run started");
    let result: RunResult = state.pipeline.run(repo, goal).await;
    info!(status = result.status(), "run finished");
    Json(result).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use autofix::BoxFuture;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::state::RunPipeline;

    struct FixedPipeline {
        result: RunResult,
        calls: AtomicUsize,
    }

    impl RunPipeline for FixedPipeline {
        fn run<'a>(&'a self, _repo: &'a str, _goal: &'a str) -> BoxFuture<'a, RunResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self.result.clone();
            Box::pin(async move { result })
        }
    }

    fn app(result: RunResult) -> (Router, Arc<FixedPipeline>) {
        let pipeline = Arc::new(FixedPipeline {
            result,
            calls: AtomicUsize::new(0),
        });
        let state = AppState::new(pipeline.clone());
        (Router::new().nest("/api", api_router()).with_state(state), pipeline)
    }

    fn post_run(body: Value) -> Request<Body> {
        Request::post("/api/run")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (app, _) = app(RunResult::VerifyFailed {
            output: String::new(),
        });
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn verify_failed_is_returned_as_200() {
        let (app, pipeline) = app(RunResult::VerifyFailed {
            output: "not ok 1".to_string(),
        });
        let response = app
            .oneshot(post_run(json!({"repo": "./calc", "goal": "fix it"})))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"status": "verify_failed", "output": "not ok 1"})
        );
        assert_eq!(pipeline.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_status_is_still_200() {
        let (app, _) = app(RunResult::Error {
            message: "prepare workspace for ./calc".to_string(),
            cause: None,
        });
        let response = app
            .oneshot(post_run(json!({"repo": "./calc", "goal": "fix it"})))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "error");
    }

    #[tokio::test]
    async fn empty_goal_is_rejected() {
        let (app, pipeline) = app(RunResult::VerifyFailed {
            output: String::new(),
        });
        let response = app
            .oneshot(post_run(json!({"repo": "./calc", "goal": "  "})))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "repo and goal must be non-empty"
        );
        assert_eq!(pipeline.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn runs_real_pipeline_in_process() {
        use autofix::io::workspace::WorkspaceManager;
        use autofix::patch::PatchProvider;
        use autofix::pipeline::Pipeline;
        use autofix::test_support::{FixtureRepo, ScriptedReasoning, SpyPublisher, sh_test_runner};

        let repo = FixtureRepo::calculator();
        let root = tempfile::tempdir().expect("workspace root");
        let spy = SpyPublisher::new();
        let pipeline = Pipeline::new(
            WorkspaceManager::new(root.path()),
            sh_test_runner(),
            PatchProvider::<ScriptedReasoning>::new(None),
            spy.clone(),
        );
        let app = Router::new()
            .nest("/api", api_router())
            .with_state(AppState::new(Arc::new(pipeline)));

        let response = app
            .oneshot(post_run(json!({"repo": repo.location(), "goal": "Fix division by zero"})))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["branchName"], autofix::test_support::SPY_BRANCH);
        assert_eq!(spy.mutations(), 4);
    }
}
