//! Test-only fixtures and fakes shared by unit and integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::BoxFuture;
use crate::core::types::{PrData, PullRequestOutcome, RepoInfo};
use crate::io::config::TestsConfig;
use crate::io::reasoning::ReasoningService;
use crate::io::test_runner::ManifestTestRunner;
use crate::publish::Publisher;

pub const CALCULATOR_JS: &str = "\
function add(a, b) {
  return a + b;
}

function divide(a, b) {
  return a / b;
}

module.exports = { add, divide };
";

pub const PACKAGE_JSON: &str = r#"{
  "name": "calculator",
  "version": "1.0.0",
  "scripts": {
    "test": "sh test.sh"
  }
}
"#;

/// Passes only once `divide` guards against a zero divisor.
pub const TEST_SH: &str = "\
if grep -q \"Division by zero\" src/calculator.js; then
  echo \"ok - divide guards zero\"
else
  echo \"not ok - divide(1, 0) returned Infinity\"
  exit 1
fi
";

/// Remote URL the fixture's `origin` reports for fetches.
pub const FIXTURE_ORIGIN_URL: &str = "https://github.com/acme/calculator.git";

/// A throwaway repository laid out like a small npm project.
pub struct FixtureRepo {
    dir: TempDir,
    remote: Option<TempDir>,
}

impl FixtureRepo {
    /// Calculator project whose test fails until `divide` is guarded.
    pub fn calculator() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = Self { dir, remote: None };
        repo.write("package.json", PACKAGE_JSON);
        repo.write("test.sh", TEST_SH);
        repo.write("src/calculator.js", CALCULATOR_JS);
        repo
    }

    /// Calculator project committed to git on `main`, with an `origin` that
    /// fetches from [`FIXTURE_ORIGIN_URL`] but pushes to a local bare repo.
    pub fn calculator_with_remote() -> Self {
        let mut repo = Self::calculator();
        repo.git(&["init", "-q"]);
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        repo.git(&["config", "user.name", "Autofix Test"]);
        repo.git(&["config", "user.email", "autofix@local.invalid"]);
        repo.git(&["add", "-A"]);
        repo.git(&["commit", "-q", "-m", "initial"]);

        let remote = tempfile::tempdir().expect("remote tempdir");
        run_git(remote.path(), &["init", "-q", "--bare"]);
        let push_url = remote.path().to_string_lossy().into_owned();
        repo.git(&["remote", "add", "origin", FIXTURE_ORIGIN_URL]);
        repo.git(&["remote", "set-url", "--push", "origin", &push_url]);
        repo.remote = Some(remote);
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Location string accepted by the workspace manager.
    pub fn location(&self) -> String {
        self.path().to_string_lossy().into_owned()
    }

    pub fn remote_path(&self) -> Option<&Path> {
        self.remote.as_ref().map(TempDir::path)
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, content).expect("write fixture file");
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path().join(rel)).expect("read fixture file")
    }

    pub fn git(&self, args: &[&str]) -> String {
        run_git(self.path(), args)
    }
}

/// Run git in `dir`, panicking on failure; returns trimmed stdout.
pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Test runner that executes the fixture's `test.sh` with `sh`.
pub fn sh_test_runner() -> ManifestTestRunner {
    ManifestTestRunner::from_config(&sh_tests_config())
}

pub fn sh_tests_config() -> TestsConfig {
    TestsConfig {
        command: vec!["sh".to_string(), "test.sh".to_string()],
        timeout_secs: 60,
        ..TestsConfig::default()
    }
}

/// Reasoning service returning a canned reply after an optional delay.
#[derive(Clone)]
pub struct ScriptedReasoning {
    reply: Result<String, String>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    last_prompt: Arc<Mutex<Option<String>>>,
}

impl ScriptedReasoning {
    pub fn reply(text: &str) -> Self {
        Self::new(Ok(text.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::new(Err(message.to_string()))
    }

    fn new(reply: Result<String, String>) -> Self {
        Self {
            reply,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            last_prompt: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().expect("prompt lock").clone()
    }
}

impl ReasoningService for ScriptedReasoning {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().expect("prompt lock") = Some(prompt.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.reply.clone().map_err(|message| anyhow!(message))
        })
    }
}

/// Publisher that records calls and never touches git or the network.
#[derive(Clone, Default)]
pub struct SpyPublisher {
    calls: Arc<SpyCalls>,
}

#[derive(Default)]
pub struct SpyCalls {
    pub create_branch: AtomicUsize,
    pub commit: AtomicUsize,
    pub push: AtomicUsize,
    pub repo_info: AtomicUsize,
    pub open_pull_request: AtomicUsize,
    pub committed_dirs: Mutex<Vec<PathBuf>>,
}

pub const SPY_BRANCH: &str = "fix/20260101-120000";

impl SpyPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &SpyCalls {
        &self.calls
    }

    /// Total number of remote-mutating calls (branch, commit, push, PR).
    pub fn mutations(&self) -> usize {
        self.calls.create_branch.load(Ordering::SeqCst)
            + self.calls.commit.load(Ordering::SeqCst)
            + self.calls.push.load(Ordering::SeqCst)
            + self.calls.open_pull_request.load(Ordering::SeqCst)
    }
}

impl Publisher for SpyPublisher {
    fn create_branch(&self, _repo_dir: &Path) -> Result<String> {
        self.calls.create_branch.fetch_add(1, Ordering::SeqCst);
        Ok(SPY_BRANCH.to_string())
    }

    fn commit(&self, repo_dir: &Path, _message: &str) -> Result<()> {
        self.calls.commit.fetch_add(1, Ordering::SeqCst);
        self.calls
            .committed_dirs
            .lock()
            .expect("spy lock")
            .push(repo_dir.to_path_buf());
        Ok(())
    }

    fn push(&self, _repo_dir: &Path, _branch: &str) -> Result<()> {
        self.calls.push.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn repo_info(&self, _repo_dir: &Path) -> Result<RepoInfo> {
        self.calls.repo_info.fetch_add(1, Ordering::SeqCst);
        Ok(RepoInfo {
            owner: "acme".to_string(),
            name: "calculator".to_string(),
        })
    }

    fn open_pull_request<'a>(
        &'a self,
        repo: &'a RepoInfo,
        branch: &'a str,
        title: &'a str,
        body: &'a str,
    ) -> BoxFuture<'a, PullRequestOutcome> {
        Box::pin(async move {
            self.calls.open_pull_request.fetch_add(1, Ordering::SeqCst);
            PullRequestOutcome::payload_only(PrData {
                owner: repo.owner.clone(),
                repo: repo.name.clone(),
                head: branch.to_string(),
                base: "main".to_string(),
                title: title.to_string(),
                body: body.to_string(),
            })
        })
    }
}
