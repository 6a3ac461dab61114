//! Test command discovery and execution.
//!
//! The [`TestRunner`] trait decouples the pipeline from how tests are run.
//! Implementations must report test failures, timeouts and spawn errors as a
//! failed [`TestResult`], never as an `Err`: the pipeline relies on that to
//! tell "tests ran and failed" apart from an environment failure.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::core::types::TestResult;
use crate::io::config::TestsConfig;
use crate::io::process::run_captured;

pub trait TestRunner: Send + Sync {
    fn run(&self, repo_dir: &Path) -> TestResult;
}

/// Runs the configured command when the manifest declares a test script.
#[derive(Debug, Clone)]
pub struct ManifestTestRunner {
    manifest: String,
    command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    scripts: BTreeMap<String, serde_json::Value>,
}

impl ManifestTestRunner {
    pub fn from_config(cfg: &TestsConfig) -> Self {
        Self {
            manifest: cfg.manifest.clone(),
            command: cfg.command.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }

    /// Command to run in `repo_dir`, or `None` if no test script is declared.
    pub fn discover(&self, repo_dir: &Path) -> Option<&[String]> {
        declares_test_script(&repo_dir.join(&self.manifest)).then_some(self.command.as_slice())
    }
}

impl TestRunner for ManifestTestRunner {
    #[instrument(skip_all, fields(repo = %repo_dir.display()))]
    fn run(&self, repo_dir: &Path) -> TestResult {
        let Some(argv) = self.discover(repo_dir) else {
            info!(manifest = %self.manifest, "no test script declared");
            return TestResult::no_command();
        };
        let command_line = argv.join(" ");
        let Some((program, args)) = argv.split_first() else {
            return TestResult::no_command();
        };

        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(repo_dir).env("CI", "true");

        debug!(command = %command_line, "running tests");
        match run_captured(cmd, self.timeout, self.output_limit_bytes) {
            Ok(out) => {
                let mut output = out.combined_text();
                if out.timed_out {
                    output.push_str(&format!(
                        "\n[test command timed out after {}s]\n",
                        self.timeout.as_secs()
                    ));
                }
                let success = out.success();
                info!(success, exit_code = ?out.status.code(), "tests finished");
                TestResult {
                    success,
                    output,
                    command: Some(command_line),
                }
            }
            Err(err) => {
                warn!(err = %format!("{err:#}"), command = %command_line, "could not run tests");
                TestResult {
                    success: false,
                    output: format!("{err:#}"),
                    command: Some(command_line),
                }
            }
        }
    }
}

/// True when the manifest parses and declares a non-empty `scripts.test`.
/// Missing, unreadable or malformed manifests count as "not declared".
fn declares_test_script(manifest_path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(manifest_path) else {
        return false;
    };
    match serde_json::from_str::<Manifest>(&contents) {
        Ok(manifest) => manifest
            .scripts
            .get("test")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|script| !script.trim().is_empty()),
        Err(err) => {
            warn!(path = %manifest_path.display(), err = %err, "unparseable manifest");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::core::types::NO_TEST_COMMAND;
    use tempfile::tempdir;

    fn runner(command: &[&str]) -> ManifestTestRunner {
        ManifestTestRunner::from_config(&TestsConfig {
            command: command.iter().map(|s| s.to_string()).collect(),
            timeout_secs: 30,
            ..TestsConfig::default()
        })
    }

    #[test]
    fn missing_manifest_yields_no_command_without_spawning() {
        let temp = tempdir().expect("tempdir");
        let marker = temp.path().join("spawned");
        let script = format!("touch {}", marker.display());
        let result = runner(&["sh", "-c", &script]).run(temp.path());
        assert_eq!(
            result,
            TestResult {
                success: false,
                output: NO_TEST_COMMAND.to_string(),
                command: None,
            }
        );
        assert!(!marker.exists(), "no process may be spawned");
    }

    #[test]
    fn manifest_without_test_script_yields_no_command() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("package.json"),
            r#"{"name":"x","scripts":{"build":"tsc"}}"#,
        )
        .expect("write");
        let marker = temp.path().join("spawned");
        let script = format!("touch {}", marker.display());
        let result = runner(&["sh", "-c", &script]).run(temp.path());
        assert_eq!(result, TestResult::no_command());
        assert!(!marker.exists());
    }

    #[test]
    fn malformed_manifest_yields_no_command() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("package.json"), "{ not json").expect("write");
        let result = runner(&["true"]).run(temp.path());
        assert_eq!(result, TestResult::no_command());
    }

    #[cfg(unix)]
    #[test]
    fn failing_tests_are_a_value_not_an_error() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("package.json"),
            r#"{"scripts":{"test":"node test.js"}}"#,
        )
        .expect("write");
        let result = runner(&["sh", "-c", "echo '1 failing'; exit 1"]).run(temp.path());
        assert!(!result.success);
        assert!(result.output.contains("1 failing"));
        assert_eq!(result.command.as_deref(), Some("sh -c echo '1 failing'; exit 1"));
    }

    #[cfg(unix)]
    #[test]
    fn passing_tests_run_in_repo_dir() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("package.json"),
            r#"{"scripts":{"test":"node test.js"}}"#,
        )
        .expect("write");
        fs::write(temp.path().join("marker.txt"), "here").expect("write");
        let result = runner(&["cat", "marker.txt"]).run(temp.path());
        assert!(result.success);
        assert_eq!(result.output, "here");
    }

    #[cfg(unix)]
    #[test]
    fn slow_suite_is_cut_off_at_timeout() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("package.json"),
            r#"{"scripts":{"test":"node test.js"}}"#,
        )
        .expect("write");
        let runner = ManifestTestRunner::from_config(&TestsConfig {
            command: vec!["sh".into(), "-c".into(), "sleep 8; echo done".into()],
            timeout_secs: 1,
            ..TestsConfig::default()
        });
        let started = Instant::now();
        let result = runner.run(temp.path());
        assert!(!result.success);
        assert!(result.output.contains("timed out after 1s"));
        assert!(!result.output.contains("done"));
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "timeout not enforced: {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn missing_binary_is_reported_as_failed_run() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("package.json"),
            r#"{"scripts":{"test":"jest"}}"#,
        )
        .expect("write");
        let result = runner(&["definitely-not-a-real-binary-autofix"]).run(temp.path());
        assert!(!result.success);
        assert!(result.output.contains("spawn command"));
        assert!(result.command.is_some());
    }
}
