//! Pipeline configuration.
//!
//! [`AutofixConfig`] is built once at process start (TOML file, then
//! environment overrides) and handed to each component's constructor.
//! Components never read the environment themselves.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Top-level configuration (TOML).
///
/// Missing fields default to values suitable for npm projects hosted on GitHub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AutofixConfig {
    /// Directory under which per-run workspaces are created.
    pub workspace_root: PathBuf,
    pub tests: TestsConfig,
    pub reasoning: ReasoningConfig,
    pub github: GitHubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TestsConfig {
    /// Manifest file that must declare a `scripts.test` entry.
    pub manifest: String,
    /// Invocation used when the manifest declares a test script.
    pub command: Vec<String>,
    /// Kill the test process after this many seconds.
    pub timeout_secs: u64,
    /// Keep at most this many bytes of stdout (and of stderr).
    pub output_limit_bytes: usize,
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            manifest: "package.json".to_string(),
            command: vec!["npm".to_string(), "test".to_string()],
            timeout_secs: 10 * 60,
            output_limit_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReasoningConfig {
    /// OpenAI-compatible chat completions endpoint.
    pub endpoint: String,
    pub model: String,
    /// Bearer credential. The external patch path is skipped when unset.
    pub api_key: Option<String>,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_base: String,
    /// Branch the pull request targets.
    pub base_branch: String,
    /// Remote that is pushed to and parsed for owner/name.
    pub remote: String,
    /// Bearer credential. Pull requests are returned as payloads when unset.
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            base_branch: "main".to_string(),
            remote: "origin".to_string(),
            token: None,
        }
    }
}

impl Default for AutofixConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir().join("autofix-workspaces"),
            tests: TestsConfig::default(),
            reasoning: ReasoningConfig::default(),
            github: GitHubConfig::default(),
        }
    }
}

impl AutofixConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workspace_root.as_os_str().is_empty() {
            return Err(anyhow!("workspace_root must be non-empty"));
        }
        if self.tests.manifest.trim().is_empty() {
            return Err(anyhow!("tests.manifest must be non-empty"));
        }
        if self.tests.command.is_empty() || self.tests.command[0].trim().is_empty() {
            return Err(anyhow!("tests.command must be a non-empty array"));
        }
        if self.tests.timeout_secs == 0 {
            return Err(anyhow!("tests.timeout_secs must be > 0"));
        }
        if self.tests.output_limit_bytes == 0 {
            return Err(anyhow!("tests.output_limit_bytes must be > 0"));
        }
        if self.reasoning.endpoint.trim().is_empty() || self.reasoning.model.trim().is_empty() {
            return Err(anyhow!("reasoning.endpoint and reasoning.model must be non-empty"));
        }
        if self.github.base_branch.trim().is_empty() || self.github.remote.trim().is_empty() {
            return Err(anyhow!("github.base_branch and github.remote must be non-empty"));
        }
        Ok(())
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// Empty values are ignored. Binaries pass `std::env::var`; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("AUTOFIX_LLM_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.reasoning.api_key = Some(key);
        }
        if let Some(model) = get("AUTOFIX_LLM_MODEL") {
            self.reasoning.model = model;
        }
        if let Some(endpoint) = get("AUTOFIX_LLM_ENDPOINT") {
            self.reasoning.endpoint = endpoint;
        }
        if let Some(token) = get("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(root) = get("AUTOFIX_WORKSPACE_ROOT") {
            self.workspace_root = PathBuf::from(root);
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AutofixConfig::default()`.
pub fn load_config(path: &Path) -> Result<AutofixConfig> {
    if !path.exists() {
        let cfg = AutofixConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AutofixConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load config from `path` (or defaults), then apply the process environment.
pub fn load_from_process(path: Option<&Path>) -> Result<AutofixConfig> {
    let mut cfg = match path {
        Some(path) => load_config(path)?,
        None => AutofixConfig::default(),
    };
    cfg.apply_env(|key| std::env::var(key).ok());
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AutofixConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("autofix.toml");
        fs::write(
            &path,
            "workspace_root = \"/tmp/ws\"\n\n[tests]\ncommand = [\"sh\", \"test.sh\"]\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.workspace_root, PathBuf::from("/tmp/ws"));
        assert_eq!(cfg.tests.command, vec!["sh", "test.sh"]);
        assert_eq!(cfg.tests.manifest, "package.json");
        assert_eq!(cfg.github.base_branch, "main");
    }

    #[test]
    fn rejects_empty_test_command() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("autofix.toml");
        fs::write(&path, "[tests]\ncommand = []\n").expect("write");
        let err = load_config(&path).expect_err("should fail");
        assert!(err.to_string().contains("tests.command"));
    }

    #[test]
    fn env_overrides_credentials_and_ignores_empty_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("AUTOFIX_LLM_API_KEY", ""),
            ("OPENAI_API_KEY", "sk-test"),
            ("GITHUB_TOKEN", "ghp_test"),
            ("AUTOFIX_LLM_MODEL", "local-model"),
        ]);
        let mut cfg = AutofixConfig::default();
        cfg.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(cfg.reasoning.api_key.as_deref(), Some("sk-test"));
        assert_eq!(cfg.reasoning.model, "local-model");
        assert_eq!(cfg.github.token.as_deref(), Some("ghp_test"));
        assert_eq!(
            cfg.reasoning.endpoint,
            ReasoningConfig::default().endpoint,
            "unset keys keep their defaults"
        );
    }
}
