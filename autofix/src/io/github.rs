//! GitHub pull-request API.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::core::types::PrData;
use crate::io::config::GitHubConfig;

/// Fixed deadline for the create-pull-request call.
pub const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum length for error body content in error messages.
const MAX_ERROR_BODY_LEN: usize = 200;

/// A pull request the API reported as created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPullRequest {
    pub url: String,
    pub number: u64,
}

/// Why a pull request was not created through the API.
#[derive(Debug, Error)]
pub enum PullRequestError {
    #[error("no GitHub token configured")]
    MissingToken,
    #[error("GitHub API request timed out after {}s", API_TIMEOUT.as_secs())]
    Timeout,
    #[error("GitHub API request failed")]
    Transport(#[source] reqwest::Error),
    #[error("GitHub API error ({status}): {message}")]
    Api { status: StatusCode, message: String },
    #[error("unexpected GitHub API response")]
    Decode(#[source] serde_json::Error),
}

#[derive(Serialize)]
struct CreatePrRequest<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

#[derive(Deserialize)]
struct CreatePrResponse {
    html_url: String,
    number: u64,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Pull-request client. Holds the optional bearer token.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn from_config(cfg: &GitHubConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .user_agent(concat!("autofix/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// `POST /repos/{owner}/{repo}/pulls`. Only `201 Created` counts as success.
    #[instrument(
        skip_all,
        fields(owner = %payload.owner, repo = %payload.repo, head = %payload.head)
    )]
    pub async fn create_pull_request(
        &self,
        payload: &PrData,
    ) -> Result<CreatedPullRequest, PullRequestError> {
        let token = self.token.as_deref().ok_or(PullRequestError::MissingToken)?;
        let url = format!(
            "{}/repos/{}/{}/pulls",
            self.api_base, payload.owner, payload.repo
        );
        let request = CreatePrRequest {
            title: &payload.title,
            body: &payload.body,
            head: &payload.head,
            base: &payload.base,
        };

        debug!("sending create pull request");
        let resp = self
            .http
            .post(&url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(classify_transport)?;
        parse_create_response(status, &body)
    }
}

fn classify_transport(err: reqwest::Error) -> PullRequestError {
    if err.is_timeout() {
        PullRequestError::Timeout
    } else {
        PullRequestError::Transport(err)
    }
}

/// Interpret a create-pull-request response.
pub fn parse_create_response(
    status: StatusCode,
    body: &str,
) -> Result<CreatedPullRequest, PullRequestError> {
    if status == StatusCode::CREATED {
        let pr: CreatePrResponse = serde_json::from_str(body).map_err(PullRequestError::Decode)?;
        return Ok(CreatedPullRequest {
            url: pr.html_url,
            number: pr.number,
        });
    }
    Err(PullRequestError::Api {
        status,
        message: describe_api_error(body),
    })
}

/// Human-readable message from a GitHub error body.
fn describe_api_error(body: &str) -> String {
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(body) {
        let detail = api_error
            .errors
            .iter()
            .find_map(|e| e.message.clone())
            .unwrap_or_default();
        return if detail.is_empty() {
            api_error.message
        } else {
            format!("{}: {}", api_error.message, detail)
        };
    }
    sanitize_error_body(body)
}

/// Truncate raw error bodies and redact anything that looks like a token.
fn sanitize_error_body(body: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &[
        "token",
        "secret",
        "password",
        "bearer",
        "ghp_",
        "gho_",
        "github_pat_",
    ];

    let truncated = if body.chars().count() > MAX_ERROR_BODY_LEN {
        let head: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
        format!("{head}... (truncated)")
    } else {
        body.to_string()
    };
    let lower = truncated.to_lowercase();
    if SECRET_PATTERNS.iter().any(|pattern| lower.contains(pattern)) {
        return "(error details redacted - may contain sensitive data)".to_string();
    }
    truncated
}
