//! External reasoning service client.
//!
//! The [`ReasoningService`] trait is the only contract the patch provider
//! relies on: a prompt goes in, free text comes out. [`ChatCompletionsClient`]
//! implements it against an OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::BoxFuture;
use crate::io::config::ReasoningConfig;

/// Transport-level timeout; the patch provider enforces its own deadline too.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum length for error content in error messages.
const MAX_ERROR_CONTENT_LEN: usize = 200;

const SYSTEM_PROMPT: &str =
    "You repair source code. Reply with exactly one JSON object and nothing else.";

pub trait ReasoningService: Send + Sync {
    /// Send `prompt` and return the service's free-text reply.
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// OpenAI-compatible chat completions client.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionsClient {
    /// Build a client, or `None` when no credential is configured.
    pub fn from_config(cfg: &ReasoningConfig) -> Result<Option<Self>> {
        let Some(api_key) = cfg.api_key.clone() else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build reasoning http client")?;
        Ok(Some(Self {
            http,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key,
        }))
    }

    #[instrument(skip_all, fields(model = %self.model, prompt_bytes = prompt.len()))]
    async fn send(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("send reasoning request")?;

        let status = response.status();
        let text = response.text().await.context("read reasoning response")?;
        if !status.is_success() {
            return Err(anyhow!(
                "reasoning service error {}: {}",
                status,
                sanitize_api_response(&text)
            ));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).context("parse reasoning response envelope")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("reasoning response has no message content"))?;
        debug!(reply_bytes = content.len(), "reasoning reply received");
        Ok(content)
    }
}

impl ReasoningService for ChatCompletionsClient {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.send(prompt))
    }
}

/// Truncate API error bodies and redact anything that looks like a credential.
fn sanitize_api_response(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &["api_key", "apikey", "secret", "bearer", "sk-"];

    let truncated: String = content.chars().take(MAX_ERROR_CONTENT_LEN).collect();
    let lower = truncated.to_lowercase();
    if SECRET_PATTERNS.iter().any(|pattern| lower.contains(pattern)) {
        return "(response details redacted - may contain sensitive data)".to_string();
    }
    truncated
}
