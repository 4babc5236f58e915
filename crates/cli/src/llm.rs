//! OpenAI-compatible chat completion client with retry and rate-limit
//! handling.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EndpointConfig;
use crate::prompt::render_fields;

/// Used when neither the config file nor `OPENAI_BASE_URL` names a server.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default maximum retries for transient errors.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds (doubles each retry).
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("OPENAI_API_KEY environment variable is not set")]
    MissingApiKey,
    #[error("no model configured: set OPENAI_MODEL, [endpoint] model, or --model")]
    MissingModel,
    #[error("endpoint returned HTTP status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("failed to parse completion response: {0}")]
    Decode(String),
    #[error("completion response contained no text")]
    Empty,
    #[error("all {attempts} attempts failed, last error: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<CompletionError>,
    },
}

impl CompletionError {
    /// 429, 500, 502 and 503 are worth another try, as are network-level
    /// failures.
    fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Status(code) => matches!(code, 429 | 500 | 502 | 503),
            CompletionError::Transport(_) => true,
            _ => false,
        }
    }
}

impl From<ureq::Error> for CompletionError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(code) => CompletionError::Status(code),
            other => CompletionError::Transport(other.to_string()),
        }
    }
}

/// Something that can turn a system prompt plus template fields into text.
pub trait CompletionProvider {
    fn complete(
        &self,
        system_prompt: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, CompletionError>;
}

// ── Request / Response types ─────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────────────

pub struct OpenAiClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
    initial_backoff: Duration,
}

impl OpenAiClient {
    pub fn from_config(endpoint: &EndpointConfig) -> Result<Self, CompletionError> {
        let api_key = endpoint
            .api_key
            .clone()
            .ok_or(CompletionError::MissingApiKey)?;
        let model = endpoint
            .model
            .clone()
            .ok_or(CompletionError::MissingModel)?;
        Ok(OpenAiClient {
            agent: ureq::Agent::new_with_defaults(),
            base_url: endpoint
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model,
            max_retries: endpoint.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            initial_backoff: Duration::from_millis(
                endpoint.initial_backoff_ms.unwrap_or(INITIAL_BACKOFF_MS),
            ),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Make a single API call (no retry).
    fn complete_once(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .agent
            .post(self.url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .send_json(&request)?;

        let resp: ChatResponse = response
            .into_body()
            .read_json()
            .map_err(|e| CompletionError::Decode(e.to_string()))?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(CompletionError::Empty)
    }
}

impl CompletionProvider for OpenAiClient {
    fn complete(
        &self,
        system_prompt: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, CompletionError> {
        let user = render_fields(fields);
        tracing::debug!(model = %self.model, url = %self.url(), "requesting completion");
        with_retry(
            || self.complete_once(system_prompt, &user),
            self.max_retries,
            self.initial_backoff,
        )
    }
}

/// Retry a fallible operation with exponential backoff.
///
/// Only retryable errors are retried. Backoff starts at `initial` and
/// doubles each retry.
fn with_retry<T>(
    mut f: impl FnMut() -> Result<T, CompletionError>,
    max_retries: u32,
    initial: Duration,
) -> Result<T, CompletionError> {
    let mut backoff = initial;
    let mut attempt = 0;
    loop {
        match f() {
            Ok(val) => return Ok(val),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt >= max_retries => {
                if max_retries == 0 {
                    return Err(e);
                }
                return Err(CompletionError::Exhausted {
                    attempts: attempt + 1,
                    last: Box::new(e),
                });
            }
            Err(e) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    of = max_retries + 1,
                    error = %e,
                    backoff_ms = backoff.as_millis() as u64,
                    "retryable completion error"
                );
                std::thread::sleep(backoff);
                backoff *= 2;
                attempt += 1;
            }
        }
    }
}
