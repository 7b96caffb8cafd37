//! LLM client: the single point of entry for all Claude API calls in the interview API.
//!
//! No other module may call the Anthropic API directly; question generation and
//! answer grading reach it through `interview::evaluator::LlmEvaluator`.
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 1024;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// Output that arrived but could not be used, as opposed to a failed call.
    pub fn is_malformed_output(&self) -> bool {
        matches!(self, LlmError::Parse(_) | LlmError::EmptyContent)
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API with retry logic and structured output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    max_attempts: u32,
    backoff_base: Duration,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(HTTP_TIMEOUT).build()?,
            api_key,
            api_url: ANTHROPIC_API_URL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
        })
    }

    /// Points the client at another Messages API endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// First retry delay; each later retry doubles it.
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Caps the number of attempts made for rate-limit-class failures.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    /// Retries on 429 (rate limit), 5xx and transport errors with exponential backoff.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = backoff_delay(self.backoff_base, attempt);
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: self.max_attempts,
        }))
    }

    /// Calls the LLM and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system).await?;

        let text = response.text().ok_or(LlmError::EmptyContent)?;
        let text = strip_json_fences(text);

        serde_json::from_str(text).map_err(LlmError::Parse)
    }
}

/// base, 2×base, 4×base, ... for attempt 1, 2, 3, ...
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * (1u32 << attempt.saturating_sub(1).min(6))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, routing::post, Router};

    const REPLY: &str = r#"{"content":[{"type":"text","text":"```json\n{\"score\": 70}\n```"}],
        "usage":{"input_tokens":10,"output_tokens":5}}"#;

    #[derive(Debug, Deserialize)]
    struct Scored {
        score: u32,
    }

    /// Serves `respond(n)` for the n-th request (0-based) on a local port.
    /// Returns the endpoint URL and the request counter.
    async fn stub(respond: fn(usize) -> (StatusCode, String)) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/v1/messages",
                post(move |State(hits): State<Arc<AtomicUsize>>| async move {
                    respond(hits.fetch_add(1, Ordering::SeqCst))
                }),
            )
            .with_state(hits.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1/messages"), hits)
    }

    fn client(url: &str, max_attempts: u32) -> LlmClient {
        LlmClient::new("test-key".to_string())
            .unwrap()
            .with_api_url(url)
            .with_max_attempts(max_attempts)
            .with_backoff_base(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried_up_to_max_attempts() {
        let (url, hits) = stub(|_| (StatusCode::TOO_MANY_REQUESTS, "slow down".to_string())).await;
        let err = client(&url, 3).call("prompt", "system").await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 429, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (url, hits) = stub(|_| {
            (
                StatusCode::BAD_REQUEST,
                r#"{"error":{"type":"invalid_request_error","message":"max_tokens too large"}}"#
                    .to_string(),
            )
        })
        .await;
        let err = client(&url, 3).call("prompt", "system").await.unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "max_tokens too large");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_then_success_yields_parsed_json() {
        let (url, hits) = stub(|n| match n {
            0 => (StatusCode::SERVICE_UNAVAILABLE, "overloaded".to_string()),
            _ => (StatusCode::OK, REPLY.to_string()),
        })
        .await;
        let scored: Scored = client(&url, 3).call_json("prompt", "system").await.unwrap();
        assert_eq!(scored.score, 70);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_attempt_gives_up_immediately() {
        let (url, hits) = stub(|_| (StatusCode::BAD_GATEWAY, String::new())).await;
        let err = client(&url, 1).call("prompt", "system").await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 502, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"score\": 70}\n```";
        assert_eq!(strip_json_fences(input), "{\"score\": 70}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"score\": 70}\n```";
        assert_eq!(strip_json_fences(input), "{\"score\": 70}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "  {\"score\": 70}  ";
        assert_eq!(strip_json_fences(input), "{\"score\": 70}");
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let base = DEFAULT_BACKOFF_BASE;
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(4));
    }

    #[test]
    fn test_response_text_picks_first_text_block() {
        let response: LlmResponse = serde_json::from_str(
            r#"{"content":[{"type":"tool_use","text":null},{"type":"text","text":"hi"}],
                "usage":{"input_tokens":3,"output_tokens":1}}"#,
        )
        .unwrap();
        assert_eq!(response.text(), Some("hi"));
    }

    #[test]
    fn test_max_attempts_never_zero() {
        let client = LlmClient::new("key".to_string()).unwrap().with_max_attempts(0);
        assert_eq!(client.max_attempts, 1);
    }

    #[test]
    fn test_malformed_output_classification() {
        assert!(LlmError::EmptyContent.is_malformed_output());
        assert!(!LlmError::RateLimited { retries: 3 }.is_malformed_output());
    }
}
