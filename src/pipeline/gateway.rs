//! LLM gateway: remote chat-completion client with retry, backoff, cost
//! estimation, and deterministic fallback.
//!
//! The gateway never surfaces a generation error — missing credential or
//! exhausted retries both degrade to the fallback generator, so the pipeline
//! always gets a response in the shared grammar.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Settings;

use super::fallback::FallbackGenerator;
use super::prompt::SYSTEM_PROMPT;

/// Sentinel model name reported for fallback responses.
pub const FALLBACK_MODEL_NAME: &str = "fallback-rule-based";

/// Rough token estimation: ~4 characters per token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Output budget for a signal generation.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 500;

const RETRY_BASE_DELAY_SECS: u64 = 2;
const RETRY_MAX_DELAY_SECS: u64 = 10;
const PROBE_TIMEOUT_SECS: u64 = 10;

pub fn estimate_tokens(text: &str) -> i64 {
    (text.len() / CHARS_PER_TOKEN) as i64
}

/// Token usage and estimated cost for one generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenUsage {
    pub tokens_input: i64,
    pub tokens_output: i64,
    pub tokens_total: i64,
    pub estimated_cost_usd: f64,
    pub model_name: String,
    pub latency_ms: i64,
}

/// Text generation seam. The production implementation is `LlmGateway`;
/// tests substitute deterministic mocks.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_output_tokens: u32) -> (String, TokenUsage);
}

/// Connectivity probe classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeStatus {
    NotConfigured,
    Online,
    AuthError,
    ModelLoading,
    ApiError,
    NetworkError,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub connected: bool,
    pub status: ProbeStatus,
    pub details: String,
}

#[derive(Debug)]
enum RequestError {
    Network(String),
    Api { status: u16, body: String },
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(detail) => write!(f, "network error: {detail}"),
            Self::Api { status, body } => write!(f, "API error {status}: {body}"),
        }
    }
}

/// Request body for the chat-completions endpoint
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response body from the chat-completions endpoint
#[derive(Deserialize)]
struct ChatCompletionResponse {
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
    content: String,
}

/// HTTP client for a remote chat-completion endpoint with cost tracking.
pub struct LlmGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_retries: u32,
    timeout_secs: u64,
    cost_per_1k_input: f64,
    cost_per_1k_output: f64,
    fallback: FallbackGenerator,
}

impl LlmGateway {
    pub fn new(settings: &Settings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.llm_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_retries: settings.llm_max_retries.max(1),
            timeout_secs: settings.llm_timeout_secs,
            cost_per_1k_input: settings.cost_per_1k_input_tokens,
            cost_per_1k_output: settings.cost_per_1k_output_tokens,
            fallback: FallbackGenerator::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn calculate_cost(&self, input_tokens: i64, output_tokens: i64) -> f64 {
        (input_tokens as f64 / 1000.0) * self.cost_per_1k_input
            + (output_tokens as f64 / 1000.0) * self.cost_per_1k_output
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn request_completion(
        &self,
        api_key: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, RequestError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            max_tokens,
            temperature: 0.7,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RequestError::Network(format!("request timed out after {}s", self.timeout_secs))
                } else {
                    RequestError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestError::Api {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| RequestError::Network(format!("response decode failed: {e}")))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default())
    }

    /// Classify reachability of the remote endpoint without generating.
    pub async fn probe(&self) -> ProbeResult {
        let Some(api_key) = self.api_key.as_deref() else {
            return ProbeResult {
                connected: false,
                status: ProbeStatus::NotConfigured,
                details: "No API credential configured. Operating in fallback demo mode.".into(),
            };
        };

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: "ping" }],
            max_tokens: 1,
            temperature: 0.0,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let snippet: String = resp.text().await.unwrap_or_default().chars().take(100).collect();
                classify_probe_response(status, &snippet, &self.model)
            }
            Err(e) => ProbeResult {
                connected: false,
                status: ProbeStatus::NetworkError,
                details: format!("Network error reaching inference endpoint: {e}"),
            },
        }
    }
}

fn classify_probe_response(status: u16, body_snippet: &str, model: &str) -> ProbeResult {
    match status {
        200..=299 => ProbeResult {
            connected: true,
            status: ProbeStatus::Online,
            details: format!("Connected to inference endpoint: {model}"),
        },
        401 | 403 => ProbeResult {
            connected: false,
            status: ProbeStatus::AuthError,
            details: "Credential rejected. The token likely lacks the inference scope.".into(),
        },
        503 => ProbeResult {
            connected: false,
            status: ProbeStatus::ModelLoading,
            details: "Model is currently loading on the inference servers.".into(),
        },
        _ => ProbeResult {
            connected: false,
            status: ProbeStatus::ApiError,
            details: format!("Inference API error: {status} - {body_snippet}"),
        },
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let exp = RETRY_BASE_DELAY_SECS.saturating_mul(1u64 << attempt.min(8));
    Duration::from_secs(exp.min(RETRY_MAX_DELAY_SECS))
}

#[async_trait]
impl TextGenerator for LlmGateway {
    async fn generate(&self, prompt: &str, max_output_tokens: u32) -> (String, TokenUsage) {
        // Designed demo path, not an error: no credential → rule-based output
        let Some(api_key) = self.api_key.clone() else {
            return self.fallback.generate(prompt, None);
        };

        let started = Instant::now();
        let mut last_error = String::new();

        for attempt in 0..self.max_retries {
            match self.request_completion(&api_key, prompt, max_output_tokens).await {
                Ok(text) => {
                    let latency_ms = started.elapsed().as_millis() as i64;
                    let tokens_input = estimate_tokens(prompt);
                    let tokens_output = estimate_tokens(&text);
                    let usage = TokenUsage {
                        tokens_input,
                        tokens_output,
                        tokens_total: tokens_input + tokens_output,
                        estimated_cost_usd: self.calculate_cost(tokens_input, tokens_output),
                        model_name: self.model.clone(),
                        latency_ms,
                    };
                    return (text, usage);
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt + 1 < self.max_retries {
                        let delay = backoff_delay(attempt);
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_retries = self.max_retries,
                            delay_secs = delay.as_secs(),
                            error = %last_error,
                            "LLM request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        tracing::warn!(error = %last_error, "LLM retries exhausted, degrading to fallback generation");
        self.fallback.generate(prompt, Some(&last_error))
    }
}
