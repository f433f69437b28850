//! OpenAI chat completion provider
//!
//! Implements the `ChatProvider` trait against the OpenAI chat completions
//! API. Requests carry the model, sampling parameters and the conversation
//! log; rate limited and transient failures are retried with exponential
//! backoff driven by a `RetryPolicy`.
//!
//! # Example
//!
//! ```rust
//! use voxloop::config::{OpenAiSettings, RateLimitSettings};
//! use voxloop::providers::{OpenAiProvider, RetryPolicy};
//!
//! fn example() {
//!     let mut settings = OpenAiSettings::default();
//!     settings.api_key = Some("your-api-key".to_string());
//!
//!     let retry = RetryPolicy::from_settings(&RateLimitSettings::default());
//!     let provider = OpenAiProvider::new(&settings, retry).unwrap();
//!     // Use provider...
//! }
//! ```

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{OpenAiSettings, RateLimitSettings};
use crate::conversation::Message;
use crate::providers::{ChatProvider, ProviderError};

/// HTTP timeout applied to each request attempt
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Chat completions request body
#[derive(Debug, Serialize)]
struct ChatRequest {
    /// Model to use for completion
    model: String,
    /// Messages in the conversation, oldest first
    messages: Vec<WireMessage>,
    /// Sampling temperature
    temperature: f32,
    /// Upper bound on completion tokens
    max_tokens: u32,
}

/// Message format on the wire
#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    /// Role of the message sender
    role: String,
    /// Content of the message
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

/// Chat completions response body
#[derive(Debug, Deserialize)]
struct ChatResponse {
    /// Response choices (usually only 1)
    #[serde(default)]
    choices: Vec<ChatChoice>,
    /// Token usage information
    usage: Option<ChatUsage>,
    /// Error information if the request failed at the API level
    error: Option<ApiErrorBody>,
}

/// Single completion choice
#[derive(Debug, Deserialize)]
struct ChatChoice {
    /// Message from the assistant
    message: WireMessage,
    /// Reason for finishing
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

/// Token usage reported by the API
#[derive(Debug, Deserialize)]
struct ChatUsage {
    /// Tokens in the prompt
    prompt_tokens: u32,
    /// Tokens in the completion
    completion_tokens: u32,
}

/// Error object embedded in a response body
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    /// Error message
    message: String,
    /// Error type
    #[serde(rename = "type")]
    error_type: Option<String>,
    /// Error code
    code: Option<String>,
}

/// Retry schedule for rate limited and transient request failures
///
/// The delay starts at `initial_backoff_secs` and is multiplied by
/// `backoff_multiplier` after each retry, capped at `max_backoff_secs`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    max_retries: u32,
    /// First delay in seconds
    initial_backoff_secs: u64,
    /// Factor applied to the delay after each retry
    backoff_multiplier: u64,
    /// Upper bound on the delay in seconds
    max_backoff_secs: u64,
}

impl RetryPolicy {
    /// Creates a retry policy with explicit parameters
    pub fn new(
        max_retries: u32,
        initial_backoff_secs: u64,
        backoff_multiplier: u64,
        max_backoff_secs: u64,
    ) -> Self {
        Self {
            max_retries,
            initial_backoff_secs,
            backoff_multiplier,
            max_backoff_secs,
        }
    }

    /// Builds the policy from the rate limiting section of the config
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(
            settings.max_retries,
            settings.initial_backoff_secs,
            u64::from(settings.backoff_multiplier),
            settings.max_backoff_secs,
        )
    }

    /// Returns the number of retries allowed after the first attempt
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay to wait before retry number `retry` (zero-based)
    fn backoff_for(&self, retry: u32) -> Duration {
        let mut secs = self.initial_backoff_secs;
        for _ in 0..retry {
            secs = secs
                .saturating_mul(self.backoff_multiplier)
                .min(self.max_backoff_secs);
        }
        Duration::from_secs(secs.min(self.max_backoff_secs))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RateLimitSettings::default())
    }
}

/// OpenAI chat completions provider
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    /// API key for authentication
    api_key: String,
    /// Base URL for the API
    base_url: String,
    /// Model requests are made with
    model: String,
    /// Sampling temperature
    temperature: f32,
    /// Upper bound on completion tokens
    max_tokens: u32,
    /// Retry schedule for transient failures
    retry: RetryPolicy,
    /// HTTP client for making requests
    client: Client,
}

impl OpenAiProvider {
    /// Creates a provider from the OpenAI section of the config
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Config` when no API key is configured or the
    /// HTTP client fails to build.
    pub fn new(settings: &OpenAiSettings, retry: RetryPolicy) -> Result<Self, ProviderError> {
        let api_key = settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProviderError::config("OpenAI API key is not configured"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            retry,
            client,
        })
    }

    /// Builds the request body from the conversation log
    fn build_request(&self, messages: &[Message]) -> ChatRequest {
        let wire_messages: Vec<WireMessage> = messages
            .iter()
            .map(|msg| WireMessage {
                role: msg.role.as_str().to_string(),
                content: if msg.content.is_empty() {
                    None
                } else {
                    Some(msg.content.clone())
                },
            })
            .collect();

        ChatRequest {
            model: self.model.clone(),
            messages: wire_messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Extracts the assistant reply from a parsed response
    fn parse_response(&self, response: ChatResponse) -> Result<String, ProviderError> {
        if let Some(error) = response.error {
            let code = error.code.or(error.error_type).unwrap_or_default();
            return Err(ProviderError::invalid_request(format!(
                "{} ({})",
                error.message, code
            )));
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        if let Some(usage) = response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Token usage"
            );
        }

        Ok(choice.message.content.unwrap_or_default())
    }

    /// Makes the API request, retrying rate limits and transient failures
    async fn make_request_with_retry(
        &self,
        request: &ChatRequest,
    ) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let max_retries = self.retry.max_retries;
        let mut retries: u32 = 0;

        loop {
            debug!(retries, url = %url, "Sending chat completion request");

            let response = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(request)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    debug!(status = %status, "Received response");

                    match status {
                        StatusCode::OK => {
                            let body = resp.json::<ChatResponse>().await.map_err(|e| {
                                ProviderError::Serialization {
                                    message: format!("Failed to parse response: {}", e),
                                }
                            })?;
                            return Ok(body);
                        }
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                            let error_text = resp.text().await.unwrap_or_default();
                            return Err(ProviderError::auth(format!(
                                "{}: {}",
                                status, error_text
                            )));
                        }
                        StatusCode::TOO_MANY_REQUESTS => {
                            let retry_after = resp
                                .headers()
                                .get(reqwest::header::RETRY_AFTER)
                                .and_then(|v| v.to_str().ok())
                                .and_then(|s| s.parse::<u64>().ok());

                            if retries >= max_retries {
                                let error_text = resp.text().await.unwrap_or_default();
                                return Err(ProviderError::rate_limit(
                                    format!("gave up after {} retries: {}", retries, error_text),
                                    retry_after,
                                ));
                            }

                            let delay = retry_after
                                .map(Duration::from_secs)
                                .unwrap_or_else(|| self.retry.backoff_for(retries));
                            warn!(
                                retries,
                                max_retries,
                                delay_secs = delay.as_secs(),
                                "Rate limited, retrying with backoff"
                            );
                            tokio::time::sleep(delay).await;
                            retries += 1;
                            continue;
                        }
                        status if status.is_client_error() => {
                            let error_text = resp.text().await.unwrap_or_default();
                            return Err(ProviderError::invalid_request(format!(
                                "{}: {}",
                                status, error_text
                            )));
                        }
                        status if status.is_server_error() => {
                            if retries < max_retries {
                                let delay = self.retry.backoff_for(retries);
                                warn!(
                                    retries,
                                    max_retries,
                                    status = %status,
                                    delay_secs = delay.as_secs(),
                                    "Server error, retrying"
                                );
                                tokio::time::sleep(delay).await;
                                retries += 1;
                                continue;
                            }
                            let error_text = resp.text().await.unwrap_or_default();
                            return Err(ProviderError::api(
                                status.as_u16(),
                                format!("after {} retries: {}", retries, error_text),
                            ));
                        }
                        _ => {
                            let error_text = resp.text().await.unwrap_or_default();
                            return Err(ProviderError::api(status.as_u16(), error_text));
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Request failed");
                    let provider_error = ProviderError::from(e);

                    if retries < max_retries && provider_error.is_retryable() {
                        let delay = self.retry.backoff_for(retries);
                        warn!(
                            retries,
                            max_retries,
                            delay_secs = delay.as_secs(),
                            "Transport error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        retries += 1;
                        continue;
                    }

                    return Err(provider_error);
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError> {
        info!(
            model = %self.model,
            message_count = messages.len(),
            "Sending chat request to OpenAI"
        );

        let request = self.build_request(messages);
        let response = self.make_request_with_retry(&request).await?;
        let reply = self.parse_response(response)?;

        info!(content_length = reply.len(), "Received assistant reply");

        Ok(reply)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
