//! Hosted chat-completions backend (OpenAI-compatible API).

use crate::backend::GenerationBackend;
use crate::error::{GeneratorError, GeneratorResult};
use crate::prompt::{self, ChatMessage};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use textorm_core::config::Secret;

const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Hosted chat-completions model.
pub struct RemoteApiBackend {
    api_key: Secret,
    base_url: String,
    model: String,
    temperature: f32,
    max_retries: u32,
    retry_base_delay: Duration,
    http: OnceLock<reqwest::Client>,
}

impl RemoteApiBackend {
    pub fn new(
        api_key: Secret,
        base_url: &str,
        model: impl Into<String>,
        temperature: f32,
        max_retries: u32,
    ) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            temperature,
            max_retries,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            http: OnceLock::new(),
        }
    }

    /// Override the first retry delay; later retries double it.
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (1-based): the base delay doubled
    /// per earlier retry, capped at `MAX_RETRY_DELAY`.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.retry_base_delay
            .saturating_mul(factor)
            .min(MAX_RETRY_DELAY)
    }

    fn is_transient(status: StatusCode) -> bool {
        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
    }

    /// Send the completion request, retrying on transport errors, 429 and 5xx.
    async fn send_with_retries(
        &self,
        http: &reqwest::Client,
        request: &CompletionRequest<'_>,
    ) -> reqwest::Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut attempt = 0;

        loop {
            let result = http
                .post(&url)
                .bearer_auth(self.api_key.expose())
                .json(request)
                .send()
                .await;
            match result {
                Ok(response) if Self::is_transient(response.status()) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Ok(response);
                    }
                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(
                        status = %response.status(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Completion request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(e);
                    }
                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Completion request error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl GenerationBackend for RemoteApiBackend {
    async fn setup(&self) -> GeneratorResult<()> {
        if self.is_ready() {
            return Err(GeneratorError::AlreadyInitialized);
        }
        if self.api_key.is_blank() {
            return Err(GeneratorError::Setup("API key is empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| GeneratorError::Setup(format!("failed to build HTTP client: {e}")))?;
        self.http
            .set(http)
            .map_err(|_| GeneratorError::AlreadyInitialized)?;
        tracing::info!(base_url = %self.base_url, model = %self.model, "Remote API backend ready");
        Ok(())
    }

    async fn generate(&self, question: &str, schemas: &str) -> GeneratorResult<String> {
        let http = self.http.get().ok_or(GeneratorError::NotInitialized)?;
        let request = CompletionRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: prompt::chat_messages(question, schemas),
        };

        let response = self
            .send_with_retries(http, &request)
            .await
            .map_err(|e| GeneratorError::Generation(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Generation(format!(
                "API error ({status}): {body}"
            )));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Generation(format!("invalid response body: {e}")))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GeneratorError::Generation("response contained no message".to_string()))
    }

    fn is_ready(&self) -> bool {
        self.http.get().is_some()
    }

    fn name(&self) -> &'static str {
        "remote_api"
    }
}
