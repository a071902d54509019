//! Local inference server backend (Ollama-compatible HTTP API).

use crate::backend::GenerationBackend;
use crate::error::{GeneratorError, GeneratorResult};
use crate::prompt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use textorm_core::config::DecodingConfig;

#[derive(Serialize)]
struct ShowRequest<'a> {
    model: &'a str,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Fine-tuned model served by a local inference server.
///
/// `setup` confirms both the base model and the adapter are available;
/// generation runs against the adapter.
pub struct LocalModelBackend {
    http: reqwest::Client,
    endpoint: String,
    base_model: String,
    adapter: String,
    decoding: DecodingConfig,
    ready: OnceLock<()>,
}

impl LocalModelBackend {
    pub fn new(
        endpoint: &str,
        base_model: impl Into<String>,
        adapter: impl Into<String>,
        decoding: DecodingConfig,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            base_model: base_model.into(),
            adapter: adapter.into(),
            decoding,
            ready: OnceLock::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    async fn load_model(&self, model: &str) -> GeneratorResult<()> {
        let response = self
            .http
            .post(self.url("/api/show"))
            .json(&ShowRequest { model })
            .send()
            .await
            .map_err(|e| {
                GeneratorError::Setup(format!(
                    "inference server unreachable at {}: {e}",
                    self.endpoint
                ))
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Setup(format!(
                "model {model} is not available ({status}): {body}"
            )));
        }
        tracing::debug!(model = %model, "Model available");
        Ok(())
    }

    fn options(&self) -> GenerateOptions {
        GenerateOptions {
            temperature: self.decoding.temperature,
            top_k: self.decoding.top_k,
            top_p: self.decoding.top_p,
            num_predict: self.decoding.max_new_tokens,
        }
    }
}

#[async_trait]
impl GenerationBackend for LocalModelBackend {
    async fn setup(&self) -> GeneratorResult<()> {
        if self.is_ready() {
            return Err(GeneratorError::AlreadyInitialized);
        }
        self.load_model(&self.base_model).await?;
        self.load_model(&self.adapter).await?;
        self.ready
            .set(())
            .map_err(|_| GeneratorError::AlreadyInitialized)?;
        tracing::info!(
            endpoint = %self.endpoint,
            base_model = %self.base_model,
            adapter = %self.adapter,
            "Local model backend ready"
        );
        Ok(())
    }

    async fn generate(&self, question: &str, schemas: &str) -> GeneratorResult<String> {
        if !self.is_ready() {
            return Err(GeneratorError::NotInitialized);
        }
        let request = GenerateRequest {
            model: &self.adapter,
            prompt: prompt::render(schemas, question),
            stream: false,
            options: self.options(),
        };
        let response = self
            .http
            .post(self.url("/api/generate"))
            .json(&request)
            .send()
            .await
            .map_err(|e| GeneratorError::Generation(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Generation(format!(
                "inference server error ({status}): {body}"
            )));
        }
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Generation(format!("invalid response body: {e}")))?;
        Ok(body.response.trim().to_string())
    }

    fn is_ready(&self) -> bool {
        self.ready.get().is_some()
    }

    fn name(&self) -> &'static str {
        "local_model"
    }
}
