//! OpenAI-compatible chat completions provider (DeepSeek, OpenAI, Ollama, ...)

use crate::provider::{ChatProvider, LlmError, LlmResult};
use crate::types::{ChatRequest, CompletionRequest, CompletionResponse};
use bzx_core::{preview, BridgeConfig};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error};

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const ERROR_BODY_CHARS: usize = 200;

pub struct OpenAiCompatProvider {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
    timeout: Duration,
}

impl OpenAiCompatProvider {
    pub fn new(api_url: impl Into<String>) -> Self {
        let timeout = Duration::from_secs(30);
        Self {
            client: build_client(timeout),
            api_url: api_url.into(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 512,
            top_p: 1.0,
            timeout,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        let params = &config.model_params;
        Self::new(&config.api_url)
            .with_api_key(&config.api_key)
            .with_model(&config.model)
            .with_sampling(params.temperature, params.max_tokens, params.top_p)
            .with_timeout(params.timeout())
    }

    /// Empty key means no Authorization header.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_sampling(mut self, temperature: f64, max_tokens: u32, top_p: f64) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self.top_p = top_p;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.client = build_client(timeout);
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn body(&self, request: &ChatRequest) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: request.messages(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.timeout.as_secs())
        } else {
            LlmError::NetworkError(e)
        }
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[async_trait::async_trait]
impl ChatProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn chat(&self, request: &ChatRequest) -> LlmResult<String> {
        let body = self.body(request);
        debug!(
            "Chat request: model={} messages={}",
            body.model,
            body.messages.len()
        );

        let mut builder = self
            .client
            .post(&self.api_url)
            .header("content-type", "application/json")
            .json(&body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();

        if status != StatusCode::OK {
            let error_text = response.text().await.unwrap_or_default();
            let error_text = preview(&error_text, ERROR_BODY_CHARS);
            error!("Chat API error {}: {}", status, error_text);

            return Err(match status {
                StatusCode::UNAUTHORIZED => LlmError::AuthFailed(error_text),
                StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited(error_text),
                _ => LlmError::RequestFailed(format!("{}: {}", status, error_text)),
            });
        }

        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        let parsed: CompletionResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::InvalidResponse(format!("{}: {}", e, preview(&text, ERROR_BODY_CHARS))))?;

        parsed
            .content()
            .ok_or_else(|| LlmError::InvalidResponse("empty completion".to_string()))
    }
}
