//! Text-generation model seam.
//!
//! Both the topic and the script stage talk to a model through
//! [`TextModel`]: one prompt in, one block of text out. The production
//! implementation wraps the Claude client; tests use
//! [`crate::testing::MockModel`].

use async_trait::async_trait;
use claude::{Claude, Message, Request, Response};
use std::time::Duration;
use thiserror::Error;

/// Errors from a model invocation.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Claude API error: {0}")]
    Api(#[from] claude::Error),

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Model output was cut off at the token limit")]
    Truncated,

    #[error("Model unavailable: {0}")]
    Unavailable(String),
}

/// A prompt-in, text-out generation service.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Generate a completion for a single user prompt.
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;

    /// Model identifier, for logs.
    fn name(&self) -> &str;
}

/// Invoke a model with a hard deadline.
///
/// Expiry is reported as [`ModelError::Timeout`] so callers handle it on the
/// same path as any other model failure.
pub async fn generate_with_timeout(
    model: &dyn TextModel,
    prompt: &str,
    timeout: Duration,
) -> Result<String, ModelError> {
    match tokio::time::timeout(timeout, model.generate(prompt)).await {
        Ok(result) => result,
        Err(_) => Err(ModelError::Timeout(timeout)),
    }
}

/// Configuration for a Claude-backed model.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model to request (client default when `None`).
    pub model: Option<String>,

    /// Maximum tokens for the reply.
    pub max_tokens: usize,

    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl ModelConfig {
    /// Settings suited to the short topic prompt.
    pub fn topic() -> Self {
        Self {
            model: None,
            max_tokens: 64,
            temperature: Some(1.0),
        }
    }

    /// Settings suited to script generation.
    pub fn script() -> Self {
        Self {
            model: None,
            max_tokens: 8192,
            temperature: Some(0.8),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Text of a finished completion.
///
/// A reply that hit `max_tokens` is partial code or prose and is never
/// handed on as if it were complete.
fn completion_text(response: &Response) -> Result<String, ModelError> {
    if response.is_truncated() {
        return Err(ModelError::Truncated);
    }
    Ok(response.text())
}

/// [`TextModel`] backed by the Claude Messages API.
#[derive(Clone)]
pub struct ClaudeModel {
    client: Claude,
    config: ModelConfig,
    name: String,
}

impl ClaudeModel {
    pub fn new(client: Claude, config: ModelConfig) -> Self {
        let name = config
            .model
            .clone()
            .unwrap_or_else(|| client.model().to_string());
        Self {
            client,
            config,
            name,
        }
    }

    fn build_request(&self, prompt: &str) -> Request {
        let mut request =
            Request::new(vec![Message::user(prompt)]).with_max_tokens(self.config.max_tokens);

        if let Some(ref model) = self.config.model {
            request = request.with_model(model);
        }

        if let Some(temp) = self.config.temperature {
            request = request.with_temperature(temp);
        }

        request
    }
}

#[async_trait]
impl TextModel for ClaudeModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let response = self.client.complete(self.build_request(prompt)).await?;
        completion_text(&response)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
