//! Provider-agnostic completion types and the `LlmProvider` trait.

use async_trait::async_trait;

use crate::error::LlmError;

/// A single-prompt completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Overrides the provider's configured model.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl From<&str> for CompletionRequest {
    fn from(prompt: &str) -> Self {
        Self::new(prompt)
    }
}

impl From<String> for CompletionRequest {
    fn from(prompt: String) -> Self {
        Self::new(prompt)
    }
}

/// Text returned by a provider.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A text-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name used in logs and errors ("gemini", "groq").
    fn name(&self) -> &str;

    /// Default model identifier.
    fn model_name(&self) -> &str;

    /// Run one completion. Single attempt, no retries.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Classify a non-success HTTP status into an `LlmError`.
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode, body: String) -> LlmError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        LlmError::AuthFailed {
            provider: provider.to_string(),
        }
    } else {
        LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: format!("HTTP {}: {}", status, body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_sets_fields() {
        let req = CompletionRequest::new("hi")
            .with_model("m")
            .with_temperature(0.2)
            .with_max_tokens(64);
        assert_eq!(req.prompt, "hi");
        assert_eq!(req.model.as_deref(), Some("m"));
        assert_eq!(req.temperature, Some(0.2));
        assert_eq!(req.max_tokens, Some(64));
    }

    #[test]
    fn auth_statuses_map_to_auth_failed() {
        let err = status_error("groq", reqwest::StatusCode::UNAUTHORIZED, String::new());
        assert!(matches!(err, LlmError::AuthFailed { .. }));

        let err = status_error("groq", reqwest::StatusCode::BAD_GATEWAY, "down".into());
        match err {
            LlmError::RequestFailed { reason, .. } => assert!(reason.contains("502")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
