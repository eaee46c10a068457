//! LLM integration for inbox-triage.
//!
//! Supports:
//! - **Gemini**: Google `generateContent` REST API (primary)
//! - **Groq**: OpenAI-compatible chat completions (fallback)
//!
//! Both sit behind the `LlmProvider` trait; `ModelGateway` orders them and
//! masks individual provider failures.

pub mod gateway;
pub mod gemini;
pub mod groq;
pub mod provider;

pub use gateway::{DEGRADED_PREFIX, ModelGateway};
pub use gemini::GeminiProvider;
pub use groq::GroqProvider;
pub use provider::*;

use std::sync::Arc;

use crate::error::LlmError;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
    Groq,
}

impl std::fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Groq => write!(f, "groq"),
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    /// Missing key means the provider is skipped.
    pub api_key: Option<secrecy::SecretString>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl LlmConfig {
    pub fn new(backend: LlmBackend, api_key: Option<secrecy::SecretString>) -> Self {
        Self {
            backend,
            api_key,
            model: None,
            base_url: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let api_key = config.api_key.clone().ok_or_else(|| LlmError::NotConfigured {
        provider: config.backend.to_string(),
    })?;

    let provider: Arc<dyn LlmProvider> = match config.backend {
        LlmBackend::Gemini => {
            let mut p = GeminiProvider::new(api_key, config.model.clone());
            if let Some(url) = &config.base_url {
                p = p.with_base_url(url.clone());
            }
            Arc::new(p)
        }
        LlmBackend::Groq => {
            let mut p = GroqProvider::new(api_key, config.model.clone());
            if let Some(url) = &config.base_url {
                p = p.with_base_url(url.clone());
            }
            Arc::new(p)
        }
    };
    Ok(provider)
}
