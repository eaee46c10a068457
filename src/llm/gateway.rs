//! Model gateway: ordered provider fallback behind one completion call.
//!
//! Providers are tried in configuration order, one attempt each. A slot
//! without credentials is skipped without a network call. When every slot
//! is skipped or fails, `complete()` hands back a degraded text payload
//! instead of an error so callers can always interpret *something*.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::provider::{CompletionRequest, LlmProvider};
use super::{LlmConfig, create_provider};
use crate::error::LlmError;

/// Prefix of the text `complete()` returns when no provider answered.
pub const DEGRADED_PREFIX: &str = "Error calling LLM: ";

enum Slot {
    Ready(Arc<dyn LlmProvider>),
    Unconfigured(String),
}

/// Ordered list of text-completion providers with fallback.
pub struct ModelGateway {
    slots: Vec<Slot>,
}

impl ModelGateway {
    /// Build from already-constructed providers, in fallback order.
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self {
            slots: providers.into_iter().map(Slot::Ready).collect(),
        }
    }

    /// Build from provider configs, in fallback order.
    ///
    /// Configs without an API key become skipped slots.
    pub fn from_configs(configs: &[LlmConfig]) -> Self {
        let slots = configs
            .iter()
            .map(|config| match create_provider(config) {
                Ok(provider) => {
                    info!(
                        provider = provider.name(),
                        model = provider.model_name(),
                        "LLM provider configured"
                    );
                    Slot::Ready(provider)
                }
                Err(e) => {
                    warn!(backend = %config.backend, error = %e, "LLM provider unavailable");
                    Slot::Unconfigured(e.to_string())
                }
            })
            .collect();
        Self { slots }
    }

    /// Number of providers that have credentials.
    pub fn configured_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Ready(_)))
            .count()
    }

    /// Run the request through providers in order; error only when all are exhausted.
    ///
    /// Sampling options on the request are forwarded to every provider tried.
    pub async fn try_complete(
        &self,
        request: impl Into<CompletionRequest>,
    ) -> Result<String, LlmError> {
        let request = request.into();
        let mut last_reason = String::from("no providers configured");

        for slot in &self.slots {
            let provider = match slot {
                Slot::Ready(provider) => provider,
                Slot::Unconfigured(reason) => {
                    debug!(reason = %reason, "Skipping unconfigured provider");
                    last_reason = reason.clone();
                    continue;
                }
            };

            match provider.complete(request.clone()).await {
                Ok(response) => {
                    debug!(
                        provider = provider.name(),
                        input_tokens = response.input_tokens,
                        output_tokens = response.output_tokens,
                        "LLM call succeeded"
                    );
                    return Ok(response.content);
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "LLM provider failed, trying next"
                    );
                    last_reason = e.to_string();
                }
            }
        }

        Err(LlmError::ModelUnavailable { last_reason })
    }

    /// Like `try_complete`, but exhaustion becomes `"Error calling LLM: <reason>"` text.
    pub async fn complete(&self, request: impl Into<CompletionRequest>) -> String {
        match self.try_complete(request).await {
            Ok(text) => text,
            Err(LlmError::ModelUnavailable { last_reason }) => {
                warn!(reason = %last_reason, "All LLM providers exhausted");
                format!("{DEGRADED_PREFIX}{last_reason}")
            }
            Err(e) => format!("{DEGRADED_PREFIX}{e}"),
        }
    }
}
