//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::pipeline::CategoryPolicy;

const DEFAULT_DB_PATH: &str = "./data/inbox-triage.db";
const DEFAULT_PORT: u16 = 8000;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// libSQL database file.
    pub db_path: PathBuf,
    /// HTTP API port.
    pub port: u16,
    /// Model providers in fallback order (Gemini, then Groq).
    pub providers: Vec<LlmConfig>,
    pub category_policy: CategoryPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            port: DEFAULT_PORT,
            providers: vec![
                LlmConfig::new(LlmBackend::Gemini, None),
                LlmConfig::new(LlmBackend::Groq, None),
            ],
            category_policy: CategoryPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Unset and empty values fall back to defaults.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = var("TRIAGE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let port = match var("TRIAGE_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "TRIAGE_PORT".into(),
                message: format!("{raw:?}: {e}"),
            })?,
            None => DEFAULT_PORT,
        };

        let category_policy = match var("TRIAGE_CATEGORY_POLICY") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "TRIAGE_CATEGORY_POLICY".into(),
                message,
            })?,
            None => CategoryPolicy::default(),
        };

        let providers = vec![
            LlmConfig::new(
                LlmBackend::Gemini,
                var("GEMINI_API_KEY").map(SecretString::from),
            )
            .with_model(var("GEMINI_MODEL")),
            LlmConfig::new(LlmBackend::Groq, var("GROQ_API_KEY").map(SecretString::from))
                .with_model(var("GROQ_MODEL")),
        ];

        Ok(Self {
            db_path,
            port,
            providers,
            category_policy,
        })
    }
}
