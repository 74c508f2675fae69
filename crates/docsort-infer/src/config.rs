//! LLM configuration persistence and provider selection.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{LLMConfigResponse, LLMProvider, ResolvedProvider};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// LLM configuration, read from llm-config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// `ollama`, `openai`, `anthropic`, `groq`, or `auto`.
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_groq_model")]
    pub groq_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Upper bound on a single inference attempt.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Further attempts after the first one fails.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_preferred() -> String {
    "ollama".into()
}
fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.into()
}
fn default_ollama_model() -> String {
    DEFAULT_OLLAMA_MODEL.into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.into()
}
fn default_groq_model() -> String {
    DEFAULT_GROQ_MODEL.into()
}
fn default_temperature() -> f64 {
    0.1
}
fn default_max_tokens() -> usize {
    512
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    1
}
fn default_retry_backoff_ms() -> u64 {
    2000
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            preferred_provider: default_preferred(),
            ollama_url: default_ollama_url(),
            ollama_model: default_ollama_model(),
            openai_api_key: None,
            anthropic_api_key: None,
            groq_api_key: None,
            openai_model: default_openai_model(),
            anthropic_model: default_anthropic_model(),
            groq_model: default_groq_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl LLMConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config: LLMConfig = match std::fs::read_to_string(config_path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!(
                    "Ignoring malformed {}: {}; using defaults",
                    config_path.display(),
                    e
                );
                LLMConfig::default()
            }),
            Err(_) => LLMConfig::default(),
        };

        // Env vars as fallback
        if config.openai_api_key.is_none() {
            config.openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if config.anthropic_api_key.is_none() {
            config.anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        }
        if config.groq_api_key.is_none() {
            config.groq_api_key = std::env::var("GROQ_API_KEY").ok();
        }
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            if !host.trim().is_empty() && config.ollama_url == DEFAULT_OLLAMA_URL {
                config.ollama_url = host;
            }
        }

        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Resolve which provider and model to use.
    pub fn resolve_provider(&self) -> Option<ResolvedProvider> {
        let hosted = |provider, key: &Option<String>, model: &String| {
            key.as_ref().map(|k| ResolvedProvider {
                provider,
                model: model.clone(),
                api_key: Some(k.clone()),
            })
        };
        let ollama = ResolvedProvider {
            provider: LLMProvider::Ollama,
            model: self.ollama_model.clone(),
            api_key: None,
        };

        match self.preferred_provider.as_str() {
            "ollama" => Some(ollama),
            "openai" => hosted(LLMProvider::OpenAI, &self.openai_api_key, &self.openai_model),
            "anthropic" => hosted(
                LLMProvider::Anthropic,
                &self.anthropic_api_key,
                &self.anthropic_model,
            ),
            "groq" => hosted(LLMProvider::Groq, &self.groq_api_key, &self.groq_model),
            // Auto mode: Anthropic > Groq > OpenAI > local Ollama
            "auto" => hosted(
                LLMProvider::Anthropic,
                &self.anthropic_api_key,
                &self.anthropic_model,
            )
            .or_else(|| hosted(LLMProvider::Groq, &self.groq_api_key, &self.groq_model))
            .or_else(|| hosted(LLMProvider::OpenAI, &self.openai_api_key, &self.openai_model))
            .or(Some(ollama)),
            _ => None,
        }
    }

    /// Build the public config summary (no API keys exposed).
    pub fn to_response(&self) -> LLMConfigResponse {
        let resolved = self.resolve_provider();
        LLMConfigResponse {
            preferred_provider: self.preferred_provider.clone(),
            active_provider: resolved.as_ref().map(|r| r.provider.to_string()),
            active_model: resolved.map(|r| r.model),
            openai_configured: self.openai_api_key.is_some(),
            anthropic_configured: self.anthropic_api_key.is_some(),
            groq_configured: self.groq_api_key.is_some(),
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
        }
    }
}
