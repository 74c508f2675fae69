//! Inference backends.
//!
//! Each backend sends one prompt and returns the complete (non-streamed)
//! completion text. OpenAI and Groq share the chat completions format.
//! Anthropic uses the messages API. Ollama uses `/api/generate`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use docsort_core::{Error, Result};

use crate::config::LLMConfig;
use crate::types::LLMProvider;

/// A language model that completes a single prompt.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Build the backend selected by `config`.
pub fn create_backend(config: &LLMConfig) -> Result<Arc<dyn InferenceBackend>> {
    let resolved = config.resolve_provider().ok_or_else(|| {
        Error::Config(format!(
            "No usable LLM provider for preference '{}' (missing API key?)",
            config.preferred_provider
        ))
    })?;
    let client = Client::new();
    let key = resolved.api_key.unwrap_or_default();

    let backend: Arc<dyn InferenceBackend> = match resolved.provider {
        LLMProvider::Ollama => Arc::new(OllamaBackend {
            client,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: resolved.model,
            temperature: config.temperature,
        }),
        LLMProvider::OpenAI => Arc::new(OpenAiCompatBackend {
            client,
            name: "openai",
            url: "https://api.openai.com/v1/chat/completions".into(),
            model: resolved.model,
            api_key: key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }),
        LLMProvider::Groq => Arc::new(OpenAiCompatBackend {
            client,
            name: "groq",
            url: "https://api.groq.com/openai/v1/chat/completions".into(),
            model: resolved.model,
            api_key: key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }),
        LLMProvider::Anthropic => Arc::new(AnthropicBackend {
            client,
            model: resolved.model,
            api_key: key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }),
    };

    debug!("Using inference backend {}", backend.name());
    Ok(backend)
}

fn unavailable(backend: &str, e: impl std::fmt::Display) -> Error {
    Error::InferenceUnavailable(format!("{}: {}", backend, e))
}

/// POST `body` and return the parsed JSON response, mapping transport and
/// HTTP status failures to `InferenceUnavailable`.
async fn post_json(
    backend: &str,
    request: reqwest::RequestBuilder,
    body: &Value,
) -> Result<Value> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| unavailable(backend, format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(unavailable(backend, format!("API error {}: {}", status, body)));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| unavailable(backend, format!("Invalid response: {}", e)))
}

fn text_at<'a>(backend: &str, value: &'a Value, pointer: &str) -> Result<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| unavailable(backend, format!("response has no {}", pointer)))
}

// ============================================================
// Ollama
// ============================================================

/// Local Ollama server, non-streaming `/api/generate`.
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
    temperature: f64,
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": self.temperature },
        });

        debug!(model = %self.model, "Sending request to Ollama");

        let request = self
            .client
            .post(format!("{}/api/generate", self.base_url));
        let parsed = post_json(self.name(), request, &body).await?;
        text_at(self.name(), &parsed, "/response").map(str::to_string)
    }
}

// ============================================================
// OpenAI-compatible (OpenAI, Groq)
// ============================================================

pub struct OpenAiCompatBackend {
    client: Client,
    name: &'static str,
    url: String,
    model: String,
    api_key: String,
    temperature: f64,
    max_tokens: usize,
}

#[async_trait]
impl InferenceBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        self.name
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        debug!("Requesting completion from {} with model {}", self.url, self.model);

        let request = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key));
        let parsed = post_json(self.name, request, &body).await?;
        text_at(self.name, &parsed, "/choices/0/message/content").map(str::to_string)
    }
}

// ============================================================
// Anthropic
// ============================================================

pub struct AnthropicBackend {
    client: Client,
    model: String,
    api_key: String,
    temperature: f64,
    max_tokens: usize,
}

#[async_trait]
impl InferenceBackend for AnthropicBackend {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        debug!("Requesting completion from Anthropic with model {}", self.model);

        let request = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01");
        let parsed = post_json(self.name(), request, &body).await?;
        text_at(self.name(), &parsed, "/content/0/text").map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_backend_follows_preference() {
        let config = LLMConfig::default();
        assert_eq!(create_backend(&config).unwrap().name(), "ollama");

        let config = LLMConfig {
            preferred_provider: "groq".into(),
            groq_api_key: Some("gsk-test".into()),
            ..LLMConfig::default()
        };
        assert_eq!(create_backend(&config).unwrap().name(), "groq");
    }

    #[test]
    fn test_create_backend_without_key_is_config_error() {
        let config = LLMConfig {
            preferred_provider: "anthropic".into(),
            anthropic_api_key: None,
            ..LLMConfig::default()
        };
        let err = create_backend(&config).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_text_at_extracts_nested_content() {
        let value = json!({"choices": [{"message": {"content": "Auto"}}]});
        assert_eq!(
            text_at("openai", &value, "/choices/0/message/content").unwrap(),
            "Auto"
        );
        let err = text_at("openai", &json!({}), "/choices/0/message/content").unwrap_err();
        assert!(matches!(err, Error::InferenceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_ollama_is_unavailable() {
        let config = LLMConfig {
            ollama_url: "http://127.0.0.1:9".into(),
            ..LLMConfig::default()
        };
        let backend = create_backend(&config).unwrap();
        let err = backend.complete("hello").await.unwrap_err();
        assert!(matches!(err, Error::InferenceUnavailable(_)));
    }
}
