//! Classifier/summarizer: prompt, invoke, trim.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use docsort_core::{Error, Result};
use docsort_store::HistoryEntry;

use crate::config::LLMConfig;
use crate::prompt::{build_classification_prompt, build_summary_prompt};
use crate::providers::InferenceBackend;

/// Sends classification and summary prompts to a backend under a
/// timeout-and-retry policy.
///
/// Labels are returned as the model produced them (trimmed). Whether a label
/// is a configured category is decided at filing time.
pub struct Classifier {
    backend: Arc<dyn InferenceBackend>,
    timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
    max_content_chars: usize,
}

impl Classifier {
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        config: &LLMConfig,
        max_content_chars: usize,
    ) -> Self {
        Self::with_policy(
            backend,
            config.timeout(),
            config.max_retries,
            config.retry_backoff(),
            max_content_chars,
        )
    }

    pub fn with_policy(
        backend: Arc<dyn InferenceBackend>,
        timeout: Duration,
        max_retries: u32,
        retry_backoff: Duration,
        max_content_chars: usize,
    ) -> Self {
        Self {
            backend,
            timeout,
            max_retries,
            retry_backoff,
            max_content_chars,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Ask for a single category label.
    pub async fn classify(
        &self,
        content: &str,
        categories: &[String],
        history: &[HistoryEntry],
    ) -> Result<String> {
        let prompt =
            build_classification_prompt(content, categories, history, self.max_content_chars);
        let label = self.invoke(&prompt).await?;
        debug!("Classifier answered {:?}", label);
        Ok(label)
    }

    /// Ask for a summary of `sentence_count` sentences.
    pub async fn summarize(&self, content: &str, sentence_count: usize) -> Result<String> {
        let prompt = build_summary_prompt(content, sentence_count, self.max_content_chars);
        self.invoke(&prompt).await
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        let attempts = self.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.timeout, self.backend.complete(prompt)).await {
                Ok(Ok(text)) => return Ok(text.trim().to_string()),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => {
                    last_error = format!(
                        "{} timed out after {}s",
                        self.backend.name(),
                        self.timeout.as_secs_f32()
                    )
                }
            }

            if attempt < attempts {
                warn!(
                    "Inference attempt {}/{} failed: {}; retrying",
                    attempt, attempts, last_error
                );
                tokio::time::sleep(self.retry_backoff).await;
            }
        }

        Err(Error::InferenceUnavailable(format!(
            "{} (after {} attempts)",
            last_error, attempts
        )))
    }
}
