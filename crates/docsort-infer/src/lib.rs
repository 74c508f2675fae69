//! Language-model inference for docsort.
//!
//! Builds the classification and summary prompts and sends them to a
//! configured backend: a local Ollama server or a hosted API
//! (OpenAI, Groq, Anthropic). Each call is bounded by a timeout and retried
//! according to [`LLMConfig`].

pub mod classifier;
pub mod config;
pub mod prompt;
pub mod providers;
pub mod types;

pub use classifier::Classifier;
pub use config::LLMConfig;
pub use providers::{create_backend, InferenceBackend};
pub use types::*;
