//! Pipeline events. The single contract between the core and any front end.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};

/// Terminal outcome of one document's trip through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Filed under a real category.
    Success,
    /// Filed into the holding folder because no category fit.
    Uncertain,
    /// Not filed; see `error`.
    Failed,
}

/// What started the processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Watch,
    Manual,
}

/// One event per terminal outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    pub message: String,
    pub trigger: Trigger,
}

impl PipelineEvent {
    fn base(filename: &str, outcome: Outcome, trigger: Trigger, message: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            filename: filename.to_string(),
            category: None,
            summary: None,
            outcome,
            error: None,
            destination: None,
            message,
            trigger,
        }
    }

    /// A filed document. `uncertain` marks a holding-folder result.
    pub fn filed(
        filename: &str,
        category: &str,
        summary: &str,
        destination: PathBuf,
        uncertain: bool,
        trigger: Trigger,
    ) -> Self {
        let outcome = if uncertain {
            Outcome::Uncertain
        } else {
            Outcome::Success
        };
        let message = format!("Processed and moved: {} to {}", filename, category);
        Self {
            category: Some(category.to_string()),
            summary: Some(summary.to_string()),
            destination: Some(destination),
            ..Self::base(filename, outcome, trigger, message)
        }
    }

    /// A document that did not reach its destination.
    pub fn failed(filename: &str, error: &Error, trigger: Trigger) -> Self {
        Self {
            error: Some(error.kind()),
            ..Self::base(filename, Outcome::Failed, trigger, error.to_string())
        }
    }

    /// Attach a non-fatal warning (e.g. the index write after a move failed).
    pub fn with_warning(mut self, error: &Error) -> Self {
        self.error = Some(error.kind());
        self.message = format!("{} (warning: {})", self.message, error);
        self
    }

    /// Record where the file ended up despite a failure.
    pub fn with_destination(mut self, destination: PathBuf) -> Self {
        self.destination = Some(destination);
        self
    }
}
