//! Runtime types.

use std::path::PathBuf;

use serde::Serialize;

/// Stage of one document's trip through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Detected,
    Settling,
    Extracting,
    Classifying,
    Summarizing,
    Filing,
    Indexed,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Detected => "detected",
            Stage::Settling => "settling",
            Stage::Extracting => "extracting",
            Stage::Classifying => "classifying",
            Stage::Summarizing => "summarizing",
            Stage::Filing => "filing",
            Stage::Indexed => "indexed",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of waiting for a new file to stop changing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Size and mtime held still for the configured number of probes.
    Stable,
    /// The timeout elapsed first; the file is processed anyway.
    TimedOut,
    /// The file disappeared while waiting.
    Vanished,
}

/// Watch loop status.
#[derive(Debug, Clone, Serialize)]
pub struct WatchStatus {
    pub running: bool,
    #[serde(rename = "inputDir")]
    pub input_dir: PathBuf,
    #[serde(rename = "inFlight")]
    pub in_flight: usize,
    #[serde(rename = "maxWorkers")]
    pub max_workers: usize,
    #[serde(rename = "startedAt", skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
}
