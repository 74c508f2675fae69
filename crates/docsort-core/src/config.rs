//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Name of the holding folder used when none is configured.
pub const DEFAULT_HOLDING_FOLDER: &str = "Uncategorized";

/// Paths to all docsort data files and directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Document index directory (`data/index/`).
    pub index: PathBuf,
    /// Category configuration (`data/categories.json`).
    pub categories_file: PathBuf,
    /// LLM configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
    /// Pipeline event journal (`data/events.jsonl`).
    pub events_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            index: root.join("index"),
            categories_file: root.join("categories.json"),
            llm_config_file: root.join("llm-config.json"),
            events_file: root.join("events.jsonl"),
            root,
        };
        std::fs::create_dir_all(&paths.index)?;
        Ok(paths)
    }
}

/// What to do with a classifier label that is not a configured category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownLabelPolicy {
    /// File under a new ad-hoc folder named after the label.
    #[default]
    Accept,
    /// Route to the holding folder instead.
    Reject,
}

impl FromStr for UnknownLabelPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown label policy: {other}")),
        }
    }
}

/// How long to wait for a newly created file to stop growing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleConfig {
    /// Interval between size/mtime probes.
    pub poll_interval: Duration,
    /// Consecutive identical probes required before the file counts as stable.
    pub stable_polls: u32,
    /// Upper bound on the wait; processing proceeds once it elapses.
    pub timeout: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            stable_polls: 2,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Top-level docsort configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocSortConfig {
    /// HTTP control surface port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Watched input directory.
    pub input_dir: PathBuf,
    /// Root of the category folders.
    pub output_root: PathBuf,
    /// Folder name (under `output_root`) for unresolved documents.
    pub holding_folder: String,
    /// Settle strategy for new files.
    pub settle: SettleConfig,
    /// Maximum documents processed concurrently.
    pub max_workers: usize,
    /// Maximum (category, summary) pairs injected into classification prompts.
    pub history_limit: usize,
    /// Maximum document characters sent to the model.
    pub max_content_chars: usize,
    /// Sentences requested from the summarizer.
    pub summary_sentences: usize,
    /// Treatment of labels outside the configured category set.
    pub unknown_labels: UnknownLabelPolicy,
    /// Schedule files already sitting in the input directory on start.
    pub scan_existing: bool,
    /// Ring the terminal bell on uncertain outcomes.
    pub alert_bell: bool,
    /// Tesseract language(s) used by the OCR fallback.
    pub ocr_language: String,
    /// Render resolution for the OCR fallback.
    pub ocr_dpi: u32,
}

impl DocSortConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let data_paths = DataPaths::new(data_dir)?;
        let root = data_paths.root.clone();

        let input_dir = env_path("DOCSORT_INPUT_DIR").unwrap_or_else(|| root.join("Input"));
        let output_root = env_path("DOCSORT_OUTPUT_DIR").unwrap_or_else(|| root.join("Output"));
        std::fs::create_dir_all(&input_dir)?;
        std::fs::create_dir_all(&output_root)?;

        let defaults = SettleConfig::default();
        let settle = SettleConfig {
            poll_interval: env_parse("DOCSORT_SETTLE_POLL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            stable_polls: env_parse("DOCSORT_SETTLE_STABLE_POLLS").unwrap_or(defaults.stable_polls),
            timeout: env_parse("DOCSORT_SETTLE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        };

        Ok(Self {
            port: env_parse("DOCSORT_PORT").unwrap_or(3004),
            data_paths,
            input_dir,
            output_root,
            holding_folder: std::env::var("DOCSORT_HOLDING_FOLDER")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HOLDING_FOLDER.to_string()),
            settle,
            max_workers: env_parse("DOCSORT_MAX_WORKERS").unwrap_or(2).max(1),
            history_limit: env_parse("DOCSORT_HISTORY_LIMIT").unwrap_or(50),
            max_content_chars: env_parse("DOCSORT_MAX_CONTENT_CHARS").unwrap_or(12_000),
            summary_sentences: env_parse("DOCSORT_SUMMARY_SENTENCES").unwrap_or(3).max(1),
            unknown_labels: env_parse("DOCSORT_UNKNOWN_LABELS").unwrap_or_default(),
            scan_existing: env_parse("DOCSORT_SCAN_EXISTING").unwrap_or(true),
            alert_bell: env_parse("DOCSORT_ALERT_BELL").unwrap_or(true),
            ocr_language: std::env::var("DOCSORT_OCR_LANG")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "eng".to_string()),
            ocr_dpi: env_parse("DOCSORT_OCR_DPI").unwrap_or(300),
        })
    }

    /// Absolute location of the holding folder.
    pub fn holding_dir(&self) -> PathBuf {
        self.output_root.join(&self.holding_folder)
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_paths_layout() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path()).unwrap();
        assert!(paths.index.is_dir());
        assert_eq!(paths.categories_file, dir.path().join("categories.json"));
        assert_eq!(paths.events_file, dir.path().join("events.jsonl"));
    }

    #[test]
    fn test_unknown_label_policy_parse() {
        assert_eq!("accept".parse::<UnknownLabelPolicy>(), Ok(UnknownLabelPolicy::Accept));
        assert_eq!(" Reject ".parse::<UnknownLabelPolicy>(), Ok(UnknownLabelPolicy::Reject));
        assert!("maybe".parse::<UnknownLabelPolicy>().is_err());
    }

    #[test]
    fn test_holding_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DocSortConfig::from_env(dir.path()).unwrap();
        config.output_root = dir.path().join("Out");
        config.holding_folder = "Inbox".into();
        assert_eq!(config.holding_dir(), dir.path().join("Out").join("Inbox"));
    }
}
