//! Shared fixtures for runtime tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use docsort_core::{CategoryStore, DocSortConfig, Error, Result, SettleConfig, UNCATEGORIZED};
use docsort_infer::{Classifier, InferenceBackend};
use docsort_ingest::{ContentExtractor, OcrEngine, TextSource};
use docsort_store::DocumentIndex;

use crate::orchestrator::Pipeline;

/// Reads `.pdf` test files as plain text.
pub struct PlainTextSource;

impl TextSource for PlainTextSource {
    fn extract_text(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| Error::UnreadableDocument(e.to_string()))
    }
}

/// OCR that never finds text.
pub struct BlankOcr;

impl OcrEngine for BlankOcr {
    fn recognize_first_page(&self, _path: &Path) -> Result<String> {
        Ok(String::new())
    }
}

struct Answer {
    label: String,
    summary: String,
    available: bool,
}

/// Model stand-in: answers summary prompts with a fixed summary and every
/// other prompt with a fixed label.
pub struct ScriptedModel {
    answer: Mutex<Answer>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn answering(label: &str, summary: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(Answer {
                label: label.into(),
                summary: summary.into(),
                available: true,
            }),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        let model = Self::answering("", "");
        model.answer.lock().available = false;
        model
    }

    pub fn set_answer(&self, label: &str, summary: &str) {
        let mut answer = self.answer.lock();
        answer.label = label.into();
        answer.summary = summary.into();
        answer.available = true;
    }

    pub fn set_available(&self, available: bool) {
        self.answer.lock().available = available;
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn classification_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .iter()
            .filter(|p| p.contains("# Categories"))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl InferenceBackend for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        let answer = self.answer.lock();
        if !answer.available {
            return Err(Error::InferenceUnavailable("connection refused".into()));
        }
        if prompt.contains("Summarize the following document") {
            Ok(answer.summary.clone())
        } else {
            Ok(answer.label.clone())
        }
    }
}

/// A pipeline over temporary directories.
pub struct Fixture {
    pub _dir: TempDir,
    pub config: DocSortConfig,
    pub input: PathBuf,
    pub output: PathBuf,
    pub index: Arc<DocumentIndex>,
    pub model: Arc<ScriptedModel>,
    pub pipeline: Arc<Pipeline>,
}

impl Fixture {
    pub fn new(model: Arc<ScriptedModel>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DocSortConfig::from_env(dir.path()).unwrap();
        config.input_dir = dir.path().join("Input");
        config.output_root = dir.path().join("Output");
        config.holding_folder = UNCATEGORIZED.to_string();
        config.alert_bell = false;
        config.max_workers = 2;
        config.settle = SettleConfig {
            poll_interval: Duration::from_millis(20),
            stable_polls: 2,
            timeout: Duration::from_secs(5),
        };
        std::fs::create_dir_all(&config.input_dir).unwrap();
        std::fs::create_dir_all(&config.output_root).unwrap();

        let categories = Arc::new(CategoryStore::load(&config.data_paths.categories_file).unwrap());
        let index = Arc::new(DocumentIndex::open(&config.data_paths.index).unwrap());
        let extractor = Arc::new(ContentExtractor::new(
            Box::new(PlainTextSource),
            Box::new(BlankOcr),
        ));
        let classifier = Arc::new(Classifier::with_policy(
            model.clone(),
            Duration::from_secs(5),
            0,
            Duration::from_millis(1),
            10_000,
        ));
        let pipeline = Arc::new(Pipeline::new(
            &config,
            categories,
            Arc::clone(&index),
            extractor,
            classifier,
        ));

        Self {
            input: config.input_dir.clone(),
            output: config.output_root.clone(),
            _dir: dir,
            config,
            index,
            model,
            pipeline,
        }
    }

    /// Write a file into the input directory.
    pub fn drop_input(&self, name: &str, content: &str) -> PathBuf {
        let path = self.input.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Write a file into the holding folder.
    pub fn drop_holding(&self, name: &str, content: &str) -> PathBuf {
        let holding = self.pipeline.filing().holding_dir();
        std::fs::create_dir_all(&holding).unwrap();
        let path = holding.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}
