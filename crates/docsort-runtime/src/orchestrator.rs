//! Pipeline: extract → classify → summarize → file → index.
//!
//! Every document yields exactly one [`PipelineEvent`]. Errors never escape
//! `process_file`; they become `failed` events. The only irreversible step,
//! the move, happens after both model calls have succeeded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use docsort_core::{
    CategorySnapshot, CategoryStore, DocSortConfig, Error, Outcome, PipelineEvent, Result,
    Trigger, UnknownLabelPolicy, UNCATEGORIZED,
};
use docsort_infer::Classifier;
use docsort_ingest::ContentExtractor;
use docsort_store::DocumentIndex;

use crate::filing::FilingEngine;
use crate::journal::EventJournal;
use crate::types::Stage;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Run blocking work (PDF parsing, OCR, SQLite, renames) off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("Blocking task failed: {}", e)))?
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// The classification-and-filing pipeline shared by the watch loop and
/// manual review.
pub struct Pipeline {
    categories: Arc<CategoryStore>,
    index: Arc<DocumentIndex>,
    extractor: Arc<ContentExtractor>,
    classifier: Arc<Classifier>,
    filing: FilingEngine,
    journal: EventJournal,
    events: broadcast::Sender<PipelineEvent>,
    history_limit: usize,
    summary_sentences: usize,
    unknown_labels: UnknownLabelPolicy,
    alert_bell: bool,
}

impl Pipeline {
    pub fn new(
        config: &DocSortConfig,
        categories: Arc<CategoryStore>,
        index: Arc<DocumentIndex>,
        extractor: Arc<ContentExtractor>,
        classifier: Arc<Classifier>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            categories,
            index,
            extractor,
            classifier,
            filing: FilingEngine::from_config(config),
            journal: EventJournal::new(&config.data_paths.events_file),
            events,
            history_limit: config.history_limit,
            summary_sentences: config.summary_sentences,
            unknown_labels: config.unknown_labels,
            alert_bell: config.alert_bell,
        }
    }

    /// Subscribe to pipeline events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub fn categories(&self) -> &Arc<CategoryStore> {
        &self.categories
    }

    pub fn index(&self) -> &Arc<DocumentIndex> {
        &self.index
    }

    pub fn filing(&self) -> &FilingEngine {
        &self.filing
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    /// Process a file detected in the input directory.
    pub async fn process_file(&self, path: &Path) -> PipelineEvent {
        let filename = file_name_of(path);
        let snapshot = self.categories.snapshot();
        debug!(stage = %Stage::Detected, "{}", filename);

        let text = match self.extract(path).await {
            Ok(text) => text,
            Err(e) => return self.route_unreadable(path, &filename, e).await,
        };

        let (label, summary) = match self.infer(&text, &snapshot).await {
            Ok(pair) => pair,
            Err(e) => return self.emit(PipelineEvent::failed(&filename, &e, Trigger::Watch)),
        };

        let category = self.filing.resolve(&label, &snapshot, self.unknown_labels);
        if category != label {
            debug!("Label {:?} resolved to {}", label, category);
        }

        self.file_and_index(path, &filename, &category, &summary, snapshot, Trigger::Watch)
            .await
    }

    /// Process a file from the holding folder under an operator-chosen
    /// category. Any failure before the move leaves the file where it is.
    pub async fn process_manual(&self, path: &Path, category: &str) -> PipelineEvent {
        let filename = file_name_of(path);
        let snapshot = self.categories.snapshot();

        let text = match self.extract(path).await {
            Ok(text) => text,
            Err(e) => return self.emit(PipelineEvent::failed(&filename, &e, Trigger::Manual)),
        };

        debug!(stage = %Stage::Summarizing, "{}", filename);
        let summary = match self
            .classifier
            .summarize(&text, self.summary_sentences)
            .await
        {
            Ok(summary) => summary,
            Err(e) => return self.emit(PipelineEvent::failed(&filename, &e, Trigger::Manual)),
        };

        self.file_and_index(path, &filename, category, &summary, snapshot, Trigger::Manual)
            .await
    }

    async fn extract(&self, path: &Path) -> Result<String> {
        debug!(stage = %Stage::Extracting, "{}", path.display());
        let extractor = Arc::clone(&self.extractor);
        let path = path.to_path_buf();
        blocking(move || extractor.extract(&path)).await
    }

    /// Classify with history context, then summarize.
    async fn infer(&self, text: &str, snapshot: &CategorySnapshot) -> Result<(String, String)> {
        let index = Arc::clone(&self.index);
        let limit = self.history_limit;
        let history = match blocking(move || index.history(limit)).await {
            Ok(history) => history,
            Err(e) => {
                warn!("Classifying without history: {}", e);
                Vec::new()
            }
        };

        debug!(stage = %Stage::Classifying, history = history.len(), "classifying");
        let label = self
            .classifier
            .classify(text, &snapshot.names(), &history)
            .await?;

        debug!(stage = %Stage::Summarizing, "summarizing");
        let summary = self
            .classifier
            .summarize(text, self.summary_sentences)
            .await?;

        Ok((label, summary))
    }

    /// Unreadable documents go to the holding folder for manual review.
    async fn route_unreadable(&self, path: &Path, filename: &str, err: Error) -> PipelineEvent {
        let event = PipelineEvent::failed(filename, &err, Trigger::Watch);
        let filing = self.filing.clone();
        let source = path.to_path_buf();
        match blocking(move || filing.file_to_holding(&source)).await {
            Ok(destination) => self.emit(event.with_destination(destination)),
            Err(move_err) => {
                error!("Could not move unreadable {} to holding: {}", filename, move_err);
                self.emit(event)
            }
        }
    }

    async fn file_and_index(
        &self,
        path: &Path,
        filename: &str,
        category: &str,
        summary: &str,
        snapshot: CategorySnapshot,
        trigger: Trigger,
    ) -> PipelineEvent {
        debug!(stage = %Stage::Filing, "{} -> {}", filename, category);
        let filing = self.filing.clone();
        let source = path.to_path_buf();
        let target = category.to_string();
        let destination: PathBuf =
            match blocking(move || filing.file(&source, &target, &snapshot)).await {
                Ok(destination) => destination,
                Err(e) => return self.emit(PipelineEvent::failed(filename, &e, trigger)),
            };

        let event = PipelineEvent::filed(
            filename,
            category,
            summary,
            destination,
            category == UNCATEGORIZED,
            trigger,
        );

        let index = Arc::clone(&self.index);
        let (name, cat, sum) = (filename.to_string(), category.to_string(), summary.to_string());
        match blocking(move || index.upsert(&name, &cat, &sum)).await {
            Ok(()) => {
                debug!(stage = %Stage::Indexed, "{}", filename);
                self.emit(event)
            }
            Err(e) => self.emit(event.with_warning(&e)),
        }
    }

    /// Log, journal, and broadcast a terminal event.
    fn emit(&self, event: PipelineEvent) -> PipelineEvent {
        match event.outcome {
            Outcome::Success if event.error.is_some() => warn!("{}", event.message),
            Outcome::Success => info!("{}", event.message),
            Outcome::Uncertain => {
                warn!("Uncertain classification: {}", event.message);
                if self.alert_bell {
                    eprint!("\x07");
                }
            }
            Outcome::Failed => {
                error!(stage = %Stage::Failed, "Failed to process {}: {}", event.filename, event.message)
            }
        }

        if let Err(e) = self.journal.append(&event) {
            warn!("Could not journal event for {}: {}", event.filename, e);
        }

        // No subscribers is fine.
        let _ = self.events.send(event.clone());
        event
    }
}
