//! Shared application state.

use std::sync::Arc;

use tracing::info;

use docsort_core::{CategoryStore, DocSortConfig, Result};
use docsort_infer::{create_backend, Classifier, LLMConfig};
use docsort_ingest::ContentExtractor;
use docsort_runtime::{ManualReview, Pipeline, WatchLoop};
use docsort_store::DocumentIndex;

/// Shared application state accessible from all route handlers and CLI
/// commands.
pub struct AppState {
    pub config: DocSortConfig,
    pub llm_config: LLMConfig,
    pub categories: Arc<CategoryStore>,
    pub index: Arc<DocumentIndex>,
    pub pipeline: Arc<Pipeline>,
    pub watch: WatchLoop,
    pub review: ManualReview,
}

impl AppState {
    /// Wire up the full stack from configuration: category store, index,
    /// pdf-extract + Tesseract extraction, and the configured LLM backend.
    pub fn new(config: DocSortConfig) -> Result<Self> {
        let llm_config = LLMConfig::load(&config.data_paths.llm_config_file);
        let backend = create_backend(&llm_config)?;
        info!(
            "Inference backend: {} (timeout {}s, {} retries)",
            backend.name(),
            llm_config.timeout_secs,
            llm_config.max_retries
        );

        let classifier = Classifier::new(backend, &llm_config, config.max_content_chars);
        let extractor = ContentExtractor::with_tesseract(&config.ocr_language, config.ocr_dpi);
        Self::with_components(config, llm_config, extractor, classifier)
    }

    /// Build state around an explicit extractor and classifier.
    pub fn with_components(
        config: DocSortConfig,
        llm_config: LLMConfig,
        extractor: ContentExtractor,
        classifier: Classifier,
    ) -> Result<Self> {
        let categories = Arc::new(CategoryStore::load(&config.data_paths.categories_file)?);
        let index = Arc::new(DocumentIndex::open(&config.data_paths.index)?);

        let pipeline = Arc::new(Pipeline::new(
            &config,
            Arc::clone(&categories),
            Arc::clone(&index),
            Arc::new(extractor),
            Arc::new(classifier),
        ));
        let watch = WatchLoop::new(Arc::clone(&pipeline), &config);
        let review = ManualReview::new(Arc::clone(&pipeline));

        Ok(Self {
            config,
            llm_config,
            categories,
            index,
            pipeline,
            watch,
            review,
        })
    }
}
