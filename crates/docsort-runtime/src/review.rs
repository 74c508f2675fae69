//! Manual review of documents parked in the holding folder.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use docsort_core::{validate_category_name, Error, PipelineEvent, Result};
use docsort_ingest::is_candidate;

use crate::orchestrator::Pipeline;

pub struct ManualReview {
    pipeline: Arc<Pipeline>,
}

impl ManualReview {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    /// Sorted names of the files waiting in the holding folder.
    pub fn list_pending(&self) -> Result<Vec<String>> {
        let holding = self.pipeline.filing().holding_dir();
        std::fs::create_dir_all(&holding)?;

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&holding)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() || !is_candidate(&entry.path()) {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(names)
    }

    /// File a pending document under `category`.
    ///
    /// Argument errors (`NotFound`, `InvalidCategory`) are returned as `Err`;
    /// pipeline failures come back as a `failed` event with the file still in
    /// the holding folder.
    pub async fn classify_manually(&self, filename: &str, category: &str) -> Result<PipelineEvent> {
        let bare = Path::new(filename).file_name().and_then(|n| n.to_str());
        if filename.is_empty() || bare != Some(filename) || filename.starts_with('.') {
            return Err(Error::NotFound(filename.to_string()));
        }

        let category = category.trim();
        validate_category_name(category)?;
        let category = self.pipeline.filing().canonical(category);

        let path = self.pipeline.filing().holding_dir().join(filename);
        if !path.is_file() {
            return Err(Error::NotFound(filename.to_string()));
        }

        info!("Manual classification: {} -> {}", filename, category);
        Ok(self.pipeline.process_manual(&path, &category).await)
    }
}
