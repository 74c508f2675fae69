//! Data types for indexed documents.

use serde::{Deserialize, Serialize};

/// A document row from the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub filename: String,
    pub category: String,
    pub summary: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A prior (category, summary) pair used as classification context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub category: String,
    pub summary: String,
}

/// Index-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_documents: i64,
    pub categories: Vec<(String, i64)>,
    pub db_path: String,
    pub db_size_mb: f64,
}
