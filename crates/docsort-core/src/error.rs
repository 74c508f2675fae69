//! Error types for docsort.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),

    #[error("Inference unavailable: {0}")]
    InferenceUnavailable(String),

    #[error("Category already exists: {0}")]
    DuplicateCategory(String),

    #[error("Category name is reserved: {0}")]
    ReservedCategory(String),

    #[error("Invalid category name: {0:?}")]
    InvalidCategory(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Filing error: {0}")]
    FilingError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Coarse classification used in pipeline events and API responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnreadableDocument(_) => ErrorKind::UnreadableDocument,
            Error::InferenceUnavailable(_) => ErrorKind::InferenceUnavailable,
            Error::DuplicateCategory(_) => ErrorKind::DuplicateCategory,
            Error::ReservedCategory(_) => ErrorKind::ReservedCategory,
            Error::InvalidCategory(_) => ErrorKind::InvalidCategory,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::IndexUnavailable(_) => ErrorKind::IndexUnavailable,
            Error::FilingError(_) => ErrorKind::FilingError,
            Error::Config(_) | Error::Io(_) | Error::Json(_) | Error::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Serializable error classification carried by pipeline events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnreadableDocument,
    InferenceUnavailable,
    DuplicateCategory,
    ReservedCategory,
    InvalidCategory,
    NotFound,
    IndexUnavailable,
    FilingError,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::UnreadableDocument => "unreadable_document",
            ErrorKind::InferenceUnavailable => "inference_unavailable",
            ErrorKind::DuplicateCategory => "duplicate_category",
            ErrorKind::ReservedCategory => "reserved_category",
            ErrorKind::InvalidCategory => "invalid_category",
            ErrorKind::NotFound => "not_found",
            ErrorKind::IndexUnavailable => "index_unavailable",
            ErrorKind::FilingError => "filing_error",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
