//! Configuration, category store, errors and pipeline events.

pub mod categories;
pub mod config;
pub mod error;
pub mod events;

pub use categories::{
    validate_category_name, Category, CategorySnapshot, CategoryStore, UNCATEGORIZED,
};
pub use config::{DataPaths, DocSortConfig, SettleConfig, UnknownLabelPolicy};
pub use error::{Error, ErrorKind, Result};
pub use events::{Outcome, PipelineEvent, Trigger};
