//! SQLite document index keyed by filename.

pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::DocumentIndex;
pub use types::*;
