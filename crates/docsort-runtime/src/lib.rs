//! docsort runtime: the classification pipeline, the watch loop that feeds
//! it, and manual review of the holding folder.

pub mod filing;
pub mod journal;
pub mod orchestrator;
pub mod review;
pub mod types;
pub mod watch;

#[cfg(test)]
pub(crate) mod testutil;

pub use filing::{resolve_category, FilingEngine};
pub use journal::EventJournal;
pub use orchestrator::Pipeline;
pub use review::ManualReview;
pub use types::*;
pub use watch::{wait_until_stable, WatchLoop};
