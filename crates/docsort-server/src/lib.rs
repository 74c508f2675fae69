//! docsort server library: application state, HTTP routes and CLI commands
//! shared by the `docsort` binary and its integration tests.

pub mod cli;
pub mod routes;
pub mod state;

pub use state::AppState;
