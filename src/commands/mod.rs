//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the client to perform user tasks.

pub mod query;
pub mod watch;

// Re-export main command functions
pub use query::{connect, execute_query, run_query, validate_query, Query};
pub use watch::{execute_watch, watch_blocks, WatchArgs};
