//! Utility modules for configuration and error handling.

pub mod config;
pub mod error;

// Re-export commonly used types for convenience
pub use config::ClientConfig;
pub use error::{CallContext, ClientError, TraceError, TransportError};
