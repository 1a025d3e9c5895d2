//! checkpipe library
//!
//! This library provides the core functionality for the checkpipe binary.
//! It can be used both as a binary and as a library for testing.

pub mod cli;
pub mod config;
pub mod tasks;
pub mod templates;

// Re-export commonly used types for convenience
pub use config::{Environment, RuntimeConfig};
pub use templates::{SyncReport, ensure_templates};
