//! CLI command handling module
//!
//! Handles argument parsing, the startup/shutdown hooks run around every
//! command, and the subcommands themselves.

pub mod commands;
pub mod hooks;
pub mod logging;
mod version;

pub use commands::{Cli, Command, GlobalArgs, print_completions, run};
pub use hooks::{PreRun, Session, StartupFailure, pre_run};
pub use logging::Logger;
pub use version::display_version;
