//! Configuration system for checkpipe
//!
//! Configuration is resolved once at startup into a [`RuntimeConfig`] that is
//! then passed by reference to everything that needs it. Sources are layered
//! built-in defaults, config files, environment variables and resolved values
//! (see [`ConfigLoader::resolve`]).

mod defaults;
pub mod env;
pub mod errors;
pub mod loader;
pub mod paths;
pub mod schema;
pub mod token;

pub use env::Environment;
pub use errors::{ConfigError, ErrorAndWarnings};
pub use loader::{ConfigLoader, ResolveOptions, log_level_needs_reset, validate_config};
pub use paths::InstallPaths;
pub use schema::{ConfigFile, Invocation, LogLevel, RuntimeConfig};
pub use token::TokenCache;

/// Get a resolved configuration value by key
///
/// The cloud token is never printed, only whether one is set.
pub fn get_config_value(config: &RuntimeConfig, key: &str) -> anyhow::Result<String> {
    match key {
        "installDir" => Ok(config.install_dir.display().to_string()),
        "workspace" => Ok(config.workspace.display().to_string()),
        "general.logLevel" => Ok(config.log_level.to_string()),
        "general.telemetry" => Ok(config.telemetry.clone()),
        "general.updateCheck" => Ok(config.update_check.to_string()),
        "general.memoryMaxMb" => Ok(config.memory_max_mb.to_string()),
        "cloud.host" => Ok(config.cloud_host.clone()),
        "cloud.token" => Ok(if config.cloud_token.is_some() {
            "<set>".to_string()
        } else {
            "<unset>".to_string()
        }),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}

/// Keys accepted by [`get_config_value`], in display order
pub const CONFIG_KEYS: &[&str] = &[
    "installDir",
    "workspace",
    "general.logLevel",
    "general.telemetry",
    "general.updateCheck",
    "general.memoryMaxMb",
    "cloud.host",
    "cloud.token",
];
