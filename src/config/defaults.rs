//! Default configuration values
//!
//! Provides the built-in defaults layer that config files and the
//! environment are merged over.

use super::schema::{CloudOptions, ConfigFile, GeneralOptions, LogLevel};

pub const DEFAULT_TELEMETRY: &str = "info";
pub const DEFAULT_CLOUD_HOST: &str = "cloud.checkpipe.io";
pub const DEFAULT_UPDATE_CHECK: bool = true;
pub const DEFAULT_MEMORY_MAX_MB: i64 = 0;

/// Get the built-in defaults layer
pub fn default_config() -> ConfigFile {
    ConfigFile {
        general: GeneralOptions {
            log_level: None,
            telemetry: Some(DEFAULT_TELEMETRY.to_string()),
            telemetry_level: None,
            update_check: Some(DEFAULT_UPDATE_CHECK),
            memory_max_mb: Some(DEFAULT_MEMORY_MAX_MB),
        },
        cloud: CloudOptions {
            host: Some(DEFAULT_CLOUD_HOST.to_string()),
            token: None,
        },
    }
}

/// Log level used until configuration has been resolved
pub fn default_log_level() -> LogLevel {
    LogLevel::default()
}

#[cfg(test)]
pub(crate) fn runtime_config_for_tests() -> super::RuntimeConfig {
    super::RuntimeConfig {
        invocation: super::Invocation::default(),
        install_dir: std::path::PathBuf::from("/tmp/checkpipe-test"),
        workspace: std::path::PathBuf::from("."),
        log_level: default_log_level(),
        configured_log_level: None,
        telemetry: DEFAULT_TELEMETRY.to_string(),
        update_check: DEFAULT_UPDATE_CHECK,
        memory_max_mb: DEFAULT_MEMORY_MAX_MB,
        cloud_host: DEFAULT_CLOUD_HOST.to_string(),
        cloud_token: None,
        diagnostics_level: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = default_config();
        assert_eq!(config.general.telemetry.as_deref(), Some("info"));
        assert_eq!(config.general.update_check, Some(true));
        assert!(config.general.log_level.is_none());
        assert_eq!(config.cloud.host.as_deref(), Some(DEFAULT_CLOUD_HOST));
    }
}
