//! Configuration schema definitions
//!
//! [`ConfigFile`] is what a YAML config file deserializes into; every field
//! is optional so files can be layered. [`RuntimeConfig`] is the fully
//! resolved configuration handed to the rest of the program.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Allowed values of `telemetry`
pub const TELEMETRY_LEVELS: &[&str] = &["none", "info"];

/// Allowed values of the diagnostics level (case insensitive)
pub const DIAGNOSTICS_LEVELS: &[&str] = &["none", "all"];

/// Root of a config file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// General options
    #[serde(default)]
    pub general: GeneralOptions,

    /// Cloud connection options
    #[serde(default)]
    pub cloud: CloudOptions,
}

/// `general` block
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneralOptions {
    /// Log level for the log file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Telemetry level (`none` or `info`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<String>,

    /// Deprecated spelling of `telemetry`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry_level: Option<String>,

    /// Check for a newer release at most once a day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_check: Option<bool>,

    /// Memory ceiling in megabytes, zero or negative for no limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_max_mb: Option<i64>,
}

/// `cloud` block
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ConfigFile {
    /// Merge two layers, with values set in `other` taking precedence
    pub fn merge(self, other: ConfigFile) -> ConfigFile {
        ConfigFile {
            general: GeneralOptions {
                log_level: other.general.log_level.or(self.general.log_level),
                telemetry: other.general.telemetry.or(self.general.telemetry),
                telemetry_level: other.general.telemetry_level.or(self.general.telemetry_level),
                update_check: other.general.update_check.or(self.general.update_check),
                memory_max_mb: other.general.memory_max_mb.or(self.general.memory_max_mb),
            },
            cloud: CloudOptions {
                host: other.cloud.host.or(self.cloud.host),
                token: other.cloud.token.or(self.cloud.token),
            },
        }
    }
}

/// Log verbosity accepted in config files and `CHECKPIPE_LOG_LEVEL`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub const VARIANTS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error", "off"];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" => Ok(LogLevel::Off),
            other => Err(other.to_string()),
        }
    }
}

/// The active command, as recorded before configuration is resolved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    /// Subcommand name (e.g. `templates`, `completion`)
    pub command: String,
    /// Remaining command line arguments
    pub args: Vec<String>,
    /// Whether stdout is attached to a terminal
    pub is_terminal_tty: bool,
}

impl Invocation {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        use std::io::IsTerminal;
        Self {
            command: command.into(),
            args,
            is_terminal_tty: std::io::stdout().is_terminal(),
        }
    }
}

/// Fully resolved configuration, built once during startup
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub invocation: Invocation,
    pub install_dir: PathBuf,
    pub workspace: PathBuf,
    pub log_level: LogLevel,
    /// Log level set in a config file, if any
    pub configured_log_level: Option<LogLevel>,
    pub telemetry: String,
    pub update_check: bool,
    pub memory_max_mb: i64,
    pub cloud_host: String,
    pub cloud_token: Option<String>,
    pub diagnostics_level: Option<String>,
}

impl RuntimeConfig {
    /// Memory ceiling in bytes, `None` when unlimited
    ///
    /// Values too large to express in bytes saturate at `u64::MAX`.
    pub fn memory_limit_bytes(&self) -> Option<u64> {
        let mb = u64::try_from(self.memory_max_mb).ok().filter(|mb| *mb > 0)?;
        Some(mb.saturating_mul(1024 * 1024))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_deserialization() {
        let yaml = r#"
general:
  logLevel: debug
  telemetry: none
  updateCheck: false
  memoryMaxMb: 512
cloud:
  host: cloud.example.com
"#;
        let config: ConfigFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.general.log_level.as_deref(), Some("debug"));
        assert_eq!(config.general.telemetry.as_deref(), Some("none"));
        assert_eq!(config.general.update_check, Some(false));
        assert_eq!(config.general.memory_max_mb, Some(512));
        assert_eq!(config.cloud.host.as_deref(), Some("cloud.example.com"));
        assert!(config.cloud.token.is_none());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: ConfigFile = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_merge_prefers_set_values() {
        let base = ConfigFile {
            general: GeneralOptions {
                telemetry: Some("info".to_string()),
                update_check: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };
        let other = ConfigFile {
            general: GeneralOptions {
                telemetry: Some("none".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.general.telemetry.as_deref(), Some("none"));
        assert_eq!(merged.general.update_check, Some(true));
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("INFO".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("chatty".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::default().to_string(), "warn");
    }

    #[test]
    fn test_memory_limit_non_positive_is_unlimited() {
        let mut config = crate::config::defaults::runtime_config_for_tests();
        config.memory_max_mb = 0;
        assert_eq!(config.memory_limit_bytes(), None);
        config.memory_max_mb = -5;
        assert_eq!(config.memory_limit_bytes(), None);
        config.memory_max_mb = 2;
        assert_eq!(config.memory_limit_bytes(), Some(2 * 1024 * 1024));
    }

    #[test]
    fn test_memory_limit_huge_value_saturates() {
        let mut config = crate::config::defaults::runtime_config_for_tests();
        config.memory_max_mb = 20_000_000_000_000;
        assert_eq!(config.memory_limit_bytes(), Some(u64::MAX));
        config.memory_max_mb = i64::MAX;
        assert_eq!(config.memory_limit_bytes(), Some(u64::MAX));
    }
}
