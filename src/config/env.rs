//! Environment variable names and a snapshot of the process environment
//!
//! Configuration resolution reads from an [`Environment`] rather than from
//! `std::env` directly, so the whole startup sequence can be exercised in
//! tests without touching the real process environment.

use std::collections::HashMap;

/// Log level for this process and any child processes it starts
pub const ENV_LOG_LEVEL: &str = "CHECKPIPE_LOG_LEVEL";
/// Older names for [`ENV_LOG_LEVEL`], still honored when set
pub const LEGACY_LOG_LEVEL_ENV_VARS: &[&str] = &["CHECKPIPE_LOG", "CHECKPIPE_LOGLEVEL"];
/// Diagnostics level (`none` or `all`)
pub const ENV_DIAGNOSTICS_LEVEL: &str = "CHECKPIPE_DIAGNOSTIC_LEVEL";
/// Deprecated name for [`ENV_DIAGNOSTICS_LEVEL`]
pub const ENV_LEGACY_DIAGNOSTICS_LEVEL: &str = "CHECKPIPE_DIAGNOSTICS";
pub const ENV_CLOUD_TOKEN: &str = "CHECKPIPE_CLOUD_TOKEN";
pub const ENV_CLOUD_HOST: &str = "CHECKPIPE_CLOUD_HOST";
pub const ENV_INSTALL_DIR: &str = "CHECKPIPE_INSTALL_DIR";
pub const ENV_WORKSPACE: &str = "CHECKPIPE_WORKSPACE";
pub const ENV_TELEMETRY: &str = "CHECKPIPE_TELEMETRY";
pub const ENV_UPDATE_CHECK: &str = "CHECKPIPE_UPDATE_CHECK";
pub const ENV_MEMORY_MAX_MB: &str = "CHECKPIPE_MEMORY_MAX_MB";

/// Snapshot of environment variables
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    /// Whether [`Environment::export`] also writes to the process environment
    process: bool,
}

impl Environment {
    /// Capture the current process environment
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
            process: true,
        }
    }

    /// Build an environment from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            process: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Set a variable so that child processes inherit it
    ///
    /// A captured environment also updates the process environment, so this
    /// must only be called while the process is single threaded (before the
    /// async runtime is built).
    pub fn export(&mut self, key: &str, value: &str) {
        if self.process {
            // SAFETY: set_var is unsafe in Rust 2024 due to potential data races.
            // Callers export during startup, before any other thread exists.
            unsafe {
                std::env::set_var(key, value);
            }
        }
        self.vars.insert(key.to_string(), value.to_string());
    }

    /// Log level from the current variable, falling back to the legacy names
    pub fn log_level(&self) -> Option<&str> {
        std::iter::once(ENV_LOG_LEVEL)
            .chain(LEGACY_LOG_LEVEL_ENV_VARS.iter().copied())
            .find_map(|key| self.get(key))
    }

    /// Whether any of the current or legacy log level variables are set
    pub fn log_level_set(&self) -> bool {
        self.log_level().is_some()
    }

    /// Diagnostics level, preferring the current variable over the deprecated one
    pub fn diagnostics_level(&self) -> Option<&str> {
        self.get(ENV_DIAGNOSTICS_LEVEL)
            .or_else(|| self.get(ENV_LEGACY_DIAGNOSTICS_LEVEL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_prefers_current_variable() {
        let env = Environment::from_pairs([("CHECKPIPE_LOG", "debug"), (ENV_LOG_LEVEL, "trace")]);
        assert_eq!(env.log_level(), Some("trace"));
    }

    #[test]
    fn test_log_level_legacy_alias() {
        let env = Environment::from_pairs([("CHECKPIPE_LOGLEVEL", "info")]);
        assert!(env.log_level_set());
        assert_eq!(env.log_level(), Some("info"));
    }

    #[test]
    fn test_log_level_unset() {
        let env = Environment::default();
        assert!(!env.log_level_set());
    }

    #[test]
    fn test_export_updates_snapshot() {
        let mut env = Environment::default();
        env.export(ENV_LOG_LEVEL, "debug");
        assert_eq!(env.log_level(), Some("debug"));
        assert!(std::env::var(ENV_LOG_LEVEL).map(|v| v != "debug").unwrap_or(true));
    }

    #[test]
    fn test_diagnostics_level_falls_back_to_deprecated() {
        let env = Environment::from_pairs([(ENV_LEGACY_DIAGNOSTICS_LEVEL, "ALL")]);
        assert_eq!(env.diagnostics_level(), Some("ALL"));
    }
}
