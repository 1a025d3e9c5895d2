//! Configuration errors and the error/warning aggregate
//!
//! Each resolution step returns an [`ErrorAndWarnings`]: at most one fatal
//! error plus any number of advisory warnings. Steps are merged upward and
//! the first fatal error stops startup.

use std::path::PathBuf;

/// Fatal configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not create installation directory: {path}")]
    InstallDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read config file: {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {path}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to load saved cloud token: {path}")]
    TokenCache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value of '{key}' ({value}), must be one of: {allowed}")]
    InvalidValue {
        key: &'static str,
        value: String,
        allowed: String,
    },

    #[error("invalid value of '{key}' ({value}), must be a whole number")]
    InvalidNumber { key: &'static str, value: String },
}

impl ConfigError {
    /// Build an [`ConfigError::InvalidValue`] from the allowed set
    pub fn invalid_value(key: &'static str, value: impl Into<String>, allowed: &[&str]) -> Self {
        Self::InvalidValue {
            key,
            value: value.into(),
            allowed: allowed.join(", "),
        }
    }
}

/// At most one fatal error plus zero or more warnings
#[derive(Debug, Default)]
pub struct ErrorAndWarnings {
    pub error: Option<ConfigError>,
    pub warnings: Vec<String>,
}

impl ErrorAndWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_error(error: ConfigError) -> Self {
        Self {
            error: Some(error),
            warnings: Vec::new(),
        }
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    /// Merge another aggregate into this one
    ///
    /// The first fatal error wins; warnings are appended without duplicates.
    pub fn merge(&mut self, other: ErrorAndWarnings) {
        if self.error.is_none() {
            self.error = other.error;
        }
        for warning in other.warnings {
            self.add_warning(warning);
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Split into the result and the collected warnings
    pub fn into_result(self) -> (Result<(), ConfigError>, Vec<String>) {
        match self.error {
            Some(err) => (Err(err), self.warnings),
            None => (Ok(()), self.warnings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_first_error() {
        let mut first = ErrorAndWarnings::from_error(ConfigError::invalid_value(
            "telemetry",
            "loud",
            &["none", "info"],
        ));
        let second = ErrorAndWarnings::from_error(ConfigError::invalid_value(
            "log_level",
            "chatty",
            &["info"],
        ));
        first.merge(second);

        let message = first.error.unwrap().to_string();
        assert!(message.contains("telemetry"));
    }

    #[test]
    fn test_merge_collects_warnings_without_duplicates() {
        let mut ew = ErrorAndWarnings::new();
        ew.add_warning("a");
        let mut other = ErrorAndWarnings::new();
        other.add_warning("a");
        other.add_warning("b");
        ew.merge(other);

        assert!(!ew.has_error());
        assert_eq!(ew.warnings, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_invalid_value_message() {
        let err = ConfigError::invalid_value("telemetry", "loud", &["none", "info"]);
        assert_eq!(
            err.to_string(),
            "invalid value of 'telemetry' (loud), must be one of: none, info"
        );
    }
}
