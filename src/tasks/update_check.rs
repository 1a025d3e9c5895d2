//! Update check
//!
//! At most once per [`CHECK_INTERVAL`] the latest release is looked up and
//! the result recorded in `<install-dir>/internal/update_check.json`. The
//! notice is shown at the start of the next command rather than in the
//! middle of the current one.

use super::ScheduledTask;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Minimum time between two lookups
pub const CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Where released versions are looked up
#[cfg_attr(test, mockall::automock)]
pub trait VersionSource: Send + Sync {
    /// A released version newer than `current`, if any
    fn latest_version(&self, current: &str) -> Result<Option<String>>;
}

/// Looks up releases on crates.io
#[derive(Debug, Clone, Copy, Default)]
pub struct CratesIoSource;

impl VersionSource for CratesIoSource {
    fn latest_version(&self, current: &str) -> Result<Option<String>> {
        use update_informer::{Check, registry};

        // Our own state file decides how often to check
        let informer = update_informer::new(registry::Crates, env!("CARGO_PKG_NAME"), current)
            .interval(Duration::ZERO)
            .timeout(Duration::from_secs(5));
        let version = informer
            .check_version()
            .map_err(|e| anyhow::anyhow!("Failed to check for updates: {}", e))?;

        Ok(version.map(|v| v.to_string().trim_start_matches('v').to_string()))
    }
}

/// Persisted result of the last lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_version: Option<String>,
}

impl UpdateState {
    /// Load the state, treating a missing or unreadable file as never checked
    pub fn load(path: &Path) -> Self {
        std::fs::read(path)
            .ok()
            .and_then(|data| serde_json::from_slice(&data).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            crate::config::paths::ensure_dir(parent)?;
        }
        let json = serde_json::to_vec_pretty(self).context("Failed to serialize update state")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write update state: {}", path.display()))
    }

    /// Whether a lookup is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        match self.last_checked {
            None => true,
            Some(last) => match chrono::Duration::from_std(interval) {
                Ok(interval) => now - last >= interval,
                Err(_) => false,
            },
        }
    }

    /// Notice to show when the recorded version is newer than `current`
    ///
    /// Nothing is shown when either version does not parse.
    pub fn notification(&self, current: &str) -> Option<String> {
        let available = self.available_version.as_deref()?;
        let newer = Version::parse(available).ok()? > Version::parse(current).ok()?;
        if !newer {
            return None;
        }
        Some(format!(
            "A new version of checkpipe is available! {} → {}",
            current, available
        ))
    }
}

/// Looks up the latest release when one is due
pub struct UpdateCheckTask {
    source: Arc<dyn VersionSource>,
    state_path: PathBuf,
    current_version: String,
}

impl UpdateCheckTask {
    pub fn new(source: Arc<dyn VersionSource>, state_path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            state_path: state_path.into(),
            current_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }
}

#[async_trait]
impl ScheduledTask for UpdateCheckTask {
    fn name(&self) -> &str {
        "update-check"
    }

    async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let state = UpdateState::load(&self.state_path);
        if !state.is_due(Utc::now(), CHECK_INTERVAL) {
            tracing::debug!("update check not due");
            return Ok(());
        }

        let source = self.source.clone();
        let current = self.current_version.clone();
        let lookup = tokio::task::spawn_blocking(move || source.latest_version(&current));

        let latest = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("update check cancelled");
                return Ok(());
            }
            result = lookup => result.context("Update check panicked")??,
        };

        tracing::debug!(latest = ?latest, "update check complete");
        UpdateState {
            last_checked: Some(Utc::now()),
            available_version: latest,
        }
        .save(&self.state_path)
    }
}
