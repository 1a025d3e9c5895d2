//! Saved cloud tokens
//!
//! A token saved for a cloud host lives in `<install-dir>/internal/<host>.tptt`.

use super::errors::ConfigError;
use std::path::PathBuf;

/// Reads saved cloud tokens
#[derive(Debug, Clone)]
pub struct TokenCache {
    dir: PathBuf,
}

impl TokenCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn token_path(&self, host: &str) -> PathBuf {
        self.dir.join(format!("{}.tptt", sanitize_host(host)))
    }

    /// Load the token saved for `host`
    ///
    /// A missing or empty token file is not an error.
    pub fn load(&self, host: &str) -> Result<Option<String>, ConfigError> {
        let path = self.token_path(host);
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::TokenCache { path, source }),
        }
    }

    #[cfg(test)]
    fn save(&self, host: &str, token: &str) -> std::io::Result<()> {
        super::paths::ensure_dir(&self.dir)?;
        std::fs::write(self.token_path(host), token)
    }
}

// Hosts may carry a port; keep the file name portable
fn sanitize_host(host: &str) -> String {
    host.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}
