//! Install directory layout
//!
//! Everything checkpipe persists lives under one install directory:
//!
//! ```text
//! <install-dir>/
//!   check/templates/<bundle>/   copied templates + version.json
//!   config/config.yaml          install-wide config file
//!   internal/                   saved tokens, update-check state
//!   logs/                       checkpipe.YYYY-MM-DD.log
//! ```

use super::env::{ENV_INSTALL_DIR, ENV_WORKSPACE, Environment};
use std::path::{Path, PathBuf};

/// File name of the workspace-local config file
pub const WORKSPACE_CONFIG_FILE: &str = ".checkpipe.yaml";

/// Get the default install directory
///
/// `~/.checkpipe` on every platform, falling back to `./.checkpipe` when no
/// home directory can be determined.
pub fn default_install_dir() -> PathBuf {
    use directories::BaseDirs;
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".checkpipe"))
        .unwrap_or_else(|| PathBuf::from(".").join(".checkpipe"))
}

/// Resolve the install directory: flag, then `CHECKPIPE_INSTALL_DIR`, then default
pub fn resolve_install_dir(flag: Option<&Path>, env: &Environment) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| env.get(ENV_INSTALL_DIR).map(PathBuf::from))
        .unwrap_or_else(default_install_dir)
}

/// Resolve the workspace: flag, then `CHECKPIPE_WORKSPACE`, then the current directory
pub fn resolve_workspace(flag: Option<&Path>, env: &Environment) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| env.get(ENV_WORKSPACE).map(PathBuf::from))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Paths derived from an install directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    root: PathBuf,
}

impl InstallPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one sub-directory per template bundle
    pub fn templates_dir(&self) -> PathBuf {
        self.root.join("check").join("templates")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    /// Install-wide config file
    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("config.yaml")
    }

    pub fn internal_dir(&self) -> PathBuf {
        self.root.join("internal")
    }

    pub fn update_state_file(&self) -> PathBuf {
        self.internal_dir().join("update_check.json")
    }
}

/// Workspace-local config file
pub fn workspace_config_file(workspace: &Path) -> PathBuf {
    workspace.join(WORKSPACE_CONFIG_FILE)
}

/// Ensure a directory exists, creating it (and its parents) if necessary
///
/// New directories are owner-writable and world-readable.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(path)
}
