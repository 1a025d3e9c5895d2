//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules.

use super::{
    defaults,
    env::{self, Environment},
    errors::{ConfigError, ErrorAndWarnings},
    paths::{self, InstallPaths},
    schema::{ConfigFile, DIAGNOSTICS_LEVELS, Invocation, LogLevel, RuntimeConfig, TELEMETRY_LEVELS},
    token::TokenCache,
};
use std::path::{Path, PathBuf};

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub install_dir: Option<PathBuf>,
    pub workspace: Option<PathBuf>,
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolve the runtime configuration
    ///
    /// Precedence order (lowest to highest):
    /// 1. Built-in defaults
    /// 2. Install-wide config file
    /// 3. Workspace config file
    /// 4. Environment variables
    /// 5. Resolved values (saved cloud token)
    ///
    /// The install directory itself is taken from the command line flag, then
    /// `CHECKPIPE_INSTALL_DIR`, and is created if missing.
    ///
    /// On success the returned aggregate carries warnings only. On failure no
    /// configuration is returned.
    pub fn resolve(
        invocation: Invocation,
        options: &ResolveOptions,
        env: &Environment,
    ) -> Result<(RuntimeConfig, ErrorAndWarnings), ErrorAndWarnings> {
        let mut ew = ErrorAndWarnings::new();

        let install_dir = paths::resolve_install_dir(options.install_dir.as_deref(), env);
        if let Err(e) = Self::ensure_install_dir(&install_dir) {
            return Err(ErrorAndWarnings::from_error(e));
        }
        let install = InstallPaths::new(&install_dir);
        let workspace = paths::resolve_workspace(options.workspace.as_deref(), env);

        let (file_config, load_ew) = Self::load_layers(&install, &workspace);
        ew.merge(load_ew);
        if ew.has_error() {
            return Err(ew);
        }
        let configured_log_level = file_config.general.log_level.clone();

        // ENV takes precedence over any file configuration
        let config = match Self::apply_env_overrides(defaults::default_config().merge(file_config), env) {
            Ok(config) => config,
            Err(e) => {
                ew.merge(ErrorAndWarnings::from_error(e));
                return Err(ew);
            }
        };

        // The token is resolved last: the saved token depends on the resolved cloud host
        let cloud_host = config
            .cloud
            .host
            .clone()
            .unwrap_or_else(|| defaults::DEFAULT_CLOUD_HOST.to_string());
        let cloud_token = match Self::resolve_cloud_token(&install, &cloud_host, config.cloud.token, env) {
            Ok(token) => token,
            Err(e) => {
                ew.merge(ErrorAndWarnings::from_error(e));
                return Err(ew);
            }
        };

        let levels = Self::resolve_log_levels(configured_log_level.as_deref(), env);
        let (log_level, configured_log_level) = match levels {
            Ok(levels) => levels,
            Err(e) => {
                ew.merge(ErrorAndWarnings::from_error(e));
                return Err(ew);
            }
        };

        let runtime = RuntimeConfig {
            invocation,
            install_dir,
            workspace,
            log_level,
            configured_log_level,
            telemetry: config
                .general
                .telemetry
                .unwrap_or_else(|| defaults::DEFAULT_TELEMETRY.to_string()),
            update_check: config
                .general
                .update_check
                .unwrap_or(defaults::DEFAULT_UPDATE_CHECK),
            memory_max_mb: config
                .general
                .memory_max_mb
                .unwrap_or(defaults::DEFAULT_MEMORY_MAX_MB),
            cloud_host,
            cloud_token,
            diagnostics_level: env.diagnostics_level().map(str::to_string),
        };

        ew.merge(validate_config(&runtime, env));
        if ew.has_error() {
            return Err(ew);
        }

        tracing::debug!(
            install_dir = %runtime.install_dir.display(),
            workspace = %runtime.workspace.display(),
            log_level = %runtime.log_level,
            "configuration resolved"
        );
        Ok((runtime, ew))
    }

    /// Create the install directory if it does not exist
    pub fn ensure_install_dir(install_dir: &Path) -> Result<(), ConfigError> {
        tracing::trace!("ensure install dir {}", install_dir.display());
        paths::ensure_dir(install_dir).map_err(|source| ConfigError::InstallDir {
            path: install_dir.to_path_buf(),
            source,
        })
    }

    /// Load a config file, returning `None` when it does not exist
    pub fn load_file(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        // An empty file is valid and sets nothing
        if contents.trim().is_empty() {
            return Ok(Some(ConfigFile::default()));
        }

        let config = serde_yaml::from_str(&contents).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Some(config))
    }

    /// Load and merge the install-wide and workspace config files
    pub fn load_layers(install: &InstallPaths, workspace: &Path) -> (ConfigFile, ErrorAndWarnings) {
        let mut ew = ErrorAndWarnings::new();
        let mut merged = ConfigFile::default();

        for path in [install.config_file(), paths::workspace_config_file(workspace)] {
            match Self::load_file(&path) {
                Ok(Some(layer)) => {
                    tracing::debug!("loaded config file {}", path.display());
                    merged = merged.merge(Self::upgrade_deprecated(layer, &path, &mut ew));
                }
                Ok(None) => {}
                Err(e) => {
                    ew.merge(ErrorAndWarnings::from_error(e));
                    break;
                }
            }
        }

        (merged, ew)
    }

    /// Map deprecated keys onto their replacements, warning about each
    fn upgrade_deprecated(mut layer: ConfigFile, path: &Path, ew: &mut ErrorAndWarnings) -> ConfigFile {
        if let Some(level) = layer.general.telemetry_level.take() {
            ew.add_warning(format!(
                "'general.telemetryLevel' in {} is deprecated - use 'general.telemetry'",
                path.display()
            ));
            if layer.general.telemetry.is_none() {
                layer.general.telemetry = Some(level);
            }
        }
        layer
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: ConfigFile, env: &Environment) -> Result<ConfigFile, ConfigError> {
        if let Some(telemetry) = env.get(env::ENV_TELEMETRY) {
            config.general.telemetry = Some(telemetry.to_string());
        }

        if let Some(update_check) = env.get(env::ENV_UPDATE_CHECK) {
            let value = update_check
                .trim()
                .to_ascii_lowercase()
                .parse::<bool>()
                .map_err(|_| ConfigError::invalid_value("update_check", update_check, &["true", "false"]))?;
            config.general.update_check = Some(value);
        }

        if let Some(memory) = env.get(env::ENV_MEMORY_MAX_MB) {
            let value = memory
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidNumber {
                    key: "memory_max_mb",
                    value: memory.to_string(),
                })?;
            config.general.memory_max_mb = Some(value);
        }

        if let Some(host) = env.get(env::ENV_CLOUD_HOST) {
            config.cloud.host = Some(host.to_string());
        }

        Ok(config)
    }

    /// Config file token, then saved token, then `CHECKPIPE_CLOUD_TOKEN`
    /// (increasing precedence)
    fn resolve_cloud_token(
        install: &InstallPaths,
        host: &str,
        file_token: Option<String>,
        env: &Environment,
    ) -> Result<Option<String>, ConfigError> {
        let saved = TokenCache::new(install.internal_dir()).load(host)?;
        let token = env
            .get(env::ENV_CLOUD_TOKEN)
            .map(str::to_string)
            .or(saved)
            .or(file_token);
        Ok(token)
    }

    /// Returns the effective log level and the level set in config files
    ///
    /// The environment wins over config files; both must be recognised levels.
    fn resolve_log_levels(
        configured: Option<&str>,
        env: &Environment,
    ) -> Result<(LogLevel, Option<LogLevel>), ConfigError> {
        let parse = |value: &str| {
            value
                .parse::<LogLevel>()
                .map_err(|_| ConfigError::invalid_value("log_level", value, LogLevel::VARIANTS))
        };

        let configured = configured.map(parse).transpose()?;
        let effective = match env.log_level() {
            Some(value) => parse(value)?,
            None => configured.unwrap_or_else(defaults::default_log_level),
        };
        Ok((effective, configured))
    }
}

/// Validate resolved values
///
/// Currently validates telemetry and the diagnostics level, and warns about
/// the deprecated diagnostics variable.
pub fn validate_config(config: &RuntimeConfig, env: &Environment) -> ErrorAndWarnings {
    let mut res = ErrorAndWarnings::new();

    if !TELEMETRY_LEVELS.contains(&config.telemetry.as_str()) {
        res.error = Some(ConfigError::invalid_value(
            "telemetry",
            config.telemetry.as_str(),
            TELEMETRY_LEVELS,
        ));
        return res;
    }

    if env.is_set(env::ENV_LEGACY_DIAGNOSTICS_LEVEL) {
        res.add_warning(format!(
            "Environment variable {} is deprecated - use {}",
            env::ENV_LEGACY_DIAGNOSTICS_LEVEL,
            env::ENV_DIAGNOSTICS_LEVEL
        ));
    }

    if let Some(level) = config.diagnostics_level.as_deref() {
        let normalized = level.trim().to_ascii_lowercase();
        if !normalized.is_empty() && !DIAGNOSTICS_LEVELS.contains(&normalized.as_str()) {
            res.error = Some(ConfigError::invalid_value(
                "diagnostics_level",
                level,
                DIAGNOSTICS_LEVELS,
            ));
        }
    }

    res
}

/// Whether the configured log level needs exporting to the process environment
///
/// True when no current or legacy log level variable is set but a config
/// file sets one.
pub fn log_level_needs_reset(config: &RuntimeConfig, env: &Environment) -> bool {
    !env.log_level_set() && config.configured_log_level.is_some()
}
