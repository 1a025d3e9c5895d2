//! Tests for resolving the runtime configuration

use checkpipe::config::env::{
    ENV_CLOUD_HOST, ENV_CLOUD_TOKEN, ENV_DIAGNOSTICS_LEVEL, ENV_LEGACY_DIAGNOSTICS_LEVEL,
    ENV_LOG_LEVEL, ENV_MEMORY_MAX_MB,
};
use checkpipe::config::{
    ConfigError, ConfigLoader, Environment, ErrorAndWarnings, Invocation, LogLevel,
    ResolveOptions, RuntimeConfig, TokenCache, log_level_needs_reset,
};
use std::path::Path;

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn save_token(root: &Path, host: &str, token: &str) {
    let path = TokenCache::new(root.join("install/internal")).token_path(host);
    write(&path, token);
}

fn options(root: &Path) -> ResolveOptions {
    ResolveOptions {
        install_dir: Some(root.join("install")),
        workspace: Some(root.join("workspace")),
    }
}

fn resolve(root: &Path, env: &Environment) -> Result<(RuntimeConfig, ErrorAndWarnings), ErrorAndWarnings> {
    ConfigLoader::resolve(Invocation::default(), &options(root), env)
}

#[test]
fn test_defaults_without_any_source() {
    let temp = tempfile::tempdir().unwrap();
    let (config, warnings) = resolve(temp.path(), &Environment::default()).unwrap();

    assert!(warnings.warnings.is_empty());
    assert_eq!(config.log_level, LogLevel::Warn);
    assert_eq!(config.configured_log_level, None);
    assert_eq!(config.telemetry, "info");
    assert!(config.update_check);
    assert_eq!(config.memory_limit_bytes(), None);
    assert_eq!(config.cloud_host, "cloud.checkpipe.io");
    assert_eq!(config.cloud_token, None);
}

#[test]
fn test_layers_apply_in_order() {
    let temp = tempfile::tempdir().unwrap();
    write(
        &temp.path().join("install/config/config.yaml"),
        "general:\n  logLevel: info\n  telemetry: none\n  memoryMaxMb: 512\n",
    );
    write(
        &temp.path().join("workspace/.checkpipe.yaml"),
        "general:\n  logLevel: debug\n",
    );

    let env = Environment::from_pairs([(ENV_MEMORY_MAX_MB, "1024")]);
    let (config, _) = resolve(temp.path(), &env).unwrap();

    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.configured_log_level, Some(LogLevel::Debug));
    assert_eq!(config.telemetry, "none");
    assert_eq!(config.memory_limit_bytes(), Some(1024 * 1024 * 1024));
    assert!(log_level_needs_reset(&config, &env));
}

#[test]
fn test_huge_memory_ceiling_does_not_overflow() {
    let temp = tempfile::tempdir().unwrap();
    let env = Environment::from_pairs([(ENV_MEMORY_MAX_MB, "20000000000000")]);

    let (config, _) = resolve(temp.path(), &env).unwrap();

    assert_eq!(config.memory_max_mb, 20_000_000_000_000);
    assert_eq!(config.memory_limit_bytes(), Some(u64::MAX));
}

#[test]
fn test_env_log_level_wins_over_file() {
    let temp = tempfile::tempdir().unwrap();
    write(
        &temp.path().join("install/config/config.yaml"),
        "general:\n  logLevel: debug\n",
    );

    let env = Environment::from_pairs([(ENV_LOG_LEVEL, "ERROR")]);
    let (config, _) = resolve(temp.path(), &env).unwrap();

    assert_eq!(config.log_level, LogLevel::Error);
    assert_eq!(config.configured_log_level, Some(LogLevel::Debug));
    assert!(!log_level_needs_reset(&config, &env));
}

#[test]
fn test_invalid_log_level_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let env = Environment::from_pairs([(ENV_LOG_LEVEL, "loud")]);

    let err = resolve(temp.path(), &env).unwrap_err();
    assert!(matches!(
        err.error,
        Some(ConfigError::InvalidValue { key: "log_level", .. })
    ));
}

#[test]
fn test_cloud_token_precedence() {
    let temp = tempfile::tempdir().unwrap();
    let host = "cloud.example.com";
    write(
        &temp.path().join("install/config/config.yaml"),
        "cloud:\n  token: from-file\n",
    );

    let env = Environment::from_pairs([(ENV_CLOUD_HOST, host)]);
    let (config, _) = resolve(temp.path(), &env).unwrap();
    assert_eq!(config.cloud_token.as_deref(), Some("from-file"));

    save_token(temp.path(), host, "from-cache");
    let (config, _) = resolve(temp.path(), &env).unwrap();
    assert_eq!(config.cloud_token.as_deref(), Some("from-cache"));

    let env = Environment::from_pairs([(ENV_CLOUD_HOST, host), (ENV_CLOUD_TOKEN, "from-env")]);
    let (config, _) = resolve(temp.path(), &env).unwrap();
    assert_eq!(config.cloud_token.as_deref(), Some("from-env"));
}

#[test]
fn test_saved_token_is_per_host() {
    let temp = tempfile::tempdir().unwrap();
    save_token(temp.path(), "other.example.com", "elsewhere");

    let (config, _) = resolve(temp.path(), &Environment::default()).unwrap();
    assert_eq!(config.cloud_token, None);
}

#[test]
fn test_deprecated_diagnostics_variable_warns() {
    let temp = tempfile::tempdir().unwrap();
    let env = Environment::from_pairs([(ENV_LEGACY_DIAGNOSTICS_LEVEL, "ALL")]);

    let (config, warnings) = resolve(temp.path(), &env).unwrap();

    assert_eq!(config.diagnostics_level.as_deref(), Some("ALL"));
    assert_eq!(warnings.warnings.len(), 1);
    assert!(warnings.warnings[0].contains(ENV_DIAGNOSTICS_LEVEL));
}

#[test]
fn test_invalid_diagnostics_level_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let env = Environment::from_pairs([(ENV_DIAGNOSTICS_LEVEL, "some")]);

    let err = resolve(temp.path(), &env).unwrap_err();
    let message = err.error.unwrap().to_string();
    assert!(message.contains("none, all"), "{}", message);
}

#[test]
fn test_malformed_config_file_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    write(
        &temp.path().join("workspace/.checkpipe.yaml"),
        "general: [unclosed\n",
    );

    let err = resolve(temp.path(), &Environment::default()).unwrap_err();
    assert!(matches!(err.error, Some(ConfigError::ParseFile { .. })));
}

#[test]
fn test_install_dir_creation_failure_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    // A regular file where a directory is needed
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();

    let options = ResolveOptions {
        install_dir: Some(blocker.join("install")),
        workspace: Some(temp.path().to_path_buf()),
    };
    let err = ConfigLoader::resolve(Invocation::default(), &options, &Environment::default())
        .unwrap_err();

    assert!(matches!(err.error, Some(ConfigError::InstallDir { .. })));
}
