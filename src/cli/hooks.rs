//! Startup and shutdown hooks run around every command
//!
//! ```text
//! pre_run   -> logger (buffering) -> config -> env export -> logger (file)
//! start     -> update notice -> task runner -> memory ceiling
//! post_run  -> wait TASK_WAIT for the runner, cancel otherwise
//! ```
//!
//! [`pre_run`] runs before the tokio runtime exists, everything after it
//! runs on the runtime.

use super::logging::Logger;
use crate::config::env::ENV_LOG_LEVEL;
use crate::config::{
    ConfigLoader, Environment, ErrorAndWarnings, InstallPaths, Invocation, LogLevel,
    ResolveOptions, RuntimeConfig, log_level_needs_reset,
};
use crate::tasks::{TaskHandle, TaskOutcome, TaskRunner, UpdateCheckTask, UpdateState, VersionSource};
use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

/// Command that only prints shell completions
pub const COMPLETION_COMMAND: &str = "completion";
/// Long-running daemon role, never runs background tasks
pub const DAEMON_COMMAND: &str = "plugin-manager";
/// How long post-run waits for background tasks
pub const TASK_WAIT: Duration = Duration::from_millis(100);

/// Result of [`pre_run`]
pub enum PreRun {
    /// The command needs no bootstrap
    Skipped,
    Ready(Session),
}

/// A fatal startup error with the warnings collected before it
#[derive(Debug)]
pub struct StartupFailure {
    pub error: anyhow::Error,
    pub warnings: Vec<String>,
}

impl StartupFailure {
    fn from_config(ew: ErrorAndWarnings) -> Self {
        let (result, warnings) = ew.into_result();
        let error = match result {
            Err(e) => anyhow::Error::new(e),
            Ok(()) => anyhow::anyhow!("Failed to resolve configuration"),
        };
        Self { error, warnings }
    }

    /// Print the warnings, then the error, to stderr
    pub fn report(&self) {
        for warning in &self.warnings {
            eprintln!("Warning: {}", warning);
        }
        eprintln!("Error: {:#}", self.error);
    }
}

/// Prepare the process for `invocation`
///
/// Must be called before the async runtime is built: when the log level is
/// only configured in a file it is exported to the process environment here.
pub fn pre_run(
    invocation: Invocation,
    options: &ResolveOptions,
    mut env: Environment,
) -> Result<PreRun, StartupFailure> {
    if invocation.command == COMPLETION_COMMAND {
        return Ok(PreRun::Skipped);
    }

    let early_level = env
        .log_level()
        .and_then(|level| level.parse::<LogLevel>().ok())
        .unwrap_or_default();
    let mut logger = Logger::install(early_level);
    tracing::debug!(command = %invocation.command, "pre-run start");

    let (config, warnings) =
        ConfigLoader::resolve(invocation, options, &env).map_err(StartupFailure::from_config)?;
    let (_, warnings) = warnings.into_result();

    if log_level_needs_reset(&config, &env) {
        tracing::debug!("exporting configured log level {}", config.log_level);
        env.export(ENV_LOG_LEVEL, config.log_level.as_str());
    }

    let logs_dir = InstallPaths::new(&config.install_dir).logs_dir();
    if let Err(error) = logger.attach(&logs_dir, config.log_level) {
        return Err(StartupFailure { error, warnings });
    }

    Ok(PreRun::Ready(Session {
        config: Arc::new(config),
        warnings,
        logger,
        env,
        tasks: None,
    }))
}

/// State carried from [`pre_run`] through the command to [`Session::post_run`]
pub struct Session {
    config: Arc<RuntimeConfig>,
    warnings: Vec<String>,
    logger: Logger,
    env: Environment,
    tasks: Option<TaskHandle>,
}

impl Session {
    pub fn config(&self) -> &Arc<RuntimeConfig> {
        &self.config
    }

    /// Warnings collected while resolving configuration
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Whether a task runner was launched
    pub fn has_tasks(&self) -> bool {
        self.tasks.is_some()
    }

    /// Launch background tasks and apply the memory ceiling
    ///
    /// Must be called from within the tokio runtime.
    pub fn start(&mut self, source: Arc<dyn VersionSource>) {
        if self.config.invocation.command == DAEMON_COMMAND {
            tracing::debug!("task runner skipped for {}", DAEMON_COMMAND);
            for warning in &self.warnings {
                tracing::warn!("{}", warning);
            }
        } else {
            let install = InstallPaths::new(&self.config.install_dir);
            let state_file = install.update_state_file();

            if self.config.update_check && self.config.invocation.is_terminal_tty {
                if let Some(notice) =
                    UpdateState::load(&state_file).notification(env!("CARGO_PKG_VERSION"))
                {
                    println!("{}", notice);
                }
            }

            let warnings = self.warnings.clone();
            let mut runner =
                TaskRunner::new().with_pre_hook(move || display_deprecation_warnings(&warnings));
            if self.config.update_check {
                runner = runner.with_task(UpdateCheckTask::new(source, state_file));
            }
            self.tasks = Some(runner.spawn());
        }

        apply_memory_limit(self.config.memory_limit_bytes());
    }

    /// Give background tasks [`TASK_WAIT`] to finish, then cancel them
    pub async fn post_run(self) -> Option<TaskOutcome> {
        let handle = self.tasks?;
        let outcome = handle.finish(TASK_WAIT).await;
        tracing::debug!(outcome = ?outcome, "post-run complete");
        Some(outcome)
    }
}

/// Text of the deprecation warning block, `None` when there is nothing to show
pub fn render_deprecation_warnings(warnings: &[String]) -> Option<String> {
    if warnings.is_empty() {
        return None;
    }

    let heading = if warnings.len() == 1 {
        "Deprecation warning:"
    } else {
        "Deprecation warnings:"
    };
    let mut out = format!("{}\n", heading);
    for warning in warnings {
        out.push_str(&format!("  - {}\n", warning));
    }
    out.push_str("\nFor more details, run `checkpipe config validate`.\n");
    Some(out)
}

/// Print deprecation warnings to stderr, in yellow when stderr is a terminal
pub fn display_deprecation_warnings(warnings: &[String]) {
    let mut stderr = std::io::stderr();
    let color = stderr.is_terminal();
    if let Err(e) = write_deprecation_warnings(&mut stderr, warnings, color) {
        tracing::debug!("failed to print deprecation warnings: {}", e);
    }
}

/// Write the deprecation warning block to `out`, styled only when `color` is set
pub fn write_deprecation_warnings(
    out: &mut impl Write,
    warnings: &[String],
    color: bool,
) -> std::io::Result<()> {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let Some(text) = render_deprecation_warnings(warnings) else {
        return Ok(());
    };
    if color {
        crossterm::execute!(out, SetForegroundColor(Color::Yellow), Print(&text), ResetColor)
    } else {
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}

/// Cap the address space of this process at `bytes`
pub fn apply_memory_limit(bytes: Option<u64>) {
    let Some(bytes) = bytes else {
        return;
    };
    match set_address_space_limit(bytes) {
        Ok(()) => tracing::debug!("memory ceiling set to {} bytes", bytes),
        Err(e) => tracing::warn!("Failed to set memory ceiling: {}", e),
    }
}

#[cfg(unix)]
fn set_address_space_limit(bytes: u64) -> std::io::Result<()> {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: getrlimit only writes into the struct we pass
    if unsafe { libc::getrlimit(libc::RLIMIT_AS, &mut limit) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    let wanted = bytes as libc::rlim_t;
    limit.rlim_cur = if limit.rlim_max == libc::RLIM_INFINITY {
        wanted
    } else {
        wanted.min(limit.rlim_max)
    };

    // SAFETY: the struct is fully initialized and outlives the call
    if unsafe { libc::setrlimit(libc::RLIMIT_AS, &limit) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_address_space_limit(_bytes: u64) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "memory ceiling is not supported on this platform",
    ))
}
