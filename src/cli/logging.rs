//! Logging initialization
//!
//! The log directory is only known once configuration has been resolved, but
//! the configuration code itself logs. The logger therefore starts out
//! buffering to memory and is later attached to the rotating log file, with
//! the buffered lines written out first. The file rotates daily
//! (`checkpipe.YYYY-MM-DD.log`, UTC date):
//!
//! ```text
//! Logger::install(level)     -> LogSink::Buffering
//! logger.attach(dir, level)  -> LogSink::Attached (buffer flushed, level swapped)
//! ```

use crate::config::{LogLevel, paths};
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::Dispatch;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

/// Prefix of log file names
pub const LOG_FILE_PREFIX: &str = "checkpipe";
/// Extension of log file names
pub const LOG_FILE_SUFFIX: &str = "log";

static BANNER_WRITTEN: AtomicBool = AtomicBool::new(false);

/// Identifier of this process, written in the banner so the lines of one
/// execution can be picked out of a shared log file
pub fn execution_id() -> &'static str {
    static ID: OnceLock<String> = OnceLock::new();
    ID.get_or_init(|| {
        format!(
            "{}-{}",
            chrono::Utc::now().format("%Y%m%d%H%M%S"),
            std::process::id()
        )
    })
}

enum SinkState {
    Buffering(Vec<u8>),
    Attached(RollingFileAppender),
}

/// Destination of log output: a memory buffer until attached to a file
#[derive(Clone)]
pub struct LogSink {
    state: Arc<Mutex<SinkState>>,
}

impl LogSink {
    pub fn buffering() -> Self {
        Self {
            state: Arc::new(Mutex::new(SinkState::Buffering(Vec::new()))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Switch to `writer`, writing out anything buffered so far
    pub fn attach(&self, mut writer: RollingFileAppender) -> io::Result<()> {
        let mut state = self.lock();
        if let SinkState::Buffering(buffer) = &*state {
            writer.write_all(buffer)?;
            writer.flush()?;
        }
        *state = SinkState::Attached(writer);
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        matches!(&*self.lock(), SinkState::Attached(_))
    }

    /// Bytes buffered while not attached
    pub fn buffered(&self) -> Vec<u8> {
        match &*self.lock() {
            SinkState::Buffering(buffer) => buffer.clone(),
            SinkState::Attached(_) => Vec::new(),
        }
    }
}

/// Writer handed out to the fmt layer for each event
pub struct SinkWriter {
    sink: LogSink,
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut *self.sink.lock() {
            SinkState::Buffering(buffer) => {
                buffer.extend_from_slice(buf);
                Ok(buf.len())
            }
            SinkState::Attached(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut *self.sink.lock() {
            SinkState::Buffering(_) => Ok(()),
            SinkState::Attached(writer) => writer.flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter { sink: self.clone() }
    }
}

/// Two-phase process logger
pub struct Logger {
    sink: LogSink,
    filter: reload::Handle<EnvFilter, Registry>,
    dispatch: Dispatch,
    level: LogLevel,
}

impl Logger {
    /// Build a buffering logger without installing it
    pub fn new(level: LogLevel) -> Self {
        let sink = LogSink::buffering();
        let (filter, handle) = reload::Layer::new(filter_for(level));
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .with_writer(sink.clone())
                .with_ansi(false) // No ANSI codes in log file
                .with_target(true),
        );

        Self {
            sink,
            filter: handle,
            dispatch: Dispatch::new(subscriber),
            level,
        }
    }

    /// Build a buffering logger and make it the process-wide subscriber
    ///
    /// The banner is written by the first logger installed in the process.
    pub fn install(level: LogLevel) -> Self {
        let logger = Self::new(level);
        if tracing::dispatcher::set_global_default(logger.dispatch.clone()).is_err() {
            // Another subscriber owns the process (tests, embedding); keep ours local
            return logger;
        }
        logger.write_banner_once(&BANNER_WRITTEN);
        logger
    }

    /// Attach to the rotating log file in `log_dir` and apply `level`
    pub fn attach(&mut self, log_dir: &Path, level: LogLevel) -> Result<()> {
        let writer = daily_appender(log_dir)?;
        self.sink
            .attach(writer)
            .context("Failed to write buffered log lines")?;
        self.filter
            .reload(filter_for(level))
            .context("Failed to update log level")?;
        self.level = level;
        Ok(())
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Write the banner unless `written` is already set, returning whether it was written
    ///
    /// The banner goes straight to the sink so the level filter never hides it.
    fn write_banner_once(&self, written: &AtomicBool) -> bool {
        if written.swap(true, Ordering::SeqCst) {
            return false;
        }
        let date = chrono::Local::now().format("%Y-%m-%d").to_string();
        let mut writer = self.sink.make_writer();
        for line in banner_lines(execution_id(), env!("CARGO_PKG_VERSION"), self.level, &date) {
            if writeln!(writer, "{}", line).is_err() {
                break;
            }
        }
        true
    }
}

/// Daily rotating appender writing `checkpipe.YYYY-MM-DD.log` files into `log_dir`
pub fn daily_appender(log_dir: &Path) -> Result<RollingFileAppender> {
    paths::ensure_dir(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(log_dir)
        .with_context(|| format!("Failed to open log file in {}", log_dir.display()))
}

fn filter_for(level: LogLevel) -> EnvFilter {
    EnvFilter::new(level.as_str())
}

/// Lines of the banner written once per process
pub fn banner_lines(execution_id: &str, version: &str, level: LogLevel, date: &str) -> Vec<String> {
    let rule = "*".repeat(56);
    vec![
        rule.clone(),
        format!("**{:^52}**", format!("checkpipe [{}]", execution_id)),
        rule,
        format!("Version:   v{}", version),
        format!("Log level: {}", level),
        format!("Log date:  {}", date),
    ]
}
