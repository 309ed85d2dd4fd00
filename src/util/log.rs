// src/util/log.rs

//! Logger Utility - per-severity log files plus `tracing` forwarding
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::OnceLock;
use chrono::Local;

pub static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// File logger, present only after [`init`] has been called
pub static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Log severity levels
#[derive(Debug, Clone, Copy)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    fn as_str(&self) -> &str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    fn filename(&self) -> &str {
        match self {
            LogLevel::Error => "error.log",
            LogLevel::Warn => "warn.log",
            LogLevel::Info => "info.log",
            LogLevel::Debug => "debug.log",
        }
    }
}

/// Logger that writes to separate files by severity
pub struct Logger {
    log_dir: PathBuf,
    error_file: Mutex<File>,
    warn_file: Mutex<File>,
    info_file: Mutex<File>,
    debug_file: Mutex<File>,
}

impl Logger {
    /// Create a new logger with the specified directory
    pub fn new(log_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let log_dir = log_dir.as_ref().to_path_buf();

        create_dir_all(&log_dir)?;

        // Start fresh each session
        let open = |level: LogLevel| File::create(log_dir.join(level.filename()));

        Ok(Self {
            error_file: Mutex::new(open(LogLevel::Error)?),
            warn_file: Mutex::new(open(LogLevel::Warn)?),
            info_file: Mutex::new(open(LogLevel::Info)?),
            debug_file: Mutex::new(open(LogLevel::Debug)?),
            log_dir,
        })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Write a log entry to the appropriate file
    pub fn write_log(&self, level: LogLevel, message: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let formatted = format!("[{}] [{}] {}\n", timestamp, level.as_str(), message);

        let file = match level {
            LogLevel::Error => &self.error_file,
            LogLevel::Warn => &self.warn_file,
            LogLevel::Info => &self.info_file,
            LogLevel::Debug => &self.debug_file,
        };

        if let Ok(mut file) = file.lock() {
            let _ = file.write_all(formatted.as_bytes());
            let _ = file.flush();
        }
    }
}

/// Install the file logger. A second call keeps the first logger.
pub fn init(log_dir: impl AsRef<Path>, debug: bool) -> std::io::Result<()> {
    set_debug(debug);
    let logger = Logger::new(log_dir)?;
    let _ = LOGGER.set(logger);
    Ok(())
}

/// Enable debug output; `DEBUG=true` in the environment also enables it.
pub fn set_debug(debug: bool) {
    DEBUG_ENABLED.get_or_init(|| {
        debug || std::env::var("DEBUG").unwrap_or_default() == "true"
    });
}

pub fn debug_enabled() -> bool {
    *DEBUG_ENABLED.get_or_init(|| std::env::var("DEBUG").unwrap_or_default() == "true")
}

#[doc(hidden)]
pub fn dispatch(level: LogLevel, message: &str) {
    match level {
        LogLevel::Error => tracing::error!("{}", message),
        LogLevel::Warn => tracing::warn!("{}", message),
        LogLevel::Info => tracing::info!("{}", message),
        LogLevel::Debug => tracing::debug!("{}", message),
    }

    if let Some(logger) = LOGGER.get() {
        logger.write_log(level, message);
    }
}

/// Convenience macro for error logging with formatting
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::util::log::dispatch($crate::util::log::LogLevel::Error, &message);
    }};
}

/// Convenience macro for warning logging with formatting
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::util::log::dispatch($crate::util::log::LogLevel::Warn, &message);
    }};
}

/// Convenience macro for info logging with formatting
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::util::log::dispatch($crate::util::log::LogLevel::Info, &message);
    }};
}

/// Convenience macro for debug logging with formatting
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        if $crate::util::log::debug_enabled() {
            let message = format!($($arg)*);
            $crate::util::log::dispatch($crate::util::log::LogLevel::Debug, &message);
        }
    }};
}
