// This file implements the application's logging system.
// It provides macros for different log levels (INFO, OK, WARN, ERROR, DEBUG) with colored
// terminal output, and mirrors every line into the per-run log file through `tracing`.

use regex::Regex;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, OnceLock};
use tracing::Level;

/// Provides convenient logging macros.
/// `#[macro_export]` makes these macros globally available within the crate.

// `log_info!` for general application progress and informational messages.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Severity::Info, &format!($($arg)*))
    };
}

// `log_success!` for a step or task that finished as intended.
#[macro_export]
macro_rules! log_success {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Severity::Success, &format!($($arg)*))
    };
}

// `log_warn!` for non-critical issues or noteworthy conditions.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Severity::Warn, &format!($($arg)*))
    };
}

// `log_error!` for failures the operator has to look at.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Severity::Error, &format!($($arg)*))
    };
}

// `log_debug!` for detailed internal tracing.
// Messages are only printed if debug mode is enabled via `is_debug_enabled()`.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::logger::is_debug_enabled() {
            $crate::logger::emit($crate::logger::Severity::Debug, &format!($($arg)*))
        }
    };
}

/// The console tag and log-file level a message is emitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

// Global flag to control debug logging, ensured to be initialized once.
static DEBUG_ENABLED: OnceLock<AtomicBool> = OnceLock::new();

// Set once the log file subscriber is installed; later attempts are ignored.
static FILE_SINK_READY: AtomicBool = AtomicBool::new(false);

static ANSI_ESCAPES: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").ok());

/// Initializes the logger, setting the global debug mode.
/// This function should be called once at application startup.
///
/// # Arguments
/// * `debug`: If `true`, enables debug logging; otherwise debug lines are dropped.
pub fn init(debug: bool) {
    DEBUG_ENABLED
        .get_or_init(|| AtomicBool::new(debug))
        .store(debug, Ordering::Relaxed);

    if debug {
        log_debug!("Logger initialized in DEBUG mode");
    }
}

/// Starts mirroring every status line into `path` (created or appended to).
///
/// Lines emitted before this call only reach the terminal. The subscriber is global,
/// so the first successful call wins for the lifetime of the process.
pub fn attach_log_file(path: &Path) -> std::io::Result<()> {
    if FILE_SINK_READY.load(Ordering::Relaxed) {
        return Ok(());
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let max_level = if is_debug_enabled() {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let installed = tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_max_level(max_level)
        .try_init()
        .is_ok();

    FILE_SINK_READY.store(installed, Ordering::Relaxed);
    Ok(())
}

/// Prints a colored status line on stderr and forwards a plain copy to the log file.
/// Used by the logging macros; call those instead.
pub fn emit(severity: Severity, message: &str) {
    use colored::Colorize;

    let tag = match severity {
        Severity::Info => "[INFO]".bright_green(),
        Severity::Success => "[ OK ]".bright_cyan().bold(),
        Severity::Warn => "[WARN]".bright_yellow(),
        Severity::Error => "[ERROR]".bright_red(),
        Severity::Debug => "[DEBUG]".dimmed(),
    };
    eprintln!("{tag} {message}");

    if FILE_SINK_READY.load(Ordering::Relaxed) {
        let plain = strip_ansi(message);
        match severity {
            Severity::Info => tracing::info!("{}", plain),
            Severity::Success => tracing::info!("[OK] {}", plain),
            Severity::Warn => tracing::warn!("{}", plain),
            Severity::Error => tracing::error!("{}", plain),
            Severity::Debug => tracing::debug!("{}", plain),
        }
    }
}

/// Removes terminal color codes so the log file stays readable.
pub fn strip_ansi(message: &str) -> String {
    match ANSI_ESCAPES.as_ref() {
        Some(pattern) => pattern.replace_all(message, "").into_owned(),
        None => message.to_string(),
    }
}

/// Checks if debug logging is currently enabled.
/// Used primarily by the `log_debug!` macro.
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED
        .get()
        .map(|f| f.load(Ordering::Relaxed))
        .unwrap_or(false)
}
