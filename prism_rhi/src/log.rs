//! Logging and fatal-diagnostic system for the Prism RHI
//!
//! This module provides:
//! - Customizable logger via the Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Error)
//! - Colored console output by default
//! - File and line information for ERROR logs
//! - Fatal macros: every contract violation is logged at ERROR severity,
//!   then the calling thread panics with the same message

use colored::*;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Logger trait for custom logging implementations
///
/// # Example
///
/// ```no_run
/// use prism_rhi::prism::log::{Logger, LogEntry};
///
/// struct FileLogger {
///     file: std::fs::File,
/// }
///
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Log an entry
    ///
    /// # Arguments
    ///
    /// * `entry` - The log entry to process
    fn log(&self, entry: &LogEntry);
}

/// Log entry containing all information about a log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source module (e.g., "prism::rhi", "prism::vulkan")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Very verbose information (per command, per bind)
    Trace,

    /// Development information
    Debug,

    /// Important events (device created, pipeline compiled)
    Info,

    /// Potential issues (naming failed, validation warning)
    Warn,

    /// Contract violations and backend failures (with file:line)
    Error,
}

impl LogSeverity {
    /// Fixed-width label used by the default logger
    pub fn label(&self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }
}

/// Default logger implementation using colored console output
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
pub struct DefaultLogger;

impl DefaultLogger {
    /// Format an entry without colors
    pub fn format_entry(entry: &LogEntry) -> String {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f");

        match (entry.file, entry.line) {
            (Some(file), Some(line)) => format!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, entry.severity.label(), entry.source, entry.message, file, line
            ),
            _ => format!(
                "[{}] [{}] [{}] {}",
                timestamp, entry.severity.label(), entry.source, entry.message
            ),
        }
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let label = entry.severity.label();
        let severity_str = match entry.severity {
            LogSeverity::Trace => label.bright_black(),
            LogSeverity::Debug => label.cyan(),
            LogSeverity::Info => label.green(),
            LogSeverity::Warn => label.yellow(),
            LogSeverity::Error => label.red().bold(),
        };

        let source = entry.source.bright_blue();

        if let (Some(file), Some(line)) = (entry.file, entry.line) {
            eprintln!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, severity_str, source, entry.message, file, line
            );
        } else {
            println!("[{}] [{}] [{}] {}", timestamp, severity_str, source, entry.message);
        }
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message
///
/// ```no_run
/// prism_rhi::rhi_trace!("prism::rhi", "Skipping redundant vertex buffer bind");
/// ```
#[macro_export]
macro_rules! rhi_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::prism::Rhi::log(
            $crate::prism::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message
#[macro_export]
macro_rules! rhi_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::prism::Rhi::log(
            $crate::prism::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message
///
/// ```no_run
/// prism_rhi::rhi_info!("prism::vulkan", "Selected GPU: {}", "RTX");
/// ```
#[macro_export]
macro_rules! rhi_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::prism::Rhi::log(
            $crate::prism::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message
#[macro_export]
macro_rules! rhi_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::prism::Rhi::log(
            $crate::prism::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! rhi_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::prism::Rhi::log_detailed(
            $crate::prism::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

// ===== ERROR MACROS =====

/// Log an ERROR and build an `Error::BackendError` with the same message
///
/// ```no_run
/// # fn f() -> prism_rhi::prism::Result<()> {
/// let result: Result<(), i32> = Err(-3);
/// result.map_err(|e| prism_rhi::rhi_err!("prism::vulkan", "Failed to create fence: {:?}", e))?;
/// # Ok(()) }
/// ```
#[macro_export]
macro_rules! rhi_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::prism::Rhi::log_detailed(
            $crate::prism::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::prism::Error::BackendError(message)
    }};
}

/// Log an ERROR and return `Err(Error::BackendError)` from the current function
#[macro_export]
macro_rules! rhi_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::rhi_err!($source, $($arg)*))
    };
}

// ===== FATAL MACROS =====

/// Log an ERROR with file:line, then panic with the same message
#[macro_export]
macro_rules! rhi_fatal {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::prism::Rhi::log_detailed(
            $crate::prism::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        panic!("[{}] {}", $source, message)
    }};
}

/// Fatal assertion: a false condition is a contract violation by the caller
///
/// ```no_run
/// let width = 0;
/// prism_rhi::rhi_assert!(width > 0, "prism::rhi", "Texture width must be non-zero");
/// ```
#[macro_export]
macro_rules! rhi_assert {
    ($cond:expr, $source:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::rhi_fatal!($source, $($arg)+);
        }
    };
    ($cond:expr, $source:expr $(,)?) => {
        if !$cond {
            $crate::rhi_fatal!($source, "Assertion failed: {}", stringify!($cond));
        }
    };
}

/// Unwrap a backend `Result`, turning an error into a fatal diagnostic that
/// names the operation and carries the backend's native error code
#[macro_export]
macro_rules! rhi_check {
    ($result:expr, $source:expr, $($arg:tt)*) => {
        match $result {
            Ok(value) => value,
            Err(error) => $crate::rhi_fatal!($source, "{}: {}", format!($($arg)*), error),
        }
    };
}

/// Placeholder for backend paths that have no implementation
#[macro_export]
macro_rules! rhi_not_implemented {
    ($source:expr, $what:expr) => {
        $crate::rhi_fatal!($source, "{} is not implemented", $what)
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
