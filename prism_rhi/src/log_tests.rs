//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry, DefaultLogger formatting and the
//! error/fatal macros (which go through the global logger).

use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use crate::runtime::Rhi;
use crate::error::Error;
use serial_test::serial;
use std::panic;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Logger capturing entries for inspection
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn install_capture_logger() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Rhi::set_logger(CaptureLogger { entries: entries.clone() });
    entries
}

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "prism::rhi".to_string(),
        message: "pipeline compiled".to_string(),
        file,
        line,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_labels_have_fixed_width() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(severity.label().len(), 5);
    }
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_format_without_location() {
    let text = DefaultLogger::format_entry(&entry(LogSeverity::Info, None, None));
    assert!(text.contains("[INFO ]"));
    assert!(text.contains("[prism::rhi]"));
    assert!(text.ends_with("pipeline compiled"));
}

#[test]
fn test_default_logger_format_with_location() {
    let text = DefaultLogger::format_entry(&entry(LogSeverity::Error, Some("command_list.rs"), Some(42)));
    assert!(text.contains("[ERROR]"));
    assert!(text.ends_with("(command_list.rs:42)"));
}

#[test]
fn test_default_logger_does_not_panic() {
    let logger = DefaultLogger;
    logger.log(&entry(LogSeverity::Trace, None, None));
    logger.log(&entry(LogSeverity::Error, Some("device.rs"), Some(7)));
}

// ============================================================================
// MACRO TESTS
// ============================================================================

#[test]
#[serial]
fn test_rhi_err_logs_and_builds_backend_error() {
    let entries = install_capture_logger();

    let err = crate::rhi_err!("prism::test", "Failed to create fence: {}", -3);
    match err {
        Error::BackendError(msg) => assert_eq!(msg, "Failed to create fence: -3"),
        other => panic!("unexpected error: {:?}", other),
    }

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);
    assert!(captured[0].file.is_some());
    drop(captured);
    Rhi::reset_logger();
}

#[test]
#[serial]
fn test_rhi_bail_returns_early() {
    let entries = install_capture_logger();

    fn fails() -> crate::error::Result<u32> {
        crate::rhi_bail!("prism::test", "unsupported format {}", 99);
    }

    assert!(fails().is_err());
    assert_eq!(entries.lock().unwrap().len(), 1);
    Rhi::reset_logger();
}

#[test]
#[serial]
fn test_rhi_assert_logs_before_panicking() {
    let entries = install_capture_logger();

    let result = panic::catch_unwind(|| {
        crate::rhi_assert!(1 + 1 == 3, "prism::test", "arithmetic is broken: {}", 2);
    });
    assert!(result.is_err());

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].message, "arithmetic is broken: 2");
    assert_eq!(captured[0].source, "prism::test");
    drop(captured);
    Rhi::reset_logger();
}

#[test]
#[serial]
fn test_rhi_assert_passing_condition_logs_nothing() {
    let entries = install_capture_logger();
    crate::rhi_assert!(true, "prism::test");
    assert!(entries.lock().unwrap().is_empty());
    Rhi::reset_logger();
}

#[test]
#[serial]
fn test_rhi_check_surfaces_backend_error_code() {
    let entries = install_capture_logger();

    let result = panic::catch_unwind(|| {
        let created: crate::error::Result<u64> =
            Err(Error::BackendError("ERROR_OUT_OF_DEVICE_MEMORY".to_string()));
        crate::rhi_check!(created, "prism::test", "Failed to create pipeline")
    });
    assert!(result.is_err());

    let captured = entries.lock().unwrap();
    assert!(captured[0].message.starts_with("Failed to create pipeline"));
    assert!(captured[0].message.contains("ERROR_OUT_OF_DEVICE_MEMORY"));
    drop(captured);
    Rhi::reset_logger();
}

#[test]
#[serial]
fn test_rhi_check_passes_value_through() {
    let value = crate::rhi_check!(Ok::<u32, Error>(7), "prism::test", "unused");
    assert_eq!(value, 7);
}

#[test]
#[serial]
#[should_panic(expected = "begin_marker is not implemented")]
fn test_rhi_not_implemented_panics() {
    crate::rhi_not_implemented!("prism::test", "begin_marker");
}
