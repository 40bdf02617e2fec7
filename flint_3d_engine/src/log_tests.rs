//! Unit tests for log.rs
//!
//! Tests Logger trait, LogEntry, LogSeverity, DefaultLogger and the
//! error-producing macros.

use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use crate::flint3d::{Engine, Error, Result};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

// ============================================================================
// TEST HELPERS
// ============================================================================

struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn capture() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CaptureLogger { entries: entries.clone() });
    entries
}

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "flint3d::test".to_string(),
        message: format!("{:?} message", severity),
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
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_with_file_line() {
    let e = entry(LogSeverity::Error, Some("vulkan_swapchain.rs"), Some(42));
    assert_eq!(e.file, Some("vulkan_swapchain.rs"));
    assert_eq!(e.line, Some(42));
    assert_eq!(e.message, "Error message");
}

#[test]
fn test_log_entry_clone() {
    let e1 = entry(LogSeverity::Warn, None, None);
    let e2 = e1.clone();
    assert_eq!(e1.severity, e2.severity);
    assert_eq!(e1.source, e2.source);
    assert_eq!(e1.message, e2.message);
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger;
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        // Both branches (with and without file:line) must not panic
        logger.log(&entry(severity, None, None));
        logger.log(&entry(severity, Some("test.rs"), Some(7)));
    }
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
}

// ============================================================================
// MACRO TESTS
// ============================================================================

#[test]
#[serial]
fn test_engine_error_macro_records_location() {
    let entries = capture();
    crate::engine_error!("flint3d::test", "failed with code {}", -4);
    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Error);
    assert_eq!(entries[0].message, "failed with code -4");
    assert!(entries[0].file.is_some());
    assert!(entries[0].line.is_some());
}

#[test]
#[serial]
fn test_engine_err_macro_logs_and_builds_backend_error() {
    let entries = capture();
    let err = crate::engine_err!("flint3d::test", "submit failed: {}", "boom");
    Engine::reset_logger();

    assert_eq!(err, Error::BackendError("submit failed: boom".to_string()));
    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Error);
    assert_eq!(entries[0].source, "flint3d::test");
}

#[test]
#[serial]
fn test_engine_bail_macro_returns_early() {
    fn check(index: u32) -> Result<u32> {
        if index > 2 {
            crate::engine_bail!("flint3d::test", "index {} out of range", index);
        }
        Ok(index)
    }

    let entries = capture();
    assert_eq!(check(1), Ok(1));
    assert_eq!(check(5), Err(Error::BackendError("index 5 out of range".to_string())));
    Engine::reset_logger();

    assert_eq!(entries.lock().unwrap().len(), 1);
}

#[test]
#[serial]
fn test_engine_warn_err_macros_log_at_warn() {
    fn check() -> Result<()> {
        crate::engine_bail_warn!("flint3d::test", "suboptimal");
    }

    let entries = capture();
    let err = crate::engine_warn_err!("flint3d::test", "warn {}", 1);
    let bailed = check();
    Engine::reset_logger();

    assert_eq!(err, Error::BackendError("warn 1".to_string()));
    assert_eq!(bailed, Err(Error::BackendError("suboptimal".to_string())));
    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.severity == LogSeverity::Warn));
    assert!(entries.iter().all(|e| e.file.is_none()));
}
