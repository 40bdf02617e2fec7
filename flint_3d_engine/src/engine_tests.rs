//! Unit tests for the Engine logging façade
//!
//! LOGGER is a global OnceLock shared across all tests.
//! All tests are marked with #[serial] to run sequentially.

use crate::flint3d::Engine;
use crate::flint3d::log::{Logger, LogEntry, LogSeverity};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<String>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        let location = match (entry.file, entry.line) {
            (Some(_), Some(line)) => format!(" @{}", line),
            _ => String::new(),
        };
        self.entries.lock().unwrap().push(format!(
            "{:?} [{}] {}{}",
            entry.severity, entry.source, entry.message, location
        ));
    }
}

// ============================================================================
// LOGGING API TESTS
// ============================================================================

#[test]
#[serial]
fn test_set_logger_receives_entries() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);

    Engine::log(LogSeverity::Info, "flint3d::test", "hello".to_string());
    Engine::log(LogSeverity::Warn, "flint3d::test", "careful".to_string());
    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], "Info [flint3d::test] hello");
    assert_eq!(entries[1], "Warn [flint3d::test] careful");
}

#[test]
#[serial]
fn test_log_detailed_carries_location() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);

    Engine::log_detailed(LogSeverity::Error, "flint3d::test", "broken".to_string(), "x.rs", 12);
    Engine::reset_logger();

    assert_eq!(entries.lock().unwrap()[0], "Error [flint3d::test] broken @12");
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);
    Engine::reset_logger();

    Engine::log(LogSeverity::Trace, "flint3d::test", "not captured".to_string());

    assert!(entries.lock().unwrap().is_empty());
}

#[test]
#[serial]
fn test_macros_route_through_engine() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);

    crate::engine_trace!("flint3d::test", "t{}", 1);
    crate::engine_debug!("flint3d::test", "d{}", 2);
    crate::engine_info!("flint3d::test", "i{}", 3);
    crate::engine_warn!("flint3d::test", "w{}", 4);
    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    assert_eq!(
        *entries,
        vec![
            "Trace [flint3d::test] t1".to_string(),
            "Debug [flint3d::test] d2".to_string(),
            "Info [flint3d::test] i3".to_string(),
            "Warn [flint3d::test] w4".to_string(),
        ]
    );
}
