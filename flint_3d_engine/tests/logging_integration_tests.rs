//! Integration tests for the Engine logging system
//!
//! Exercises the public logger API and the exported error macros from outside
//! the crate. No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use flint_3d_engine::flint3d::log::{LogEntry, LogSeverity, Logger};
use flint_3d_engine::flint3d::{Engine, Error, Result};
use flint_3d_engine::{engine_bail, engine_err, engine_info, engine_warn_err};
use serial_test::serial;
use std::sync::{Arc, Mutex};

const SOURCE: &str = "flint3d::tests";

// ============================================================================
// CAPTURING LOGGER
// ============================================================================

struct CapturingLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

fn install_capturing_logger() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CapturingLogger { entries: entries.clone() });
    entries
}

impl Logger for CapturingLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn open_target(extent: (u32, u32)) -> Result<String> {
    if extent.0 == 0 || extent.1 == 0 {
        engine_bail!(SOURCE, "Extent {}x{} is empty", extent.0, extent.1);
    }
    engine_info!(SOURCE, "Opened {}x{}", extent.0, extent.1);
    Ok(format!("{}x{}", extent.0, extent.1))
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger_receives_every_severity() {
    let entries = install_capturing_logger();

    Engine::log(LogSeverity::Trace, SOURCE, "trace".to_string());
    Engine::log(LogSeverity::Debug, SOURCE, "debug".to_string());
    Engine::log(LogSeverity::Info, SOURCE, "info".to_string());
    Engine::log(LogSeverity::Warn, SOURCE, "warn".to_string());
    Engine::log(LogSeverity::Error, SOURCE, "error".to_string());

    let severities: Vec<LogSeverity> = entries.lock().unwrap().iter().map(|e| e.severity).collect();
    assert_eq!(
        severities,
        vec![LogSeverity::Trace, LogSeverity::Debug, LogSeverity::Info, LogSeverity::Warn, LogSeverity::Error]
    );

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_bail_logs_error_with_location() {
    let entries = install_capturing_logger();

    let result = open_target((0, 600));
    assert_eq!(result, Err(Error::BackendError("Extent 0x600 is empty".to_string())));

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);
    assert_eq!(captured[0].source, SOURCE);
    assert!(captured[0].file.is_some_and(|file| file.ends_with("logging_integration_tests.rs")));
    assert!(captured[0].line.is_some());
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_success_path_logs_info_without_location() {
    let entries = install_capturing_logger();

    assert_eq!(open_target((800, 600)), Ok("800x600".to_string()));

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Info);
    assert_eq!(captured[0].message, "Opened 800x600");
    assert_eq!(captured[0].file, None);
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_err_macros_pick_severity() {
    let entries = install_capturing_logger();

    let error = engine_err!(SOURCE, "fence {} lost", 3);
    let warning = engine_warn_err!(SOURCE, "acquire retry {}", 2);

    assert_eq!(error, Error::BackendError("fence 3 lost".to_string()));
    assert_eq!(warning, Error::BackendError("acquire retry 2".to_string()));
    assert!(!warning.is_fatal());

    let captured = entries.lock().unwrap();
    assert_eq!(captured[0].severity, LogSeverity::Error);
    assert_eq!(captured[1].severity, LogSeverity::Warn);
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_reset_detaches_custom_logger() {
    let entries = install_capturing_logger();
    Engine::log(LogSeverity::Info, SOURCE, "captured".to_string());

    Engine::reset_logger();
    Engine::log(LogSeverity::Info, SOURCE, "printed by the default logger".to_string());

    assert_eq!(entries.lock().unwrap().len(), 1);
}
