//! Unit tests for error.rs
//!
//! Tests all Error variants, their Display output and the fatal classification.

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("vkQueueSubmit returned -4".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("vkQueueSubmit returned -4"));
}

#[test]
fn test_out_of_memory_display() {
    let err = Error::OutOfMemory;
    assert_eq!(format!("{}", err), "Out of GPU memory");
}

#[test]
fn test_resource_creation_failed_display() {
    let err = Error::ResourceCreationFailed("D24_UNORM_S8_UINT x8 unsupported".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Resource creation failed"));
    assert!(display.contains("D24_UNORM_S8_UINT"));
}

#[test]
fn test_device_lost_display() {
    let err = Error::DeviceLost("fence wait timed out after 5000 ms".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Device lost"));
    assert!(display.contains("5000 ms"));
}

#[test]
fn test_surface_lost_display() {
    let err = Error::SurfaceLost("window destroyed".to_string());
    assert_eq!(format!("{}", err), "Surface lost: window destroyed");
}

// ============================================================================
// FATAL CLASSIFICATION
// ============================================================================

#[test]
fn test_fatal_errors() {
    assert!(Error::DeviceLost("x".to_string()).is_fatal());
    assert!(Error::SurfaceLost("x".to_string()).is_fatal());
}

#[test]
fn test_recoverable_errors() {
    assert!(!Error::BackendError("x".to_string()).is_fatal());
    assert!(!Error::OutOfMemory.is_fatal());
    assert!(!Error::InvalidResource("x".to_string()).is_fatal());
    assert!(!Error::InitializationFailed("x".to_string()).is_fatal());
    assert!(!Error::ResourceCreationFailed("x".to_string()).is_fatal());
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone_and_eq() {
    let err = Error::ResourceCreationFailed("color".to_string());
    assert_eq!(err.clone(), err);
    assert_ne!(err, Error::ResourceCreationFailed("depth".to_string()));
}

#[test]
fn test_error_debug() {
    let debug = format!("{:?}", Error::DeviceLost("hung".to_string()));
    assert!(debug.contains("DeviceLost"));
}

// ============================================================================
// ERROR PROPAGATION TESTS
// ============================================================================

#[test]
fn test_error_propagation_with_question_mark() {
    fn inner() -> Result<i32> {
        Err(Error::OutOfMemory)
    }

    fn outer() -> Result<i32> {
        inner()?;
        Ok(42)
    }

    assert_eq!(outer(), Err(Error::OutOfMemory));
}
