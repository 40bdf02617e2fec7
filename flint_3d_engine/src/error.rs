//! Error types for the Flint3D engine
//!
//! This module defines the error types used throughout the engine:
//! device and surface failures, resource creation failures, and misuse
//! detected at runtime.
//!
//! Transient swapchain conditions ("out of date", "suboptimal") are not
//! errors. They are reported through `AcquireStatus` and `PresentStatus`.

use std::fmt;

/// Result type for Flint3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Flint3D engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (a driver call failed for another reason)
    BackendError(String),

    /// Out of host or GPU memory
    OutOfMemory,

    /// Invalid resource or invalid use of a resource (wrong state, bad index, etc.)
    InvalidResource(String),

    /// Initialization failed (instance, device, surface, worker threads)
    InitializationFailed(String),

    /// A GPU object could not be created (unsupported format/sample count, etc.)
    ResourceCreationFailed(String),

    /// The device stopped responding or was lost (fatal)
    DeviceLost(String),

    /// The presentation surface is gone (fatal)
    SurfaceLost(String),
}

impl Error {
    /// Fatal errors invalidate the device and every object built on it
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::DeviceLost(_) | Error::SurfaceLost(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::ResourceCreationFailed(msg) => write!(f, "Resource creation failed: {}", msg),
            Error::DeviceLost(msg) => write!(f, "Device lost: {}", msg),
            Error::SurfaceLost(msg) => write!(f, "Surface lost: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
