/// Device configuration and validation-layer debug settings

use std::time::Duration;

/// Severity threshold for validation-layer messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Only errors
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// Everything, including info and verbose messages
    All,
}

/// Where validation-layer messages are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    /// Colored console output (stderr)
    Console,
    /// Append to a log file
    File(String),
    /// Console and log file
    Both(String),
}

/// Message categories to display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMessageFilter {
    pub show_general: bool,
    pub show_validation: bool,
    pub show_performance: bool,
}

impl Default for DebugMessageFilter {
    fn default() -> Self {
        Self {
            show_general: true,
            show_validation: true,
            show_performance: true,
        }
    }
}

/// Validation message counters collected by the backend debug messenger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    /// Total number of messages
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

/// Graphics device configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Validation message severity threshold
    pub debug_severity: DebugSeverity,
    /// Validation message destination
    pub debug_output: DebugOutput,
    /// Validation message categories
    pub debug_message_filter: DebugMessageFilter,
    /// Abort the process on the first validation error
    pub break_on_validation_error: bool,
    /// Panic on the first validation error
    pub panic_on_error: bool,
    /// Count validation messages
    pub enable_validation_stats: bool,
    /// Bound on every CPU wait for the GPU; exceeding it means the device is lost
    pub fence_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Flint3D Application".to_string(),
            app_version: (1, 0, 0),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            debug_message_filter: DebugMessageFilter::default(),
            break_on_validation_error: false,
            panic_on_error: false,
            enable_validation_stats: cfg!(debug_assertions),
            fence_timeout: Duration::from_secs(5),
        }
    }
}
