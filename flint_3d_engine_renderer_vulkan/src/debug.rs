/// Vulkan debug messenger - validation layer messages with colored output
///
/// The messenger callback filters messages by severity and category, counts
/// them, marks repeats and writes them to the console and/or a log file.
/// Strict modes can panic or abort on the first validation error. The counts
/// are logged through the engine logger when the messenger is torn down.

use ash::vk;
use colored::*;
use flint_3d_engine::flint3d::render::{Config, DebugMessageFilter, DebugOutput, DebugSeverity, ValidationStats};
use flint_3d_engine::{engine_info, engine_warn};
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

const SOURCE: &str = "vulkan::debug";

/// Installed while a device with validation is alive
static MESSENGER: Mutex<Option<MessengerState>> = Mutex::new(None);

/// Messenger settings extracted from the device `Config`
#[derive(Debug, Clone)]
pub struct DebugConfig {
    pub severity: DebugSeverity,
    pub output: DebugOutput,
    pub message_filter: DebugMessageFilter,
    pub break_on_error: bool,
    pub panic_on_error: bool,
    pub enable_stats: bool,
}

impl DebugConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            severity: config.debug_severity,
            output: config.debug_output.clone(),
            message_filter: config.debug_message_filter,
            break_on_error: config.break_on_validation_error,
            panic_on_error: config.panic_on_error,
            enable_stats: config.enable_validation_stats,
        }
    }
}

struct MessengerState {
    config: DebugConfig,
    stats: ValidationStats,
    /// Occurrences per message text
    occurrences: FxHashMap<String, u32>,
}

impl MessengerState {
    fn new(config: DebugConfig) -> Self {
        Self {
            config,
            stats: ValidationStats::default(),
            occurrences: FxHashMap::default(),
        }
    }

    fn accepts(&self, level: MessageLevel, category: MessageCategory) -> bool {
        passes_severity(self.config.severity, level) && passes_filter(&self.config.message_filter, category)
    }

    /// Count an accepted message, returning how many times it has been seen
    ///
    /// Always 1 with statistics disabled.
    fn record(&mut self, level: MessageLevel, message: &str) -> u32 {
        if !self.config.enable_stats {
            return 1;
        }

        let counter = match level {
            MessageLevel::Error => &mut self.stats.errors,
            MessageLevel::Warning => &mut self.stats.warnings,
            MessageLevel::Info => &mut self.stats.info,
            MessageLevel::Verbose => &mut self.stats.verbose,
        };
        *counter += 1;

        let seen = self.occurrences.entry(message.to_string()).or_insert(0);
        *seen += 1;
        *seen
    }

    fn repeated(&self) -> usize {
        self.occurrences.values().filter(|&&count| count > 1).count()
    }
}

fn messenger() -> MutexGuard<'static, Option<MessengerState>> {
    MESSENGER.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Highest severity bit of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageLevel {
    Error,
    Warning,
    Info,
    Verbose,
}

impl MessageLevel {
    fn from_vk(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            MessageLevel::Error
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            MessageLevel::Warning
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            MessageLevel::Info
        } else {
            MessageLevel::Verbose
        }
    }

    fn label(self) -> &'static str {
        match self {
            MessageLevel::Error => "ERROR",
            MessageLevel::Warning => "WARNING",
            MessageLevel::Info => "INFO",
            MessageLevel::Verbose => "VERBOSE",
        }
    }

    fn colored_label(self) -> ColoredString {
        match self {
            MessageLevel::Error => self.label().red().bold(),
            MessageLevel::Warning => self.label().yellow().bold(),
            MessageLevel::Info => self.label().cyan(),
            MessageLevel::Verbose => self.label().bright_black(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageCategory {
    General,
    Validation,
    Performance,
}

impl MessageCategory {
    fn from_vk(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> Self {
        if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
            MessageCategory::Validation
        } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
            MessageCategory::Performance
        } else {
            MessageCategory::General
        }
    }

    fn label(self) -> &'static str {
        match self {
            MessageCategory::General => "General",
            MessageCategory::Validation => "Validation",
            MessageCategory::Performance => "Performance",
        }
    }
}

fn passes_severity(threshold: DebugSeverity, level: MessageLevel) -> bool {
    match threshold {
        DebugSeverity::ErrorsOnly => level == MessageLevel::Error,
        DebugSeverity::ErrorsAndWarnings => matches!(level, MessageLevel::Error | MessageLevel::Warning),
        DebugSeverity::All => true,
    }
}

fn passes_filter(filter: &DebugMessageFilter, category: MessageCategory) -> bool {
    match category {
        MessageCategory::General => filter.show_general,
        MessageCategory::Validation => filter.show_validation,
        MessageCategory::Performance => filter.show_performance,
    }
}

/// Install the messenger configuration with zeroed statistics
pub fn init_debug_config(config: DebugConfig) {
    *messenger() = Some(MessengerState::new(config));
}

/// Remove the messenger configuration; later callbacks are ignored
///
/// Returns the collected statistics (logged when enabled), or `None` if no
/// configuration was installed.
pub fn cleanup_debug_config() -> Option<ValidationStats> {
    let state = messenger().take()?;
    if state.config.enable_stats {
        log_stats(&state.stats, state.repeated());
    }
    Some(state.stats)
}

fn log_stats(stats: &ValidationStats, repeated: usize) {
    if stats.errors > 0 {
        engine_warn!(
            SOURCE,
            "Validation: {} error(s), {} warning(s), {} info, {} verbose ({} repeated)",
            stats.errors, stats.warnings, stats.info, stats.verbose, repeated
        );
    } else {
        engine_info!(
            SOURCE,
            "Validation: {} message(s), {} warning(s) ({} repeated)",
            stats.total(), stats.warnings, repeated
        );
    }
}

unsafe fn c_str_or<'a>(ptr: *const std::os::raw::c_char, fallback: &'a str) -> &'a str {
    if ptr.is_null() {
        fallback
    } else {
        CStr::from_ptr(ptr).to_str().unwrap_or("Invalid UTF-8")
    }
}

/// Vulkan debug messenger callback
///
/// # Safety
///
/// Called by the validation layers with a valid callback data pointer.
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = &*p_callback_data;
    let message_id_name = c_str_or(callback_data.p_message_id_name, "Unknown");
    let message = c_str_or(callback_data.p_message, "No message");

    let level = MessageLevel::from_vk(message_severity);
    let category = MessageCategory::from_vk(message_type);

    // Released before any output, panic or abort
    let (config, occurrence_count) = {
        let mut guard = messenger();
        let Some(state) = guard.as_mut() else {
            return vk::FALSE;
        };
        if !state.accepts(level, category) {
            return vk::FALSE;
        }
        let count = state.record(level, message);
        (state.config.clone(), count)
    };

    let repeat_indicator = if occurrence_count > 1 {
        format!(" [×{}]", occurrence_count)
    } else {
        String::new()
    };

    match &config.output {
        DebugOutput::Console => {
            eprint!("{}", console_line(level, category, &repeat_indicator, message_id_name, message));
        }
        DebugOutput::File(path) => {
            append_to_file(path, &file_line(level, category, &repeat_indicator, message_id_name, message));
        }
        DebugOutput::Both(path) => {
            eprint!("{}", console_line(level, category, &repeat_indicator, message_id_name, message));
            append_to_file(path, &file_line(level, category, &repeat_indicator, message_id_name, message));
        }
    }

    if level == MessageLevel::Error {
        if config.panic_on_error {
            panic!(
                "\n⚠️  PANIC ON ERROR (Strict Mode)\nMessage ID: {}\nType: {}\nMessage: {}\n",
                message_id_name, category.label(), message
            );
        }

        if config.break_on_error {
            eprintln!(
                "\n{}\n  Context: {} [{}]\n  Message: {}\n",
                "⚠️  BREAK ON VALIDATION ERROR - Aborting execution".red().bold(),
                message_id_name.yellow(),
                category.label().cyan(),
                message.white()
            );
            std::process::abort();
        }
    }

    vk::FALSE
}

fn console_line(level: MessageLevel, category: MessageCategory, repeat: &str, id: &str, message: &str) -> String {
    format!(
        "{} {} [{}]{}\n  ├─ {}: {}\n  └─ {}\n",
        "[VULKAN".bright_blue().bold(),
        format!("{}]", level.colored_label()).bright_blue().bold(),
        category.label().bright_black(),
        repeat.yellow(),
        "Message ID".bright_black(),
        id.white(),
        message.white()
    )
}

fn file_line(level: MessageLevel, category: MessageCategory, repeat: &str, id: &str, message: &str) -> String {
    format!(
        "[VULKAN {}] [{}]{}\n  ├─ Message ID: {}\n  └─ {}\n",
        level.label(), category.label(), repeat, id, message
    )
}

fn append_to_file(path: &str, message: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{}", message);
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
