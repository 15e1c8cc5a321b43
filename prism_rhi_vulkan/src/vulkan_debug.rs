/// Vulkan Debug Messenger - Routes validation layer messages to the RHI logger
///
/// Compiled only with the `vulkan-validation` feature. Messages are filtered
/// by the configured severity, counted, and forwarded to `Rhi::log` under the
/// `prism::vulkan::validation` source.

use ash::vk;
use colored::*;
use prism_rhi::prism::log::LogSeverity;
use prism_rhi::prism::Rhi;
use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::vulkan_config::{DebugSeverity, DeviceConfig};

const VALIDATION_SOURCE: &str = "prism::vulkan::validation";

/// Global debug configuration (shared across callbacks)
static DEBUG_CONFIG: Mutex<Option<DebugConfig>> = Mutex::new(None);

/// Validation errors seen since the last `init_debug_config`
static VALIDATION_ERRORS: AtomicU32 = AtomicU32::new(0);
static VALIDATION_WARNINGS: AtomicU32 = AtomicU32::new(0);

/// Set once the device starts tearing down; late callbacks are ignored
static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

/// Debug configuration for the callback
#[derive(Clone, Copy)]
struct DebugConfig {
    severity: DebugSeverity,
    break_on_error: bool,
}

/// Initialize debug configuration and reset the counters
pub(crate) fn init_debug_config(config: &DeviceConfig) {
    VALIDATION_ERRORS.store(0, Ordering::Relaxed);
    VALIDATION_WARNINGS.store(0, Ordering::Relaxed);
    SHUTTING_DOWN.store(false, Ordering::Release);

    *DEBUG_CONFIG.lock().unwrap_or_else(|e| e.into_inner()) = Some(DebugConfig {
        severity: config.debug_severity,
        break_on_error: config.break_on_validation_error,
    });
}

/// Stop reporting (called right before the messenger is destroyed)
pub(crate) fn cleanup_debug_config() {
    SHUTTING_DOWN.store(true, Ordering::Release);
    *DEBUG_CONFIG.lock().unwrap_or_else(|e| e.into_inner()) = None;
}

/// Number of validation errors reported so far
pub fn validation_error_count() -> u32 {
    VALIDATION_ERRORS.load(Ordering::Relaxed)
}

/// Number of validation warnings reported so far
pub fn validation_warning_count() -> u32 {
    VALIDATION_WARNINGS.load(Ordering::Relaxed)
}

/// Severity flags the messenger subscribes to
pub(crate) fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

/// Messenger create info used for both the instance chain and the messenger
pub(crate) fn messenger_create_info(severity: DebugSeverity) -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(severity_flags(severity))
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback))
}

/// Vulkan debug messenger callback
///
/// Called by the validation layers when they detect issues.
unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if SHUTTING_DOWN.load(Ordering::Acquire) || p_callback_data.is_null() {
        return vk::FALSE;
    }

    let config = match *DEBUG_CONFIG.lock().unwrap_or_else(|e| e.into_inner()) {
        Some(config) => config,
        None => return vk::FALSE,
    };

    if !severity_flags(config.severity).intersects(message_severity) {
        return vk::FALSE;
    }

    let callback_data = &*p_callback_data;
    let message_id_name = if callback_data.p_message_id_name.is_null() {
        "Unknown"
    } else {
        CStr::from_ptr(callback_data.p_message_id_name)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };
    let message = if callback_data.p_message.is_null() {
        "No message"
    } else {
        CStr::from_ptr(callback_data.p_message)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };

    let type_str = if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    };

    let is_error = message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR);
    let severity = if is_error {
        VALIDATION_ERRORS.fetch_add(1, Ordering::Relaxed);
        LogSeverity::Error
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        VALIDATION_WARNINGS.fetch_add(1, Ordering::Relaxed);
        LogSeverity::Warn
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        LogSeverity::Info
    } else {
        LogSeverity::Trace
    };

    Rhi::log(
        severity,
        VALIDATION_SOURCE,
        format!("[{}] {}: {}", type_str, message_id_name, message),
    );

    // Break on error if configured (for debugger attachment)
    if config.break_on_error && is_error {
        eprintln!(
            "\n{}\n  Context: {} [{}]\n",
            "BREAK ON VALIDATION ERROR - Aborting execution".red().bold(),
            message_id_name.yellow(),
            type_str.cyan(),
        );
        std::process::abort();
    }

    vk::FALSE // Don't abort the Vulkan call
}
