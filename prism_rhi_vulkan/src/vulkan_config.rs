/// Vulkan device configuration

use prism_rhi::prism::rhi::PresentMode;

/// Which validation messages reach the logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    All,
}

/// Configuration for `VulkanDevice`
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Application name reported to the driver
    pub application_name: String,

    /// Enable VK_LAYER_KHRONOS_validation and the debug messenger.
    /// Ignored unless the crate is built with the `vulkan-validation` feature.
    pub enable_validation: bool,

    /// Validation messages below this severity are dropped
    pub debug_severity: DebugSeverity,

    /// Abort the process on the first validation error
    pub break_on_validation_error: bool,

    /// Present mode requested by swap chains (FIFO when unsupported)
    pub present_mode: PresentMode,

    /// Prefer a discrete adapter over an integrated one
    pub prefer_discrete_gpu: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            application_name: "Prism Application".to_string(),
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            break_on_validation_error: false,
            present_mode: PresentMode::Fifo,
            prefer_discrete_gpu: true,
        }
    }
}

impl DeviceConfig {
    /// Validation is active only when requested AND compiled in
    pub fn validation_active(&self) -> bool {
        cfg!(feature = "vulkan-validation") && self.enable_validation
    }
}
