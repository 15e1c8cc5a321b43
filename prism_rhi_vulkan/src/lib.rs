/*!
# Prism RHI - Vulkan Backend

Vulkan implementation of the `prism_rhi` device and command-encoder seams.

This crate uses ash for Vulkan bindings, gpu-allocator for memory management
and spirq for SPIR-V reflection. It requires Vulkan 1.3 (dynamic rendering).

Build with the `vulkan-validation` feature to compile in the Khronos
validation layer and route its messages to the RHI logger.

# Example

```no_run
use prism_rhi::prism::rhi::Device;
use prism_rhi_vulkan::prism::{DeviceConfig, VulkanDevice};

# fn run(window: &winit::window::Window) -> prism_rhi::prism::Result<()> {
let vulkan = VulkanDevice::new(window, DeviceConfig::default())?;
let size = window.inner_size();
let swap_chain = vulkan.create_swap_chain(window, size.width, size.height)?;
let device = Device::new(Box::new(vulkan.clone()));
# Ok(())
# }
```
*/

mod vulkan_context;
mod vulkan_config;
mod vulkan_conversions;
mod vulkan_resources;
mod vulkan_shader;
mod vulkan_pipeline;
mod vulkan_command_list;
mod vulkan_swapchain;
mod vulkan_device;

#[cfg(feature = "vulkan-validation")]
mod vulkan_debug;

/// Public namespace, mirroring `prism_rhi::prism`
pub mod prism {
    pub use crate::vulkan_config::{DebugSeverity, DeviceConfig};
    pub use crate::vulkan_context::LOG_SOURCE;
    pub use crate::vulkan_device::VulkanDevice;
    pub use crate::vulkan_swapchain::VulkanSwapChain;

    #[cfg(feature = "vulkan-validation")]
    pub use crate::vulkan_debug::{validation_error_count, validation_warning_count};
}
