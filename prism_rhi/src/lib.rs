/*!
# Prism RHI

Backend-neutral render hardware interface.

This crate provides the command-recording and pipeline-object model shared by
every native graphics backend. Backends (Vulkan in `prism_rhi_vulkan`)
implement the `DeviceBackend` and `CommandEncoder` traits; everything else
lives here and behaves identically on all of them.

## Architecture

- **Device**: owns the backend, descriptor-set-layout and pipeline caches,
  profiler counters and the deferred deletion queue
- **PipelineState**: value-comparable description of a draw or dispatch
- **Pipeline**: compiled pipeline layout + pipeline, built once per state
- **CommandList**: validating state machine recording through a `CommandEncoder`
- **Texture / Buffer / Shader / SwapChain**: resource metadata referenced by commands

Contract violations are fatal: they are logged at error severity through the
crate logger, then the calling thread panics.
*/

// Internal modules
mod error;
mod runtime;
pub mod log;
pub mod rhi;

// Main prism namespace module
pub mod prism {
    // Error types
    pub use crate::error::{Error, Result};

    // Global logger sink
    pub use crate::runtime::Rhi;

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // RHI sub-module with all device, pipeline and command types
    pub mod rhi {
        pub use crate::rhi::*;
    }
}

// Re-export math and byte-casting libraries at crate root
pub use glam;
pub use bytemuck;
