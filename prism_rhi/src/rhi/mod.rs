/// RHI module - device, pipeline and command-list types

// Module declarations
pub mod definitions;
pub mod state;
pub mod deletion_queue;
pub mod shader;
pub mod texture;
pub mod buffer;
pub mod sampler;
pub mod swap_chain;
pub mod descriptor_set_layout;
pub mod pipeline_state;
pub mod pipeline;
pub mod backend;
pub mod profiler;
pub mod device;
pub mod command_list;

// Re-export everything
pub use definitions::*;
pub use state::*;
pub use deletion_queue::*;
pub use shader::*;
pub use texture::*;
pub use buffer::*;
pub use sampler::*;
pub use swap_chain::*;
pub use descriptor_set_layout::*;
pub use pipeline_state::*;
pub use pipeline::*;
pub use backend::*;
pub use profiler::*;
pub use device::*;
pub use command_list::*;

// Mock backend for tests (no GPU required)
#[cfg(test)]
pub mod mock_device;
