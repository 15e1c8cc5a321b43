/// Shared RHI enums, flags, constants and object identity

use std::sync::atomic::{AtomicU64, Ordering};

/// Log source used by every core diagnostic
pub const LOG_SOURCE: &str = "prism::rhi";

/// Raw backend object handle (VkPipeline, VkImage, ... as u64). 0 means null.
pub type RhiHandle = u64;

/// Null backend handle
pub const NULL_HANDLE: RhiHandle = 0;

/// Process-unique object identity. 0 means "nothing bound".
pub type ObjectId = u64;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a new, never reused, object id
pub fn generate_object_id() -> ObjectId {
    NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)
}

// ===== LIMITS =====

/// Maximum simultaneous color render targets in one pipeline state
pub const MAX_RENDER_TARGET_COUNT: usize = 8;

/// Maximum mip count a texture can have
pub const MAX_MIP_COUNT: u32 = 13;

/// Mip index meaning "bind every mip"
pub const ALL_MIPS: u32 = u32::MAX;

/// Size of the per command list timestamp array
pub const MAX_TIMESTAMPS: usize = 512;

/// Fixed-point depth-bias unit: constant factor = floor(bias * 2^24)
pub const DEPTH_BIAS_UNIT: f32 = (1u32 << 24) as f32;

/// Combine a hash seed with a value (boost style)
pub fn hash_combine(seed: u64, x: u64) -> u64 {
    seed ^ (x
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2))
}

// ===== DEVICE ENUMS =====

/// Native graphics API implemented by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiType {
    Vulkan,
    D3d12,
}

/// Physical device class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalDeviceType {
    Integrated,
    Discrete,
    Virtual,
    Cpu,
    Undefined,
}

/// Swap chain presentation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentMode {
    /// No vsync, may tear
    Immediate,
    /// Vsync, frames may be dropped, lowest latency
    Mailbox,
    /// Vsync, every frame presented
    Fifo,
}

/// Queue a command list records for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    Graphics,
    Compute,
    Copy,
}

/// Resource-type tag used by the deletion queue and by object naming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    Fence,
    Semaphore,
    Shader,
    Sampler,
    QueryPool,
    DeviceMemory,
    Buffer,
    CommandList,
    CommandPool,
    Texture,
    TextureView,
    DescriptorSet,
    DescriptorSetLayout,
    Pipeline,
    PipelineLayout,
}

// ===== FORMATS =====

/// Texel and vertex attribute formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Format {
    // R
    R8_Unorm,
    R8_Uint,
    R16_Unorm,
    R16_Uint,
    R16_Float,
    R32_Uint,
    R32_Sint,
    R32_Float,
    // Rg
    R8G8_Unorm,
    R16G16_Float,
    R32G32_Uint,
    R32G32_Sint,
    R32G32_Float,
    // Rgb
    R11G11B10_Float,
    R32G32B32_Uint,
    R32G32B32_Sint,
    R32G32B32_Float,
    // Rgba
    R8G8B8A8_Unorm,
    R10G10B10A2_Unorm,
    R16G16B16A16_Unorm,
    R16G16B16A16_Snorm,
    R16G16B16A16_Float,
    R32G32B32A32_Uint,
    R32G32B32A32_Sint,
    R32G32B32A32_Float,
    // Depth
    D16_Unorm,
    D32_Float,
    D32_Float_S8X24_Uint,
    // Surface
    B8R8G8A8_Unorm,
    Undefined,
}

impl Format {
    /// True for depth (and depth-stencil) formats
    pub fn is_depth(&self) -> bool {
        matches!(self, Format::D16_Unorm | Format::D32_Float | Format::D32_Float_S8X24_Uint)
    }

    /// True when the format carries a stencil channel
    pub fn has_stencil(&self) -> bool {
        matches!(self, Format::D32_Float_S8X24_Uint)
    }

    /// Number of channels
    pub fn channel_count(&self) -> u32 {
        match self {
            Format::R8_Unorm | Format::R8_Uint | Format::R16_Unorm | Format::R16_Uint
            | Format::R16_Float | Format::R32_Uint | Format::R32_Sint | Format::R32_Float
            | Format::D16_Unorm | Format::D32_Float => 1,
            Format::R8G8_Unorm | Format::R16G16_Float | Format::R32G32_Uint | Format::R32G32_Sint
            | Format::R32G32_Float | Format::D32_Float_S8X24_Uint => 2,
            Format::R11G11B10_Float | Format::R32G32B32_Uint | Format::R32G32B32_Sint
            | Format::R32G32B32_Float => 3,
            Format::R8G8B8A8_Unorm | Format::R10G10B10A2_Unorm | Format::R16G16B16A16_Unorm
            | Format::R16G16B16A16_Snorm | Format::R16G16B16A16_Float
            | Format::R32G32B32A32_Uint | Format::R32G32B32A32_Sint
            | Format::R32G32B32A32_Float | Format::B8R8G8A8_Unorm => 4,
            Format::Undefined => 0,
        }
    }

    /// Size of one texel (or one vertex attribute) in bytes
    pub fn bytes_per_texel(&self) -> u32 {
        match self {
            Format::R8_Unorm | Format::R8_Uint => 1,
            Format::R16_Unorm | Format::R16_Uint | Format::R16_Float | Format::R8G8_Unorm
            | Format::D16_Unorm => 2,
            Format::R32_Uint | Format::R32_Sint | Format::R32_Float | Format::R16G16_Float
            | Format::R11G11B10_Float | Format::R8G8B8A8_Unorm | Format::R10G10B10A2_Unorm
            | Format::B8R8G8A8_Unorm | Format::D32_Float => 4,
            Format::R32G32_Uint | Format::R32G32_Sint | Format::R32G32_Float
            | Format::R16G16B16A16_Unorm | Format::R16G16B16A16_Snorm
            | Format::R16G16B16A16_Float | Format::D32_Float_S8X24_Uint => 8,
            Format::R32G32B32_Uint | Format::R32G32B32_Sint | Format::R32G32B32_Float => 12,
            Format::R32G32B32A32_Uint | Format::R32G32B32A32_Sint | Format::R32G32B32A32_Float => 16,
            Format::Undefined => 0,
        }
    }
}

// ===== IMAGE LAYOUTS =====

/// Image layout, tracked per mip by textures and per image by swap chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    General,
    Preinitialized,
    ColorAttachmentOptimal,
    DepthAttachmentOptimal,
    DepthStencilAttachmentOptimal,
    DepthStencilReadOnlyOptimal,
    ShaderReadOnlyOptimal,
    TransferSrcOptimal,
    TransferDstOptimal,
    PresentSrc,
    Undefined,
}

bitflags::bitflags! {
    /// Image aspects touched by a barrier
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ImageAspect: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

impl ImageAspect {
    /// Aspect mask matching a texture format
    pub fn from_format(format: Format) -> Self {
        if format.has_stencil() {
            ImageAspect::DEPTH | ImageAspect::STENCIL
        } else if format.is_depth() {
            ImageAspect::DEPTH
        } else {
            ImageAspect::COLOR
        }
    }
}

// ===== SHADERS & DESCRIPTORS =====

bitflags::bitflags! {
    /// Shader stage bitmask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStage: u32 {
        const VERTEX = 1 << 0;
        const PIXEL = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

/// Descriptor type reported by shader reflection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescriptorType {
    Sampler,
    Texture,
    TextureStorage,
    PushConstantBuffer,
    ConstantBuffer,
    StructuredBuffer,
}

#[cfg(test)]
#[path = "definitions_tests.rs"]
mod tests;
