/// Core enum and flag translation to Vulkan

use ash::vk;
use prism_rhi::prism::rhi::{
    Blend, BlendOperation, CompareFunction, CullMode, DescriptorType, Filter, Format,
    ImageAspect, ImageLayout, PhysicalDeviceType, PolygonMode, PresentMode, PrimitiveTopology,
    ResourceType, SamplerAddressMode, ShaderStage, StencilOperation,
};

// ===== FORMATS =====

pub(crate) fn format_to_vk(format: Format) -> vk::Format {
    match format {
        // R
        Format::R8_Unorm => vk::Format::R8_UNORM,
        Format::R8_Uint => vk::Format::R8_UINT,
        Format::R16_Unorm => vk::Format::R16_UNORM,
        Format::R16_Uint => vk::Format::R16_UINT,
        Format::R16_Float => vk::Format::R16_SFLOAT,
        Format::R32_Uint => vk::Format::R32_UINT,
        Format::R32_Sint => vk::Format::R32_SINT,
        Format::R32_Float => vk::Format::R32_SFLOAT,
        // Rg
        Format::R8G8_Unorm => vk::Format::R8G8_UNORM,
        Format::R16G16_Float => vk::Format::R16G16_SFLOAT,
        Format::R32G32_Uint => vk::Format::R32G32_UINT,
        Format::R32G32_Sint => vk::Format::R32G32_SINT,
        Format::R32G32_Float => vk::Format::R32G32_SFLOAT,
        // Rgb
        Format::R11G11B10_Float => vk::Format::B10G11R11_UFLOAT_PACK32,
        Format::R32G32B32_Uint => vk::Format::R32G32B32_UINT,
        Format::R32G32B32_Sint => vk::Format::R32G32B32_SINT,
        Format::R32G32B32_Float => vk::Format::R32G32B32_SFLOAT,
        // Rgba
        Format::R8G8B8A8_Unorm => vk::Format::R8G8B8A8_UNORM,
        Format::R10G10B10A2_Unorm => vk::Format::A2B10G10R10_UNORM_PACK32,
        Format::R16G16B16A16_Unorm => vk::Format::R16G16B16A16_UNORM,
        Format::R16G16B16A16_Snorm => vk::Format::R16G16B16A16_SNORM,
        Format::R16G16B16A16_Float => vk::Format::R16G16B16A16_SFLOAT,
        Format::R32G32B32A32_Uint => vk::Format::R32G32B32A32_UINT,
        Format::R32G32B32A32_Sint => vk::Format::R32G32B32A32_SINT,
        Format::R32G32B32A32_Float => vk::Format::R32G32B32A32_SFLOAT,
        // Depth
        Format::D16_Unorm => vk::Format::D16_UNORM,
        Format::D32_Float => vk::Format::D32_SFLOAT,
        Format::D32_Float_S8X24_Uint => vk::Format::D32_SFLOAT_S8_UINT,
        // Surface
        Format::B8R8G8A8_Unorm => vk::Format::B8G8R8A8_UNORM,
        Format::Undefined => vk::Format::UNDEFINED,
    }
}

/// Reverse mapping, used for surface formats
pub(crate) fn format_from_vk(format: vk::Format) -> Format {
    match format {
        vk::Format::B8G8R8A8_UNORM => Format::B8R8G8A8_Unorm,
        vk::Format::R8G8B8A8_UNORM => Format::R8G8B8A8_Unorm,
        vk::Format::A2B10G10R10_UNORM_PACK32 => Format::R10G10B10A2_Unorm,
        vk::Format::R16G16B16A16_SFLOAT => Format::R16G16B16A16_Float,
        _ => Format::Undefined,
    }
}

// ===== LAYOUTS & ASPECTS =====

pub(crate) fn image_layout_to_vk(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::General => vk::ImageLayout::GENERAL,
        ImageLayout::Preinitialized => vk::ImageLayout::PREINITIALIZED,
        ImageLayout::ColorAttachmentOptimal => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthAttachmentOptimal => vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilAttachmentOptimal => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilReadOnlyOptimal => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        ImageLayout::ShaderReadOnlyOptimal => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::TransferSrcOptimal => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ImageLayout::TransferDstOptimal => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
    }
}

pub(crate) fn image_aspect_to_vk(aspect: ImageAspect) -> vk::ImageAspectFlags {
    let mut flags = vk::ImageAspectFlags::empty();
    if aspect.contains(ImageAspect::COLOR) {
        flags |= vk::ImageAspectFlags::COLOR;
    }
    if aspect.contains(ImageAspect::DEPTH) {
        flags |= vk::ImageAspectFlags::DEPTH;
    }
    if aspect.contains(ImageAspect::STENCIL) {
        flags |= vk::ImageAspectFlags::STENCIL;
    }
    flags
}

/// Access mask and pipeline stage a layout is produced or consumed in
pub(crate) fn layout_access_and_stage(layout: ImageLayout) -> (vk::AccessFlags, vk::PipelineStageFlags) {
    match layout {
        ImageLayout::Undefined | ImageLayout::Preinitialized => {
            (vk::AccessFlags::empty(), vk::PipelineStageFlags::TOP_OF_PIPE)
        }
        ImageLayout::General => (
            vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
            vk::PipelineStageFlags::COMPUTE_SHADER | vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        ImageLayout::ColorAttachmentOptimal => (
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
        ImageLayout::DepthAttachmentOptimal | ImageLayout::DepthStencilAttachmentOptimal => (
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        ),
        ImageLayout::DepthStencilReadOnlyOptimal => (
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        ImageLayout::ShaderReadOnlyOptimal => (
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::VERTEX_SHADER
                | vk::PipelineStageFlags::FRAGMENT_SHADER
                | vk::PipelineStageFlags::COMPUTE_SHADER,
        ),
        ImageLayout::TransferSrcOptimal => (vk::AccessFlags::TRANSFER_READ, vk::PipelineStageFlags::TRANSFER),
        ImageLayout::TransferDstOptimal => (vk::AccessFlags::TRANSFER_WRITE, vk::PipelineStageFlags::TRANSFER),
        ImageLayout::PresentSrc => (vk::AccessFlags::empty(), vk::PipelineStageFlags::BOTTOM_OF_PIPE),
    }
}

// ===== SHADERS & DESCRIPTORS =====

pub(crate) fn shader_stage_to_vk(stage: ShaderStage) -> vk::ShaderStageFlags {
    let mut flags = vk::ShaderStageFlags::empty();
    if stage.contains(ShaderStage::VERTEX) {
        flags |= vk::ShaderStageFlags::VERTEX;
    }
    if stage.contains(ShaderStage::PIXEL) {
        flags |= vk::ShaderStageFlags::FRAGMENT;
    }
    if stage.contains(ShaderStage::COMPUTE) {
        flags |= vk::ShaderStageFlags::COMPUTE;
    }
    flags
}

/// None for push constants, which are not descriptors in Vulkan
pub(crate) fn descriptor_type_to_vk(ty: DescriptorType) -> Option<vk::DescriptorType> {
    match ty {
        DescriptorType::Sampler => Some(vk::DescriptorType::SAMPLER),
        DescriptorType::Texture => Some(vk::DescriptorType::SAMPLED_IMAGE),
        DescriptorType::TextureStorage => Some(vk::DescriptorType::STORAGE_IMAGE),
        DescriptorType::ConstantBuffer => Some(vk::DescriptorType::UNIFORM_BUFFER),
        DescriptorType::StructuredBuffer => Some(vk::DescriptorType::STORAGE_BUFFER),
        DescriptorType::PushConstantBuffer => None,
    }
}

// ===== FIXED FUNCTION =====

pub(crate) fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
    }
}

pub(crate) fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub(crate) fn polygon_mode_to_vk(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Solid => vk::PolygonMode::FILL,
        PolygonMode::Wireframe => vk::PolygonMode::LINE,
    }
}

pub(crate) fn compare_to_vk(function: CompareFunction) -> vk::CompareOp {
    match function {
        CompareFunction::Never => vk::CompareOp::NEVER,
        CompareFunction::Less => vk::CompareOp::LESS,
        CompareFunction::Equal => vk::CompareOp::EQUAL,
        CompareFunction::LessEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareFunction::Greater => vk::CompareOp::GREATER,
        CompareFunction::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareFunction::GreaterEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareFunction::Always => vk::CompareOp::ALWAYS,
    }
}

pub(crate) fn stencil_op_to_vk(operation: StencilOperation) -> vk::StencilOp {
    match operation {
        StencilOperation::Keep => vk::StencilOp::KEEP,
        StencilOperation::Zero => vk::StencilOp::ZERO,
        StencilOperation::Replace => vk::StencilOp::REPLACE,
        StencilOperation::IncrSat => vk::StencilOp::INCREMENT_AND_CLAMP,
        StencilOperation::DecrSat => vk::StencilOp::DECREMENT_AND_CLAMP,
        StencilOperation::Invert => vk::StencilOp::INVERT,
        StencilOperation::Incr => vk::StencilOp::INCREMENT_AND_WRAP,
        StencilOperation::Decr => vk::StencilOp::DECREMENT_AND_WRAP,
    }
}

pub(crate) fn blend_to_vk(blend: Blend) -> vk::BlendFactor {
    match blend {
        Blend::Zero => vk::BlendFactor::ZERO,
        Blend::One => vk::BlendFactor::ONE,
        Blend::SrcColor => vk::BlendFactor::SRC_COLOR,
        Blend::InvSrcColor => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        Blend::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        Blend::InvSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        Blend::DestAlpha => vk::BlendFactor::DST_ALPHA,
        Blend::InvDestAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        Blend::DestColor => vk::BlendFactor::DST_COLOR,
        Blend::InvDestColor => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        Blend::SrcAlphaSat => vk::BlendFactor::SRC_ALPHA_SATURATE,
        Blend::BlendFactor => vk::BlendFactor::CONSTANT_COLOR,
        Blend::InvBlendFactor => vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR,
        Blend::Src1Color => vk::BlendFactor::SRC1_COLOR,
        Blend::InvSrc1Color => vk::BlendFactor::ONE_MINUS_SRC1_COLOR,
        Blend::Src1Alpha => vk::BlendFactor::SRC1_ALPHA,
        Blend::InvSrc1Alpha => vk::BlendFactor::ONE_MINUS_SRC1_ALPHA,
    }
}

pub(crate) fn blend_op_to_vk(operation: BlendOperation) -> vk::BlendOp {
    match operation {
        BlendOperation::Add => vk::BlendOp::ADD,
        BlendOperation::Subtract => vk::BlendOp::SUBTRACT,
        BlendOperation::RevSubtract => vk::BlendOp::REVERSE_SUBTRACT,
        BlendOperation::Min => vk::BlendOp::MIN,
        BlendOperation::Max => vk::BlendOp::MAX,
    }
}

// ===== SAMPLERS =====

pub(crate) fn filter_to_vk(filter: Filter) -> vk::Filter {
    match filter {
        Filter::Nearest => vk::Filter::NEAREST,
        Filter::Linear => vk::Filter::LINEAR,
    }
}

pub(crate) fn mipmap_mode_to_vk(filter: Filter) -> vk::SamplerMipmapMode {
    match filter {
        Filter::Nearest => vk::SamplerMipmapMode::NEAREST,
        Filter::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub(crate) fn address_mode_to_vk(mode: SamplerAddressMode) -> vk::SamplerAddressMode {
    match mode {
        SamplerAddressMode::Wrap => vk::SamplerAddressMode::REPEAT,
        SamplerAddressMode::Mirror => vk::SamplerAddressMode::MIRRORED_REPEAT,
        SamplerAddressMode::Clamp => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        SamplerAddressMode::Border => vk::SamplerAddressMode::CLAMP_TO_BORDER,
        SamplerAddressMode::MirrorOnce => vk::SamplerAddressMode::MIRROR_CLAMP_TO_EDGE,
    }
}

// ===== DEVICE =====

pub(crate) fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
    }
}

pub(crate) fn device_type_from_vk(device_type: vk::PhysicalDeviceType) -> PhysicalDeviceType {
    match device_type {
        vk::PhysicalDeviceType::INTEGRATED_GPU => PhysicalDeviceType::Integrated,
        vk::PhysicalDeviceType::DISCRETE_GPU => PhysicalDeviceType::Discrete,
        vk::PhysicalDeviceType::VIRTUAL_GPU => PhysicalDeviceType::Virtual,
        vk::PhysicalDeviceType::CPU => PhysicalDeviceType::Cpu,
        _ => PhysicalDeviceType::Undefined,
    }
}

/// Object type used for debug names
pub(crate) fn object_type_to_vk(resource_type: ResourceType) -> vk::ObjectType {
    match resource_type {
        ResourceType::Fence => vk::ObjectType::FENCE,
        ResourceType::Semaphore => vk::ObjectType::SEMAPHORE,
        ResourceType::Shader => vk::ObjectType::SHADER_MODULE,
        ResourceType::Sampler => vk::ObjectType::SAMPLER,
        ResourceType::QueryPool => vk::ObjectType::QUERY_POOL,
        ResourceType::DeviceMemory => vk::ObjectType::DEVICE_MEMORY,
        ResourceType::Buffer => vk::ObjectType::BUFFER,
        ResourceType::CommandList => vk::ObjectType::COMMAND_BUFFER,
        ResourceType::CommandPool => vk::ObjectType::COMMAND_POOL,
        ResourceType::Texture => vk::ObjectType::IMAGE,
        ResourceType::TextureView => vk::ObjectType::IMAGE_VIEW,
        ResourceType::DescriptorSet => vk::ObjectType::DESCRIPTOR_SET,
        ResourceType::DescriptorSetLayout => vk::ObjectType::DESCRIPTOR_SET_LAYOUT,
        ResourceType::Pipeline => vk::ObjectType::PIPELINE,
        ResourceType::PipelineLayout => vk::ObjectType::PIPELINE_LAYOUT,
    }
}

#[cfg(test)]
#[path = "vulkan_conversions_tests.rs"]
mod tests;
