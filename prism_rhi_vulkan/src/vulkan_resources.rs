/// Images, views, buffers and samplers
///
/// Every creation function returns raw handles; the allocation backing an
/// image or buffer is tracked by the `GpuContext` under that raw handle and
/// released by `destroy_resource`.

use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use prism_rhi::prism::rhi::{
    BufferDesc, BufferUsage, ImageAspect, ResourceType, RhiHandle, SamplerDesc, TextureDesc,
    TextureFlags, TextureHandles,
};
use prism_rhi::prism::{Error, Result};
use prism_rhi::rhi_err;

use crate::vulkan_context::{GpuContext, LOG_SOURCE};
use crate::vulkan_conversions::{
    address_mode_to_vk, compare_to_vk, filter_to_vk, format_to_vk, image_aspect_to_vk,
    mipmap_mode_to_vk,
};

// ===== TEXTURES =====

/// Image usage implied by texture flags
pub(crate) fn texture_usage(flags: TextureFlags, is_depth: bool) -> vk::ImageUsageFlags {
    let mut usage = vk::ImageUsageFlags::empty();
    if flags.contains(TextureFlags::SRV) {
        usage |= vk::ImageUsageFlags::SAMPLED;
    }
    if flags.contains(TextureFlags::UAV) {
        usage |= vk::ImageUsageFlags::STORAGE;
    }
    if flags.contains(TextureFlags::RTV) && !is_depth {
        usage |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if flags.contains(TextureFlags::DSV) || (flags.contains(TextureFlags::RTV) && is_depth) {
        usage |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if flags.contains(TextureFlags::CLEAR_BLIT) {
        usage |= vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST;
    }
    usage
}

/// Create an image, its memory and the views its flags ask for
pub(crate) fn create_texture(ctx: &GpuContext, desc: &TextureDesc) -> Result<TextureHandles> {
    let format = format_to_vk(desc.format);
    let is_depth = desc.format.is_depth();
    let usage = texture_usage(desc.flags, is_depth);
    if usage.is_empty() {
        return Err(rhi_err!(LOG_SOURCE, "Texture '{}' has no usage flags", desc.name));
    }

    let image_create_info = vk::ImageCreateInfo::default()
        .image_type(vk::ImageType::TYPE_2D)
        .format(format)
        .extent(vk::Extent3D {
            width: desc.width,
            height: desc.height,
            depth: 1,
        })
        .mip_levels(desc.mip_count)
        .array_layers(desc.array_length)
        .samples(vk::SampleCountFlags::TYPE_1)
        .tiling(vk::ImageTiling::OPTIMAL)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE)
        .initial_layout(vk::ImageLayout::UNDEFINED);

    unsafe {
        let image = ctx.device.create_image(&image_create_info, None)
            .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to create image for texture '{}': {:?}", desc.name, e))?;

        let requirements = ctx.device.get_image_memory_requirements(image);
        let allocation = ctx.allocator().allocate(&AllocationCreateDesc {
            name: &desc.name,
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: false,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(_) => {
                ctx.device.destroy_image(image, None);
                let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                prism_rhi::rhi_error!(LOG_SOURCE, "Out of GPU memory for texture '{}' ({}x{}, {:.2} MB)",
                    desc.name, desc.width, desc.height, size_mb);
                return Err(Error::OutOfMemory);
            }
        };

        if let Err(e) = ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
            ctx.allocator().free(allocation).ok();
            ctx.device.destroy_image(image, None);
            return Err(rhi_err!(LOG_SOURCE, "Failed to bind memory of texture '{}': {:?}", desc.name, e));
        }
        ctx.track_allocation(image.as_raw(), allocation);

        let mut handles = TextureHandles {
            image: image.as_raw(),
            ..Default::default()
        };

        // From here on, a failure releases everything created so far
        let result = create_texture_views(ctx, desc, image, format, &mut handles);
        if let Err(error) = result {
            for view in handles.rtv.iter().chain(handles.srv_mips.iter()).chain(std::iter::once(&handles.srv)) {
                destroy_resource(ctx, ResourceType::TextureView, *view);
            }
            destroy_resource(ctx, ResourceType::Texture, handles.image);
            return Err(error);
        }

        Ok(handles)
    }
}

fn create_texture_views(
    ctx: &GpuContext,
    desc: &TextureDesc,
    image: vk::Image,
    format: vk::Format,
    handles: &mut TextureHandles,
) -> Result<()> {
    let aspect = ImageAspect::from_format(desc.format);
    // Shader views of depth-stencil images read depth only
    let srv_aspect = if desc.format.is_depth() { ImageAspect::DEPTH } else { aspect };
    let array_view = desc.array_length > 1;

    if desc.flags.intersects(TextureFlags::SRV | TextureFlags::UAV) {
        handles.srv = create_view(ctx, image, format, srv_aspect, 0, desc.mip_count, 0, desc.array_length, array_view)?;

        if desc.flags.contains(TextureFlags::PER_MIP_VIEWS) {
            for mip in 0..desc.mip_count {
                let view = create_view(ctx, image, format, srv_aspect, mip, 1, 0, desc.array_length, array_view)?;
                handles.srv_mips.push(view);
            }
        }
    }

    if desc.flags.intersects(TextureFlags::RTV | TextureFlags::DSV) {
        for slice in 0..desc.array_length {
            let view = create_view(ctx, image, format, aspect, 0, 1, slice, 1, false)?;
            handles.rtv.push(view);
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn create_view(
    ctx: &GpuContext,
    image: vk::Image,
    format: vk::Format,
    aspect: ImageAspect,
    mip_start: u32,
    mip_count: u32,
    slice_start: u32,
    slice_count: u32,
    array_view: bool,
) -> Result<RhiHandle> {
    let view_type = if array_view {
        vk::ImageViewType::TYPE_2D_ARRAY
    } else {
        vk::ImageViewType::TYPE_2D
    };

    let view_create_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(view_type)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: image_aspect_to_vk(aspect),
            base_mip_level: mip_start,
            level_count: mip_count,
            base_array_layer: slice_start,
            layer_count: slice_count,
        });

    let view = unsafe { ctx.device.create_image_view(&view_create_info, None) }
        .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to create image view: {:?}", e))?;
    Ok(view.as_raw())
}

// ===== BUFFERS =====

/// Create a persistently mapped, host-visible buffer
pub(crate) fn create_buffer(ctx: &GpuContext, desc: &BufferDesc) -> Result<(RhiHandle, u64)> {
    let usage = match desc.usage {
        BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
        BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
        BufferUsage::Constant => vk::BufferUsageFlags::UNIFORM_BUFFER,
        BufferUsage::Structured => vk::BufferUsageFlags::STORAGE_BUFFER,
    };

    let buffer_create_info = vk::BufferCreateInfo::default()
        .size(desc.size())
        .usage(usage | vk::BufferUsageFlags::TRANSFER_DST)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    unsafe {
        let buffer = ctx.device.create_buffer(&buffer_create_info, None)
            .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to create buffer '{}' of {} bytes: {:?}", desc.name, desc.size(), e))?;

        let requirements = ctx.device.get_buffer_memory_requirements(buffer);
        let allocation = ctx.allocator().allocate(&AllocationCreateDesc {
            name: &desc.name,
            requirements,
            location: MemoryLocation::CpuToGpu,
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(_) => {
                ctx.device.destroy_buffer(buffer, None);
                let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                prism_rhi::rhi_error!(LOG_SOURCE, "Out of GPU memory for buffer '{}' (required: {:.2} MB)", desc.name, size_mb);
                return Err(Error::OutOfMemory);
            }
        };

        if let Err(e) = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
            ctx.allocator().free(allocation).ok();
            ctx.device.destroy_buffer(buffer, None);
            return Err(rhi_err!(LOG_SOURCE, "Failed to bind memory of buffer '{}': {:?}", desc.name, e));
        }

        ctx.track_allocation(buffer.as_raw(), allocation);
        Ok((buffer.as_raw(), requirements.size))
    }
}

/// Copy bytes into a mapped buffer
pub(crate) fn update_buffer(ctx: &GpuContext, buffer: RhiHandle, offset: u64, data: &[u8]) -> Result<()> {
    let written = ctx.with_mapped(buffer, |mapped| {
        let start = offset as usize;
        let end = start + data.len();
        match mapped.get_mut(start..end) {
            Some(target) => {
                target.copy_from_slice(data);
                true
            }
            None => false,
        }
    });

    match written {
        Some(true) => Ok(()),
        Some(false) => Err(rhi_err!(LOG_SOURCE, "Write of {} bytes at offset {} overflows buffer {:#x}",
            data.len(), offset, buffer)),
        None => Err(Error::InvalidResource(format!("buffer {:#x} is not mapped", buffer))),
    }
}

// ===== SAMPLERS =====

pub(crate) fn create_sampler(ctx: &GpuContext, desc: &SamplerDesc) -> Result<RhiHandle> {
    let address_mode = address_mode_to_vk(desc.address_mode);
    let mut create_info = vk::SamplerCreateInfo::default()
        .mag_filter(filter_to_vk(desc.filter_mag))
        .min_filter(filter_to_vk(desc.filter_min))
        .mipmap_mode(mipmap_mode_to_vk(desc.filter_mipmap))
        .address_mode_u(address_mode)
        .address_mode_v(address_mode)
        .address_mode_w(address_mode)
        .mip_lod_bias(desc.mip_lod_bias)
        .min_lod(0.0)
        .max_lod(vk::LOD_CLAMP_NONE)
        .border_color(vk::BorderColor::FLOAT_OPAQUE_WHITE)
        .unnormalized_coordinates(false);

    if desc.anisotropy > 0.0 {
        create_info = create_info.anisotropy_enable(true).max_anisotropy(desc.anisotropy);
    }
    if let Some(comparison) = desc.comparison {
        create_info = create_info.compare_enable(true).compare_op(compare_to_vk(comparison));
    }

    let sampler = unsafe { ctx.device.create_sampler(&create_info, None) }
        .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to create sampler: {:?}", e))?;
    Ok(sampler.as_raw())
}

// ===== DESTRUCTION =====

/// Destroy a raw object, releasing the allocation of images and buffers
pub(crate) fn destroy_resource(ctx: &GpuContext, resource_type: ResourceType, handle: RhiHandle) {
    if handle == 0 {
        return;
    }

    unsafe {
        let device = &ctx.device;
        match resource_type {
            ResourceType::Texture => {
                device.destroy_image(vk::Image::from_raw(handle), None);
                ctx.free_allocation(handle);
            }
            ResourceType::Buffer => {
                device.destroy_buffer(vk::Buffer::from_raw(handle), None);
                ctx.free_allocation(handle);
            }
            ResourceType::TextureView => device.destroy_image_view(vk::ImageView::from_raw(handle), None),
            ResourceType::Shader => device.destroy_shader_module(vk::ShaderModule::from_raw(handle), None),
            ResourceType::Sampler => device.destroy_sampler(vk::Sampler::from_raw(handle), None),
            ResourceType::Fence => device.destroy_fence(vk::Fence::from_raw(handle), None),
            ResourceType::Semaphore => device.destroy_semaphore(vk::Semaphore::from_raw(handle), None),
            ResourceType::QueryPool => device.destroy_query_pool(vk::QueryPool::from_raw(handle), None),
            ResourceType::CommandPool => device.destroy_command_pool(vk::CommandPool::from_raw(handle), None),
            ResourceType::DescriptorSetLayout => {
                device.destroy_descriptor_set_layout(vk::DescriptorSetLayout::from_raw(handle), None)
            }
            ResourceType::Pipeline => device.destroy_pipeline(vk::Pipeline::from_raw(handle), None),
            ResourceType::PipelineLayout => {
                device.destroy_pipeline_layout(vk::PipelineLayout::from_raw(handle), None)
            }
            ResourceType::DeviceMemory | ResourceType::CommandList | ResourceType::DescriptorSet => {
                // Owned by an allocator or a pool, released with it
                prism_rhi::rhi_warn!(LOG_SOURCE, "Ignoring direct destruction of {:?} {:#x}", resource_type, handle);
            }
        }
    }
}

#[cfg(test)]
#[path = "vulkan_resources_tests.rs"]
mod tests;
