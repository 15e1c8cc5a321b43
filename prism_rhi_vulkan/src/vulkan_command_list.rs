/// VulkanCommandEncoder - Vulkan implementation of the CommandEncoder trait
///
/// Each encoder owns one primary command buffer (allocated from the pool
/// of its command list), the fence signalled by its submissions, a
/// timestamp query pool and a descriptor pool reset on every `begin`.

use std::ffi::CString;
use std::sync::Arc;
use ash::vk;
use ash::vk::Handle;
use prism_rhi::prism::rhi::{
    ClearValue, CommandEncoder, DescriptorResource, DescriptorWrite, ImageAspect, ImageBarrier,
    ImageRegion, LoadOp, Rectangle, RenderingInfo, RhiHandle, ShaderStage, Viewport, ALL_MIPS,
    MAX_TIMESTAMPS, SET_INDEX_RESOURCES, SET_INDEX_SAMPLERS_COMPARISON,
};
use prism_rhi::prism::Result;
use prism_rhi::rhi_err;

use crate::vulkan_context::{GpuContext, LOG_SOURCE};
use crate::vulkan_conversions::{image_aspect_to_vk, image_layout_to_vk, layout_access_and_stage, shader_stage_to_vk};

/// Descriptor sets one encoder can allocate between two `begin`
const MAX_DESCRIPTOR_SETS: u32 = 1024;
/// Descriptors of each type one encoder can allocate between two `begin`
const MAX_DESCRIPTORS_PER_TYPE: u32 = 4096;

/// Vulkan command encoder
pub struct VulkanCommandEncoder {
    ctx: Arc<GpuContext>,
    name: String,
    command_buffer: vk::CommandBuffer,
    /// Signalled when the last submission completes
    fence: vk::Fence,
    query_pool: vk::QueryPool,
    descriptor_pool: vk::DescriptorPool,
    /// Fixed sampler sets bound at indices 1 and 2
    sampler_sets: [vk::DescriptorSet; 2],
    submitted: bool,
}

impl VulkanCommandEncoder {
    /// Create an encoder
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared GPU context
    /// * `pool` - Command pool of the command list
    /// * `name` - Debug name of the command buffer
    /// * `sampler_sets` - Device sampler sets (comparison, regular)
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        pool: vk::CommandPool,
        name: &str,
        sampler_sets: [vk::DescriptorSet; 2],
    ) -> Result<Self> {
        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = ctx.device.allocate_command_buffers(&allocate_info)
                .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to allocate command buffer '{}': {:?}", name, e))?[0];

            // Signalled so that a wait before the first submission returns at once
            let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
            let fence = ctx.device.create_fence(&fence_info, None)
                .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to create fence for '{}': {:?}", name, e))?;

            let query_pool_info = vk::QueryPoolCreateInfo::default()
                .query_type(vk::QueryType::TIMESTAMP)
                .query_count(MAX_TIMESTAMPS as u32);
            let query_pool = match ctx.device.create_query_pool(&query_pool_info, None) {
                Ok(query_pool) => query_pool,
                Err(e) => {
                    ctx.device.destroy_fence(fence, None);
                    return Err(rhi_err!(LOG_SOURCE, "Failed to create query pool for '{}': {:?}", name, e));
                }
            };

            let pool_sizes = [
                vk::DescriptorType::UNIFORM_BUFFER,
                vk::DescriptorType::STORAGE_BUFFER,
                vk::DescriptorType::SAMPLED_IMAGE,
                vk::DescriptorType::STORAGE_IMAGE,
                vk::DescriptorType::SAMPLER,
            ]
            .map(|ty| vk::DescriptorPoolSize {
                ty,
                descriptor_count: MAX_DESCRIPTORS_PER_TYPE,
            });
            let descriptor_pool_info = vk::DescriptorPoolCreateInfo::default()
                .max_sets(MAX_DESCRIPTOR_SETS)
                .pool_sizes(&pool_sizes);
            let descriptor_pool = match ctx.device.create_descriptor_pool(&descriptor_pool_info, None) {
                Ok(descriptor_pool) => descriptor_pool,
                Err(e) => {
                    ctx.device.destroy_query_pool(query_pool, None);
                    ctx.device.destroy_fence(fence, None);
                    return Err(rhi_err!(LOG_SOURCE, "Failed to create descriptor pool for '{}': {:?}", name, e));
                }
            };

            ctx.name_object(command_buffer, name);

            Ok(Self {
                ctx,
                name: name.to_string(),
                command_buffer,
                fence,
                query_pool,
                descriptor_pool,
                sampler_sets,
                submitted: false,
            })
        }
    }

    fn bind_point(is_compute: bool) -> vk::PipelineBindPoint {
        if is_compute {
            vk::PipelineBindPoint::COMPUTE
        } else {
            vk::PipelineBindPoint::GRAPHICS
        }
    }

    fn subresource_layers(region: &ImageRegion) -> vk::ImageSubresourceLayers {
        vk::ImageSubresourceLayers {
            aspect_mask: image_aspect_to_vk(region.aspect),
            mip_level: region.mip,
            base_array_layer: 0,
            layer_count: region.array_length,
        }
    }
}

/// Buffer or image info referenced by one descriptor write
enum WriteInfo {
    Buffer(usize),
    Image(usize),
}

impl CommandEncoder for VulkanCommandEncoder {
    // ===== LIFECYCLE =====

    fn begin(&mut self) -> Result<()> {
        unsafe {
            self.ctx.device.reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to reset command buffer '{}': {:?}", self.name, e))?;
            self.ctx.device.reset_descriptor_pool(self.descriptor_pool, vk::DescriptorPoolResetFlags::empty())
                .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to reset descriptor pool of '{}': {:?}", self.name, e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.ctx.device.begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to begin command buffer '{}': {:?}", self.name, e))?;

            self.ctx.device.cmd_reset_query_pool(self.command_buffer, self.query_pool, 0, MAX_TIMESTAMPS as u32);
        }
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        unsafe { self.ctx.device.end_command_buffer(self.command_buffer) }
            .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to end command buffer '{}': {:?}", self.name, e))
    }

    fn submit(&mut self) -> Result<()> {
        let command_buffers = [self.command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        unsafe {
            self.ctx.device.reset_fences(&[self.fence])
                .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to reset fence of '{}': {:?}", self.name, e))?;

            let _queue = self.ctx.lock_queue();
            self.ctx.device.queue_submit(self.ctx.graphics_queue, &[submit_info], self.fence)
                .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to submit '{}': {:?}", self.name, e))?;
        }

        self.submitted = true;
        Ok(())
    }

    fn wait(&mut self) -> Result<()> {
        unsafe { self.ctx.device.wait_for_fences(&[self.fence], true, u64::MAX) }
            .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to wait for '{}': {:?}", self.name, e))?;
        self.submitted = false;
        Ok(())
    }

    fn is_executing(&self) -> bool {
        if !self.submitted {
            return false;
        }
        // A lost device reports the fence as not signalled forever; treat it as done
        !unsafe { self.ctx.device.get_fence_status(self.fence) }.unwrap_or(true)
    }

    // ===== BINDING =====

    fn bind_pipeline(&mut self, pipeline: RhiHandle, layout: RhiHandle, is_compute: bool) {
        let bind_point = Self::bind_point(is_compute);
        unsafe {
            self.ctx.device.cmd_bind_pipeline(self.command_buffer, bind_point, vk::Pipeline::from_raw(pipeline));
            self.ctx.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                bind_point,
                vk::PipelineLayout::from_raw(layout),
                SET_INDEX_SAMPLERS_COMPARISON,
                &self.sampler_sets,
                &[],
            );
        }
    }

    fn bind_descriptors(
        &mut self,
        layout: RhiHandle,
        set_layout: RhiHandle,
        is_compute: bool,
        writes: &[DescriptorWrite],
    ) -> Result<()> {
        let set_layouts = [vk::DescriptorSetLayout::from_raw(set_layout)];
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.descriptor_pool)
            .set_layouts(&set_layouts);
        let set = unsafe { self.ctx.device.allocate_descriptor_sets(&allocate_info) }
            .map_err(|e| rhi_err!(LOG_SOURCE, "Failed to allocate descriptor set in '{}': {:?}", self.name, e))?[0];

        // Infos first: the writes point into these vectors
        let mut buffer_infos: Vec<vk::DescriptorBufferInfo> = Vec::with_capacity(writes.len());
        let mut image_infos: Vec<vk::DescriptorImageInfo> = Vec::with_capacity(writes.len());
        let mut kinds: Vec<(u32, vk::DescriptorType, WriteInfo)> = Vec::with_capacity(writes.len());

        for write in writes {
            let (ty, info) = match write.resource {
                DescriptorResource::ConstantBuffer { buffer, range } => {
                    buffer_infos.push(vk::DescriptorBufferInfo {
                        buffer: vk::Buffer::from_raw(buffer),
                        offset: 0,
                        range,
                    });
                    (vk::DescriptorType::UNIFORM_BUFFER, WriteInfo::Buffer(buffer_infos.len() - 1))
                }
                DescriptorResource::StructuredBuffer { buffer, range } => {
                    buffer_infos.push(vk::DescriptorBufferInfo {
                        buffer: vk::Buffer::from_raw(buffer),
                        offset: 0,
                        range,
                    });
                    (vk::DescriptorType::STORAGE_BUFFER, WriteInfo::Buffer(buffer_infos.len() - 1))
                }
                DescriptorResource::Texture { view, layout } => {
                    image_infos.push(vk::DescriptorImageInfo {
                        sampler: vk::Sampler::null(),
                        image_view: vk::ImageView::from_raw(view),
                        image_layout: image_layout_to_vk(layout),
                    });
                    (vk::DescriptorType::SAMPLED_IMAGE, WriteInfo::Image(image_infos.len() - 1))
                }
                DescriptorResource::TextureStorage { view } => {
                    image_infos.push(vk::DescriptorImageInfo {
                        sampler: vk::Sampler::null(),
                        image_view: vk::ImageView::from_raw(view),
                        image_layout: vk::ImageLayout::GENERAL,
                    });
                    (vk::DescriptorType::STORAGE_IMAGE, WriteInfo::Image(image_infos.len() - 1))
                }
                DescriptorResource::Sampler { sampler } => {
                    image_infos.push(vk::DescriptorImageInfo {
                        sampler: vk::Sampler::from_raw(sampler),
                        image_view: vk::ImageView::null(),
                        image_layout: vk::ImageLayout::UNDEFINED,
                    });
                    (vk::DescriptorType::SAMPLER, WriteInfo::Image(image_infos.len() - 1))
                }
            };
            kinds.push((write.slot, ty, info));
        }

        let descriptor_writes: Vec<vk::WriteDescriptorSet> = kinds
            .iter()
            .map(|(slot, ty, info)| {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(*slot)
                    .descriptor_type(*ty);
                match info {
                    WriteInfo::Buffer(index) => write.buffer_info(std::slice::from_ref(&buffer_infos[*index])),
                    WriteInfo::Image(index) => write.image_info(std::slice::from_ref(&image_infos[*index])),
                }
            })
            .collect();

        unsafe {
            self.ctx.device.update_descriptor_sets(&descriptor_writes, &[]);
            self.ctx.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                Self::bind_point(is_compute),
                vk::PipelineLayout::from_raw(layout),
                SET_INDEX_RESOURCES,
                &[set],
                &[],
            );
        }
        Ok(())
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        let viewports = [vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.depth_min,
            max_depth: viewport.depth_max,
        }];
        unsafe { self.ctx.device.cmd_set_viewport(self.command_buffer, 0, &viewports) };
    }

    fn set_scissor(&mut self, rectangle: &Rectangle) {
        let scissors = [vk::Rect2D {
            offset: vk::Offset2D {
                x: rectangle.left as i32,
                y: rectangle.top as i32,
            },
            extent: vk::Extent2D {
                width: (rectangle.right - rectangle.left).max(0.0) as u32,
                height: (rectangle.bottom - rectangle.top).max(0.0) as u32,
            },
        }];
        unsafe { self.ctx.device.cmd_set_scissor(self.command_buffer, 0, &scissors) };
    }

    fn bind_vertex_buffer(&mut self, binding: u32, buffer: RhiHandle) {
        unsafe {
            self.ctx.device.cmd_bind_vertex_buffers(self.command_buffer, binding, &[vk::Buffer::from_raw(buffer)], &[0]);
        }
    }

    fn bind_index_buffer(&mut self, buffer: RhiHandle, is_16bit: bool) {
        let index_type = if is_16bit { vk::IndexType::UINT16 } else { vk::IndexType::UINT32 };
        unsafe {
            self.ctx.device.cmd_bind_index_buffer(self.command_buffer, vk::Buffer::from_raw(buffer), 0, index_type);
        }
    }

    fn push_constants(&mut self, layout: RhiHandle, stages: ShaderStage, offset: u32, data: &[u8]) {
        unsafe {
            self.ctx.device.cmd_push_constants(
                self.command_buffer,
                vk::PipelineLayout::from_raw(layout),
                shader_stage_to_vk(stages),
                offset,
                data,
            );
        }
    }

    // ===== DRAW & DISPATCH =====

    fn draw(&mut self, vertex_count: u32, instance_count: u32, vertex_offset: u32, instance_offset: u32) {
        unsafe {
            self.ctx.device.cmd_draw(self.command_buffer, vertex_count, instance_count, vertex_offset, instance_offset);
        }
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        index_offset: u32,
        vertex_offset: i32,
        instance_offset: u32,
    ) {
        unsafe {
            self.ctx.device.cmd_draw_indexed(
                self.command_buffer,
                index_count,
                instance_count,
                index_offset,
                vertex_offset,
                instance_offset,
            );
        }
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        unsafe { self.ctx.device.cmd_dispatch(self.command_buffer, x, y, z) };
    }

    // ===== RENDERING =====

    fn begin_rendering(&mut self, info: &RenderingInfo) -> Result<()> {
        let color_attachments: Vec<vk::RenderingAttachmentInfo> = info
            .color
            .iter()
            .map(|attachment| {
                let (load_op, clear) = match attachment.load {
                    LoadOp::Load => (vk::AttachmentLoadOp::LOAD, [0.0; 4]),
                    LoadOp::DontCare => (vk::AttachmentLoadOp::DONT_CARE, [0.0; 4]),
                    LoadOp::Clear(color) => (vk::AttachmentLoadOp::CLEAR, color),
                };
                vk::RenderingAttachmentInfo::default()
                    .image_view(vk::ImageView::from_raw(attachment.view))
                    .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                    .load_op(load_op)
                    .store_op(vk::AttachmentStoreOp::STORE)
                    .clear_value(vk::ClearValue {
                        color: vk::ClearColorValue { float32: clear },
                    })
            })
            .collect();

        let mut depth_attachment = vk::RenderingAttachmentInfo::default();
        let mut stencil_attachment = vk::RenderingAttachmentInfo::default();
        let mut has_stencil = false;

        if let Some(depth) = &info.depth {
            let layout = if depth.read_only {
                vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
            } else {
                vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
            };
            let store_op = if depth.read_only {
                vk::AttachmentStoreOp::NONE
            } else {
                vk::AttachmentStoreOp::STORE
            };

            let (depth_load, depth_clear) = match depth.load_depth {
                LoadOp::Load => (vk::AttachmentLoadOp::LOAD, 0.0),
                LoadOp::DontCare => (vk::AttachmentLoadOp::DONT_CARE, 0.0),
                LoadOp::Clear(value) => (vk::AttachmentLoadOp::CLEAR, value),
            };
            let (stencil_load, stencil_clear) = match depth.load_stencil {
                LoadOp::Load => (vk::AttachmentLoadOp::LOAD, 0),
                LoadOp::DontCare => (vk::AttachmentLoadOp::DONT_CARE, 0),
                LoadOp::Clear(value) => (vk::AttachmentLoadOp::CLEAR, value),
            };
            let clear_value = vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: depth_clear,
                    stencil: stencil_clear,
                },
            };

            depth_attachment = vk::RenderingAttachmentInfo::default()
                .image_view(vk::ImageView::from_raw(depth.view))
                .image_layout(layout)
                .load_op(depth_load)
                .store_op(store_op)
                .clear_value(clear_value);

            has_stencil = depth.format.has_stencil();
            if has_stencil {
                stencil_attachment = vk::RenderingAttachmentInfo::default()
                    .image_view(vk::ImageView::from_raw(depth.view))
                    .image_layout(layout)
                    .load_op(stencil_load)
                    .store_op(store_op)
                    .clear_value(clear_value);
            }
        }

        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: info.width,
                    height: info.height,
                },
            })
            .layer_count(1)
            .color_attachments(&color_attachments);
        if info.depth.is_some() {
            rendering_info = rendering_info.depth_attachment(&depth_attachment);
        }
        if has_stencil {
            rendering_info = rendering_info.stencil_attachment(&stencil_attachment);
        }

        unsafe { self.ctx.device.cmd_begin_rendering(self.command_buffer, &rendering_info) };
        Ok(())
    }

    fn end_rendering(&mut self) {
        unsafe { self.ctx.device.cmd_end_rendering(self.command_buffer) };
    }

    fn image_barrier(&mut self, barrier: &ImageBarrier) {
        let (src_access, src_stage) = layout_access_and_stage(barrier.layout_old);
        let (dst_access, dst_stage) = layout_access_and_stage(barrier.layout_new);
        let level_count = if barrier.mip_range == ALL_MIPS {
            vk::REMAINING_MIP_LEVELS
        } else {
            barrier.mip_range
        };

        let image_barrier = vk::ImageMemoryBarrier::default()
            .src_access_mask(src_access)
            .dst_access_mask(dst_access)
            .old_layout(image_layout_to_vk(barrier.layout_old))
            .new_layout(image_layout_to_vk(barrier.layout_new))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(vk::Image::from_raw(barrier.image))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: image_aspect_to_vk(barrier.aspect),
                base_mip_level: barrier.mip_index,
                level_count,
                base_array_layer: 0,
                layer_count: barrier.array_length,
            });

        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                self.command_buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[image_barrier],
            );
        }
    }

    fn clear_image(&mut self, image: RhiHandle, aspect: ImageAspect, mip_count: u32, value: ClearValue) {
        let range = vk::ImageSubresourceRange {
            aspect_mask: image_aspect_to_vk(aspect),
            base_mip_level: 0,
            level_count: mip_count,
            base_array_layer: 0,
            layer_count: vk::REMAINING_ARRAY_LAYERS,
        };
        let image = vk::Image::from_raw(image);

        unsafe {
            match value {
                ClearValue::Color(color) => self.ctx.device.cmd_clear_color_image(
                    self.command_buffer,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &vk::ClearColorValue { float32: color },
                    &[range],
                ),
                ClearValue::DepthStencil { depth, stencil } => self.ctx.device.cmd_clear_depth_stencil_image(
                    self.command_buffer,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &vk::ClearDepthStencilValue { depth, stencil },
                    &[range],
                ),
            }
        }
    }

    fn blit(&mut self, source: &ImageRegion, destination: &ImageRegion) {
        let region = vk::ImageBlit {
            src_subresource: Self::subresource_layers(source),
            src_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D { x: source.width as i32, y: source.height as i32, z: 1 },
            ],
            dst_subresource: Self::subresource_layers(destination),
            dst_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D { x: destination.width as i32, y: destination.height as i32, z: 1 },
            ],
        };
        // Depth images only support nearest filtering
        let filter = if source.aspect.contains(ImageAspect::DEPTH) {
            vk::Filter::NEAREST
        } else {
            vk::Filter::LINEAR
        };

        unsafe {
            self.ctx.device.cmd_blit_image(
                self.command_buffer,
                vk::Image::from_raw(source.image),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::Image::from_raw(destination.image),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
                filter,
            );
        }
    }

    fn copy(&mut self, source: &ImageRegion, destination: &ImageRegion) {
        let region = vk::ImageCopy {
            src_subresource: Self::subresource_layers(source),
            src_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
            dst_subresource: Self::subresource_layers(destination),
            dst_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
            extent: vk::Extent3D {
                width: source.width,
                height: source.height,
                depth: 1,
            },
        };

        unsafe {
            self.ctx.device.cmd_copy_image(
                self.command_buffer,
                vk::Image::from_raw(source.image),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::Image::from_raw(destination.image),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
    }

    // ===== PROFILING =====

    fn write_timestamp(&mut self, index: u32) {
        unsafe {
            self.ctx.device.cmd_write_timestamp(
                self.command_buffer,
                vk::PipelineStageFlags::ALL_COMMANDS,
                self.query_pool,
                index,
            );
        }
    }

    fn read_timestamps(&mut self, out: &mut [u64]) -> Result<()> {
        if out.is_empty() {
            return Ok(());
        }
        let result = unsafe {
            self.ctx.device.get_query_pool_results(self.query_pool, 0, out, vk::QueryResultFlags::TYPE_64)
        };
        match result {
            // Partial results are kept, the next frame reads them again
            Ok(()) | Err(vk::Result::NOT_READY) => Ok(()),
            Err(e) => Err(rhi_err!(LOG_SOURCE, "Failed to read timestamps of '{}': {:?}", self.name, e)),
        }
    }

    fn begin_marker(&mut self, name: &str) {
        let Some(debug_utils) = &self.ctx.debug_utils_device else {
            return;
        };
        let Ok(label_name) = CString::new(name) else {
            return;
        };
        let label = vk::DebugUtilsLabelEXT::default().label_name(&label_name);
        unsafe { debug_utils.cmd_begin_debug_utils_label(self.command_buffer, &label) };
    }

    fn end_marker(&mut self) {
        if let Some(debug_utils) = &self.ctx.debug_utils_device {
            unsafe { debug_utils.cmd_end_debug_utils_label(self.command_buffer) };
        }
    }
}

impl Drop for VulkanCommandEncoder {
    fn drop(&mut self) {
        unsafe {
            if self.submitted {
                let _ = self.ctx.device.wait_for_fences(&[self.fence], true, u64::MAX);
            }
            // The command buffer goes away with its pool
            self.ctx.device.destroy_descriptor_pool(self.descriptor_pool, None);
            self.ctx.device.destroy_query_pool(self.query_pool, None);
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}
