/// Command list: validating recorder on top of a backend encoder
///
/// State machine: `Idle -> Recording -> Ended -> Submitted -> Idle`.
/// Every recording operation is only legal while `Recording`; a call in
/// any other state is a contract violation and is fatal.
///
/// The list caches the last bound vertex/index buffers, pipeline and
/// descriptor writes so redundant binds never reach the backend. Caches are
/// reset by `begin()`.

use std::sync::Arc;
use bytemuck::Pod;
use crate::rhi::backend::{
    ClearValue, ColorAttachment, CommandEncoder, DepthAttachment, DescriptorResource,
    DescriptorWrite, ImageBarrier, ImageRegion, RenderingInfo,
};
use crate::rhi::buffer::{ConstantBuffer, IndexBuffer, StructuredBuffer, VertexBuffer};
use crate::rhi::definitions::{
    ImageAspect, ImageLayout, ObjectId, QueueType, ResourceType, RhiHandle, ALL_MIPS, LOG_SOURCE,
    MAX_TIMESTAMPS,
};
use crate::rhi::device::Device;
use crate::rhi::pipeline::Pipeline;
use crate::rhi::pipeline_state::PipelineState;
use crate::rhi::profiler::Profiler;
use crate::rhi::sampler::Sampler;
use crate::rhi::state::{Rectangle, Viewport};
use crate::rhi::swap_chain::SwapChain;
use crate::rhi::texture::{mip_range_in_bounds, Texture, TextureFlags};

/// Number of vertex buffer bindings (per-vertex, per-instance)
const VERTEX_BINDING_COUNT: usize = 2;

/// Recording state of a command list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandListState {
    Idle,
    Recording,
    Ended,
    Submitted,
}

/// Active timeblock: a named scope with an optional marker and timing pair
#[derive(Debug)]
struct Timeblock {
    name: String,
    gpu_marker: bool,
    timestamp: Option<usize>,
}

/// GPU command list
pub struct CommandList {
    name: String,
    queue_type: QueueType,
    state: CommandListState,
    device: Device,
    profiler: Arc<Profiler>,
    /// Owned by the device's deletion queue once the list is dropped
    pool: RhiHandle,
    encoder: Box<dyn CommandEncoder>,

    // Bind caches
    vertex_buffer_ids: [ObjectId; VERTEX_BINDING_COUNT],
    index_buffer_id: ObjectId,
    pipeline_state: Option<PipelineState>,
    pipeline: Option<Arc<Pipeline>>,
    pipeline_dirty: bool,
    bindings: Vec<DescriptorWrite>,
    bindings_dirty: bool,
    is_rendering: bool,

    // Profiling
    timestamps: Box<[u64; MAX_TIMESTAMPS]>,
    timestamp_index: usize,
    /// Timestamps written by the last submitted recording
    timestamps_submitted: usize,
    timeblock: Option<Timeblock>,
}

impl CommandList {
    pub(crate) fn new(
        device: Device,
        queue_type: QueueType,
        pool: RhiHandle,
        encoder: Box<dyn CommandEncoder>,
        name: &str,
    ) -> Self {
        let profiler = device.profiler().clone();
        Self {
            name: name.to_string(),
            queue_type,
            state: CommandListState::Idle,
            device,
            profiler,
            pool,
            encoder,
            vertex_buffer_ids: [0; VERTEX_BINDING_COUNT],
            index_buffer_id: 0,
            pipeline_state: None,
            pipeline: None,
            pipeline_dirty: false,
            bindings: Vec::new(),
            bindings_dirty: false,
            is_rendering: false,
            timestamps: Box::new([0; MAX_TIMESTAMPS]),
            timestamp_index: 0,
            timestamps_submitted: 0,
            timeblock: None,
        }
    }

    // ===== ACCESSORS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    pub fn state(&self) -> CommandListState {
        self.state
    }

    pub fn is_rendering(&self) -> bool {
        self.is_rendering
    }

    /// Pipeline state set by the last `set_pipeline_state`
    pub fn pipeline_state(&self) -> Option<&PipelineState> {
        self.pipeline_state.as_ref()
    }

    pub fn pipeline(&self) -> Option<&Arc<Pipeline>> {
        self.pipeline.as_ref()
    }

    // ===== STATE MACHINE =====

    /// Start recording
    ///
    /// A list still executing is waited on first, which also reads back
    /// its timestamps.
    pub fn begin(&mut self) {
        if self.state == CommandListState::Submitted {
            self.wait_for_execution();
        }
        crate::rhi_assert!(self.state == CommandListState::Idle, LOG_SOURCE,
            "Command list '{}': begin() called while {:?}", self.name, self.state);

        crate::rhi_check!(self.encoder.begin(), LOG_SOURCE,
            "Command list '{}': failed to begin recording", self.name);

        self.vertex_buffer_ids = [0; VERTEX_BINDING_COUNT];
        self.index_buffer_id = 0;
        self.pipeline_state = None;
        self.pipeline = None;
        self.pipeline_dirty = false;
        self.bindings.clear();
        self.bindings_dirty = false;
        self.is_rendering = false;
        self.timestamp_index = 0;
        self.timeblock = None;

        self.state = CommandListState::Recording;
    }

    /// Finish recording
    pub fn end(&mut self) {
        self.assert_recording("end");
        crate::rhi_assert!(!self.is_rendering, LOG_SOURCE,
            "Command list '{}': end() called with an active render pass", self.name);
        crate::rhi_assert!(self.timeblock.is_none(), LOG_SOURCE,
            "Command list '{}': end() called with an open timeblock", self.name);

        crate::rhi_check!(self.encoder.end(), LOG_SOURCE,
            "Command list '{}': failed to end recording", self.name);
        self.state = CommandListState::Ended;
    }

    /// Queue the recorded work; does not block
    pub fn submit(&mut self) {
        crate::rhi_assert!(self.state == CommandListState::Ended, LOG_SOURCE,
            "Command list '{}': submit() called while {:?}", self.name, self.state);

        crate::rhi_check!(self.encoder.submit(), LOG_SOURCE,
            "Command list '{}': failed to submit", self.name);
        self.timestamps_submitted = self.timestamp_index;
        self.state = CommandListState::Submitted;
    }

    /// Block until the submitted work completes and read back timestamps
    pub fn wait_for_execution(&mut self) {
        match self.state {
            CommandListState::Idle => return,
            CommandListState::Submitted => {}
            state => crate::rhi_fatal!(LOG_SOURCE,
                "Command list '{}': wait_for_execution() called while {:?}", self.name, state),
        }

        crate::rhi_check!(self.encoder.wait(), LOG_SOURCE,
            "Command list '{}': failed to wait for execution", self.name);

        if self.timestamps_submitted > 0 {
            let count = self.timestamps_submitted;
            crate::rhi_check!(self.encoder.read_timestamps(&mut self.timestamps[..count]), LOG_SOURCE,
                "Command list '{}': failed to read timestamps", self.name);
        }

        self.state = CommandListState::Idle;
    }

    /// True while submitted work has not completed
    pub fn is_executing(&self) -> bool {
        self.state == CommandListState::Submitted && self.encoder.is_executing()
    }

    // ===== PIPELINE =====

    /// Make a pipeline state current
    ///
    /// An active render pass is ended. The viewport (and the scissor when
    /// dynamic) are reset to the state's render area.
    pub fn set_pipeline_state(&mut self, state: &PipelineState) {
        self.assert_recording("set_pipeline_state");
        crate::rhi_assert!(state.is_valid(), LOG_SOURCE,
            "Command list '{}': pipeline state '{}' is not valid", self.name, state.name);

        if self.pipeline_state.as_ref() == Some(state) {
            return;
        }

        if self.is_rendering {
            self.end_render_pass();
        }

        let pipeline = self.device.get_or_create_pipeline(state);

        let layout_changed = self.pipeline.as_ref().map_or(true, |current| {
            !Arc::ptr_eq(current.descriptor_set_layout(), pipeline.descriptor_set_layout())
        });
        if layout_changed {
            self.bindings.clear();
        }

        self.pipeline = Some(pipeline);
        self.pipeline_dirty = true;
        self.pipeline_state = Some(state.clone());

        if state.is_graphics() {
            let viewport = state.resolved_viewport();
            self.encoder.set_viewport(&viewport);
            if state.dynamic_scissor {
                let rectangle = Rectangle::new(0.0, 0.0, viewport.width, viewport.height);
                self.encoder.set_scissor(&rectangle);
            }
        }
    }

    // ===== RENDER PASSES =====

    /// Begin rendering into the current pipeline state's targets
    pub fn begin_render_pass(&mut self) {
        self.assert_recording("begin_render_pass");
        crate::rhi_assert!(!self.is_rendering, LOG_SOURCE,
            "Command list '{}': a render pass is already active", self.name);

        let state = match &self.pipeline_state {
            Some(state) if state.is_graphics() => state.clone(),
            _ => crate::rhi_fatal!(LOG_SOURCE,
                "Command list '{}': begin_render_pass() requires a graphics pipeline state", self.name),
        };

        let mut info = RenderingInfo {
            width: state.width(),
            height: state.height(),
            color: Vec::with_capacity(state.color_target_count()),
            depth: None,
        };

        if let Some(swap_chain) = &state.render_target_swapchain {
            self.transition_swap_chain(swap_chain.as_ref(), ImageLayout::ColorAttachmentOptimal);
            info.color.push(ColorAttachment {
                view: swap_chain.rhi_rtv(),
                image: swap_chain.rhi_image(),
                format: swap_chain.format(),
                load: state.clear_color[0],
            });
        } else {
            let slice = state.render_target_color_texture_array_index;
            for (index, texture) in state.color_textures().enumerate() {
                self.transition_texture(texture, 0, 1, ImageLayout::ColorAttachmentOptimal);
                info.color.push(ColorAttachment {
                    view: texture.rhi_rtv(slice),
                    image: texture.rhi_image(),
                    format: texture.format(),
                    load: state.clear_color[index],
                });
            }
        }

        if let Some(texture) = &state.render_target_depth_texture {
            let read_only = state.render_target_depth_texture_read_only;
            let layout = if read_only {
                ImageLayout::DepthStencilReadOnlyOptimal
            } else if texture.is_stencil_format() {
                ImageLayout::DepthStencilAttachmentOptimal
            } else {
                ImageLayout::DepthAttachmentOptimal
            };
            self.transition_texture(texture, 0, 1, layout);

            info.depth = Some(DepthAttachment {
                view: texture.rhi_rtv(state.render_target_depth_texture_array_index),
                image: texture.rhi_image(),
                format: texture.format(),
                load_depth: state.clear_depth,
                load_stencil: state.clear_stencil,
                read_only,
            });
        }

        crate::rhi_check!(self.encoder.begin_rendering(&info), LOG_SOURCE,
            "Command list '{}': failed to begin render pass '{}'", self.name, state.name);
        self.is_rendering = true;
    }

    pub fn end_render_pass(&mut self) {
        self.assert_recording("end_render_pass");
        crate::rhi_assert!(self.is_rendering, LOG_SOURCE,
            "Command list '{}': no active render pass", self.name);

        self.encoder.end_rendering();
        self.is_rendering = false;
    }

    /// Clear a render target outside a render pass
    pub fn clear_render_target(&mut self, texture: &Texture, value: ClearValue) {
        self.assert_recording("clear_render_target");
        crate::rhi_assert!(!self.is_rendering, LOG_SOURCE,
            "Command list '{}': cannot clear '{}' inside a render pass", self.name, texture.name());
        crate::rhi_assert!(texture.flags().contains(TextureFlags::CLEAR_BLIT), LOG_SOURCE,
            "Texture '{}' must be created with CLEAR_BLIT to be cleared", texture.name());

        let is_depth_value = matches!(value, ClearValue::DepthStencil { .. });
        crate::rhi_assert!(is_depth_value == texture.is_depth_format(), LOG_SOURCE,
            "Clear value {:?} does not match the format of '{}' ({:?})", value, texture.name(), texture.format());

        self.transition_texture(texture, 0, texture.mip_count(), ImageLayout::TransferDstOptimal);
        self.encoder.clear_image(texture.rhi_image(), texture.aspect_mask(), texture.mip_count(), value);
    }

    // ===== BUFFERS =====

    /// Bind a vertex buffer at binding 0 (per-vertex) or 1 (per-instance)
    pub fn set_buffer_vertex(&mut self, binding: u32, buffer: &VertexBuffer) {
        self.assert_recording("set_buffer_vertex");
        crate::rhi_assert!((binding as usize) < VERTEX_BINDING_COUNT, LOG_SOURCE,
            "Vertex buffer binding {} is out of range", binding);

        if self.vertex_buffer_ids[binding as usize] == buffer.object_id() {
            return;
        }

        self.encoder.bind_vertex_buffer(binding, buffer.rhi_handle());
        self.vertex_buffer_ids[binding as usize] = buffer.object_id();
        self.profiler.add_binding_buffer_vertex();
    }

    pub fn set_buffer_index(&mut self, buffer: &IndexBuffer) {
        self.assert_recording("set_buffer_index");

        if self.index_buffer_id == buffer.object_id() {
            return;
        }

        self.encoder.bind_index_buffer(buffer.rhi_handle(), buffer.is_16bit());
        self.index_buffer_id = buffer.object_id();
        self.profiler.add_binding_buffer_index();
    }

    // ===== RESOURCES =====

    pub fn set_constant_buffer(&mut self, slot: u32, buffer: &ConstantBuffer) {
        self.assert_recording("set_constant_buffer");
        self.write_binding(slot, DescriptorResource::ConstantBuffer {
            buffer: buffer.rhi_handle(),
            range: buffer.size_cpu(),
        });
    }

    pub fn set_structured_buffer(&mut self, slot: u32, buffer: &StructuredBuffer) {
        self.assert_recording("set_structured_buffer");
        self.write_binding(slot, DescriptorResource::StructuredBuffer {
            buffer: buffer.rhi_handle(),
            range: buffer.size_cpu(),
        });
    }

    /// Bind a texture for sampling (`uav == false`) or storage writes
    ///
    /// # Arguments
    ///
    /// * `mip` - Mip to bind, `ALL_MIPS` for the full view
    pub fn set_texture(&mut self, slot: u32, texture: &Texture, mip: u32, uav: bool) {
        self.assert_recording("set_texture");

        let (mip_start, mip_range) = if mip == ALL_MIPS { (0, texture.mip_count()) } else { (mip, 1) };
        crate::rhi_assert!(mip_range_in_bounds(mip_start, mip_range, texture.mip_count()), LOG_SOURCE,
            "Mip {} is out of bounds for texture '{}'", mip, texture.name());

        let layout = if uav {
            crate::rhi_assert!(texture.flags().contains(TextureFlags::UAV), LOG_SOURCE,
                "Texture '{}' must be created with UAV to be bound for storage", texture.name());
            ImageLayout::General
        } else {
            ImageLayout::ShaderReadOnlyOptimal
        };

        if texture.layout_of_range(mip_start, mip_range) != Some(layout) {
            crate::rhi_assert!(!self.is_rendering, LOG_SOURCE,
                "Command list '{}': texture '{}' needs a layout transition inside a render pass",
                self.name, texture.name());
            self.insert_memory_barrier_texture(texture, mip_start, mip_range, layout);
        }

        let view = if mip == ALL_MIPS { texture.rhi_srv() } else { texture.rhi_srv_mip(mip) };
        let resource = if uav {
            DescriptorResource::TextureStorage { view }
        } else {
            DescriptorResource::Texture { view, layout }
        };
        self.write_binding(slot, resource);
    }

    pub fn set_sampler(&mut self, slot: u32, sampler: &Sampler) {
        self.assert_recording("set_sampler");
        self.write_binding(slot, DescriptorResource::Sampler { sampler: sampler.rhi_handle() });
    }

    /// Record push constants for the current pipeline
    pub fn push_constants(&mut self, offset: u32, data: &[u8]) {
        self.assert_recording("push_constants");
        let pipeline = match &self.pipeline {
            Some(pipeline) => pipeline.clone(),
            None => crate::rhi_fatal!(LOG_SOURCE,
                "Command list '{}': push_constants() requires a pipeline state", self.name),
        };
        crate::rhi_assert!(!pipeline.push_constant_stages().is_empty(), LOG_SOURCE,
            "Pipeline '{}' declares no push constants", pipeline.state().name);

        self.encoder.push_constants(pipeline.rhi_pipeline_layout(), pipeline.push_constant_stages(), offset, data);
    }

    /// Record a plain-old-data value as push constants at offset 0
    pub fn push_constants_typed<T: Pod>(&mut self, value: &T) {
        self.push_constants(0, bytemuck::bytes_of(value));
    }

    fn write_binding(&mut self, slot: u32, resource: DescriptorResource) {
        match self.bindings.iter_mut().find(|write| write.slot == slot) {
            Some(write) if write.resource == resource => return,
            Some(write) => write.resource = resource,
            None => self.bindings.push(DescriptorWrite { slot, resource }),
        }
        self.bindings_dirty = true;
    }

    // ===== DRAW & DISPATCH =====

    pub fn draw(&mut self, vertex_count: u32, vertex_offset: u32) {
        self.draw_instanced(vertex_count, 1, vertex_offset, 0);
    }

    pub fn draw_instanced(&mut self, vertex_count: u32, instance_count: u32, vertex_offset: u32, instance_offset: u32) {
        self.on_draw("draw", false);
        self.encoder.draw(vertex_count, instance_count, vertex_offset, instance_offset);
        self.profiler.add_draw();
    }

    pub fn draw_indexed(&mut self, index_count: u32, index_offset: u32, vertex_offset: i32) {
        self.draw_indexed_instanced(index_count, 1, index_offset, vertex_offset, 0);
    }

    pub fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        instance_count: u32,
        index_offset: u32,
        vertex_offset: i32,
        instance_offset: u32,
    ) {
        self.on_draw("draw_indexed", false);
        crate::rhi_assert!(self.index_buffer_id != 0, LOG_SOURCE,
            "Command list '{}': draw_indexed() without an index buffer", self.name);

        self.encoder.draw_indexed(index_count, instance_count, index_offset, vertex_offset, instance_offset);
        self.profiler.add_draw();
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.on_draw("dispatch", true);
        self.encoder.dispatch(x, y, z);
        self.profiler.add_dispatch();
    }

    /// Pre-draw hook: flush the dirty pipeline and descriptor bindings
    fn on_draw(&mut self, operation: &str, is_compute: bool) {
        self.assert_recording(operation);

        let pipeline = match &self.pipeline {
            Some(pipeline) => pipeline.clone(),
            None => crate::rhi_fatal!(LOG_SOURCE,
                "Command list '{}': {}() requires a pipeline state", self.name, operation),
        };
        crate::rhi_assert!(pipeline.is_compute() == is_compute, LOG_SOURCE,
            "Command list '{}': {}() with a {} pipeline", self.name, operation,
            if pipeline.is_compute() { "compute" } else { "graphics" });
        if is_compute {
            crate::rhi_assert!(!self.is_rendering, LOG_SOURCE,
                "Command list '{}': dispatch() inside a render pass", self.name);
        } else {
            crate::rhi_assert!(self.is_rendering, LOG_SOURCE,
                "Command list '{}': {}() outside a render pass", self.name, operation);
        }

        if self.pipeline_dirty {
            self.encoder.bind_pipeline(pipeline.rhi_pipeline(), pipeline.rhi_pipeline_layout(), is_compute);
            self.profiler.add_binding_pipeline();
            self.pipeline_dirty = false;
            self.bindings_dirty = !self.bindings.is_empty();
        }

        if self.bindings_dirty {
            crate::rhi_check!(
                self.encoder.bind_descriptors(
                    pipeline.rhi_pipeline_layout(),
                    pipeline.descriptor_set_layout().rhi_handle(),
                    is_compute,
                    &self.bindings,
                ),
                LOG_SOURCE, "Command list '{}': failed to bind descriptors", self.name
            );
            self.profiler.add_binding_descriptor_set();
            self.bindings_dirty = false;
        }
    }

    // ===== VIEWPORT & SCISSOR =====

    pub fn set_viewport(&mut self, viewport: &Viewport) {
        self.assert_recording("set_viewport");
        self.encoder.set_viewport(viewport);
    }

    pub fn set_scissor_rectangle(&mut self, rectangle: &Rectangle) {
        self.assert_recording("set_scissor_rectangle");
        if let Some(state) = &self.pipeline_state {
            crate::rhi_assert!(state.dynamic_scissor, LOG_SOURCE,
                "Pipeline state '{}' was not created with a dynamic scissor", state.name);
        }
        self.encoder.set_scissor(rectangle);
    }

    // ===== BLIT & COPY =====

    /// Scaled copy of a texture into the current backbuffer, which is left
    /// in present layout
    pub fn blit_to_swap_chain(&mut self, source: &Texture, swap_chain: &dyn SwapChain) {
        self.assert_recording("blit_to_swap_chain");
        self.validate_transfer_source(source);
        crate::rhi_assert!(source.width() <= swap_chain.width() && source.height() <= swap_chain.height(),
            LOG_SOURCE, "Blit source '{}' ({}x{}) is larger than the swap chain ({}x{})",
            source.name(), source.width(), source.height(), swap_chain.width(), swap_chain.height());

        let (source_region, destination_region) = self.prepare_swap_chain_transfer(source, swap_chain);
        self.encoder.blit(&source_region, &destination_region);
        self.transition_swap_chain(swap_chain, ImageLayout::PresentSrc);
    }

    /// Exact copy of a texture into the current backbuffer, which is left
    /// in present layout
    pub fn copy_to_swap_chain(&mut self, source: &Texture, swap_chain: &dyn SwapChain) {
        self.assert_recording("copy_to_swap_chain");
        self.validate_transfer_source(source);
        crate::rhi_assert!(source.width() == swap_chain.width() && source.height() == swap_chain.height(),
            LOG_SOURCE, "Copy source '{}' ({}x{}) does not match the swap chain ({}x{})",
            source.name(), source.width(), source.height(), swap_chain.width(), swap_chain.height());

        let (source_region, destination_region) = self.prepare_swap_chain_transfer(source, swap_chain);
        self.encoder.copy(&source_region, &destination_region);
        self.transition_swap_chain(swap_chain, ImageLayout::PresentSrc);
    }

    /// Scaled texture-to-texture copy of mip 0, or of every mip both share
    pub fn blit(&mut self, source: &Texture, destination: &Texture, all_mips: bool) {
        self.assert_recording("blit");
        self.validate_transfer_source(source);
        self.validate_transfer_source(destination);
        crate::rhi_assert!(source.width() <= destination.width() && source.height() <= destination.height(),
            LOG_SOURCE, "Blit source '{}' ({}x{}) is larger than '{}' ({}x{})",
            source.name(), source.width(), source.height(),
            destination.name(), destination.width(), destination.height());

        let mip_count = if all_mips { source.mip_count().min(destination.mip_count()) } else { 1 };
        self.transition_texture(source, 0, mip_count, ImageLayout::TransferSrcOptimal);
        self.transition_texture(destination, 0, mip_count, ImageLayout::TransferDstOptimal);

        for mip in 0..mip_count {
            self.encoder.blit(&texture_region(source, mip), &texture_region(destination, mip));
        }
    }

    /// Exact texture-to-texture copy of mip 0, or of every mip
    pub fn copy(&mut self, source: &Texture, destination: &Texture, all_mips: bool) {
        self.assert_recording("copy");
        self.validate_transfer_source(source);
        self.validate_transfer_source(destination);
        crate::rhi_assert!(source.width() == destination.width() && source.height() == destination.height()
            && source.format() == destination.format(),
            LOG_SOURCE, "Copy source '{}' and destination '{}' differ in size or format",
            source.name(), destination.name());

        let mip_count = if all_mips {
            crate::rhi_assert!(source.mip_count() == destination.mip_count(), LOG_SOURCE,
                "Copy of all mips needs equal mip counts ('{}': {}, '{}': {})",
                source.name(), source.mip_count(), destination.name(), destination.mip_count());
            source.mip_count()
        } else {
            1
        };
        self.transition_texture(source, 0, mip_count, ImageLayout::TransferSrcOptimal);
        self.transition_texture(destination, 0, mip_count, ImageLayout::TransferDstOptimal);

        for mip in 0..mip_count {
            self.encoder.copy(&texture_region(source, mip), &texture_region(destination, mip));
        }
    }

    fn validate_transfer_source(&self, texture: &Texture) {
        crate::rhi_assert!(!self.is_rendering, LOG_SOURCE,
            "Command list '{}': transfers are not allowed inside a render pass", self.name);
        crate::rhi_assert!(texture.flags().contains(TextureFlags::CLEAR_BLIT), LOG_SOURCE,
            "Texture '{}' must be created with CLEAR_BLIT to be blitted or copied", texture.name());
    }

    fn prepare_swap_chain_transfer(&mut self, source: &Texture, swap_chain: &dyn SwapChain) -> (ImageRegion, ImageRegion) {
        self.transition_texture(source, 0, 1, ImageLayout::TransferSrcOptimal);
        self.transition_swap_chain(swap_chain, ImageLayout::TransferDstOptimal);

        let destination = ImageRegion {
            image: swap_chain.rhi_image(),
            aspect: ImageAspect::COLOR,
            mip: 0,
            array_length: 1,
            width: swap_chain.width(),
            height: swap_chain.height(),
        };
        (texture_region(source, 0), destination)
    }

    // ===== BARRIERS =====

    /// Raw image barrier
    #[allow(clippy::too_many_arguments)]
    pub fn insert_memory_barrier_image(
        &mut self,
        image: RhiHandle,
        aspect: ImageAspect,
        mip_index: u32,
        mip_range: u32,
        array_length: u32,
        layout_old: ImageLayout,
        layout_new: ImageLayout,
    ) {
        self.assert_recording("insert_memory_barrier_image");
        crate::rhi_assert!(!self.is_rendering, LOG_SOURCE,
            "Command list '{}': barriers are not allowed inside a render pass", self.name);

        self.encoder.image_barrier(&ImageBarrier {
            image,
            aspect,
            mip_index,
            mip_range,
            array_length,
            layout_old,
            layout_new,
        });
        self.profiler.add_barrier();
    }

    /// Transition a mip range of a texture, using and updating its tracked layouts
    ///
    /// `ALL_MIPS` as the range covers every mip of the texture.
    pub fn insert_memory_barrier_texture(&mut self, texture: &Texture, mip_index: u32, mip_range: u32, layout_new: ImageLayout) {
        self.assert_recording("insert_memory_barrier_texture");

        let (mip_index, mip_range) = if mip_range == ALL_MIPS { (0, texture.mip_count()) } else { (mip_index, mip_range) };
        crate::rhi_assert!(mip_range_in_bounds(mip_index, mip_range, texture.mip_count()), LOG_SOURCE,
            "Mip range {} + {} is out of bounds for texture '{}' ({} mips)",
            mip_index, mip_range, texture.name(), texture.mip_count());

        match texture.layout_of_range(mip_index, mip_range) {
            Some(layout_old) => self.insert_memory_barrier_image(
                texture.rhi_image(), texture.aspect_mask(), mip_index, mip_range,
                texture.array_length(), layout_old, layout_new,
            ),
            // Mips disagree, one barrier each
            None => {
                for mip in mip_index..mip_index + mip_range {
                    self.insert_memory_barrier_image(
                        texture.rhi_image(), texture.aspect_mask(), mip, 1,
                        texture.array_length(), texture.layout(mip), layout_new,
                    );
                }
            }
        }

        texture.set_layout(mip_index, mip_range, layout_new);
    }

    /// Make prior writes to a texture visible, without changing its layout
    pub fn insert_memory_barrier_image_wait_for_write(&mut self, texture: &Texture) {
        self.assert_recording("insert_memory_barrier_image_wait_for_write");
        let layout = texture.layout(0);
        self.insert_memory_barrier_image(
            texture.rhi_image(), texture.aspect_mask(), 0, texture.mip_count(),
            texture.array_length(), layout, layout,
        );
    }

    /// Transition a texture only when it is not already in `layout`
    fn transition_texture(&mut self, texture: &Texture, mip_index: u32, mip_range: u32, layout: ImageLayout) {
        if texture.layout_of_range(mip_index, mip_range) != Some(layout) {
            self.insert_memory_barrier_texture(texture, mip_index, mip_range, layout);
        }
    }

    fn transition_swap_chain(&mut self, swap_chain: &dyn SwapChain, layout: ImageLayout) {
        let layout_old = swap_chain.layout();
        if layout_old == layout {
            return;
        }

        self.insert_memory_barrier_image(
            swap_chain.rhi_image(), ImageAspect::COLOR, 0, 1, 1, layout_old, layout,
        );
        swap_chain.set_layout(layout);
    }

    // ===== MARKERS & TIMING =====

    pub fn begin_marker(&mut self, name: &str) {
        self.assert_recording("begin_marker");
        self.encoder.begin_marker(name);
    }

    pub fn end_marker(&mut self) {
        self.assert_recording("end_marker");
        self.encoder.end_marker();
    }

    /// Write a start timestamp and reserve its end slot
    ///
    /// # Returns
    ///
    /// Index to pass to `end_timestamp` and `timestamp_duration`
    pub fn begin_timestamp(&mut self) -> usize {
        self.assert_recording("begin_timestamp");
        let index = self.timestamp_index;
        crate::rhi_assert!(index + 2 <= MAX_TIMESTAMPS, LOG_SOURCE,
            "Command list '{}': more than {} timestamps in one recording", self.name, MAX_TIMESTAMPS);

        self.encoder.write_timestamp(index as u32);
        self.timestamp_index += 2;
        index
    }

    pub fn end_timestamp(&mut self, index: usize) {
        self.assert_recording("end_timestamp");
        crate::rhi_assert!(index + 1 < self.timestamp_index, LOG_SOURCE,
            "Command list '{}': timestamp {} was never begun", self.name, index);

        self.encoder.write_timestamp(index as u32 + 1);
    }

    /// Duration in milliseconds of a timestamp pair of the last completed execution
    pub fn timestamp_duration(&self, index: usize) -> f32 {
        crate::rhi_assert!(self.state != CommandListState::Submitted, LOG_SOURCE,
            "Command list '{}': timestamps are read after wait_for_execution()", self.name);
        crate::rhi_assert!(index + 1 < self.timestamps_submitted, LOG_SOURCE,
            "Command list '{}': timestamp {} has no result", self.name, index);

        let ticks = self.timestamps[index + 1].saturating_sub(self.timestamps[index]);
        (ticks as f64 * self.device.limits().timestamp_period_ns as f64 * 1e-6) as f32
    }

    /// Open a named scope with an optional debug marker and GPU timing
    pub fn begin_timeblock(&mut self, name: &str, gpu_marker: bool, gpu_timing: bool) {
        self.assert_recording("begin_timeblock");
        if let Some(active) = &self.timeblock {
            crate::rhi_fatal!(LOG_SOURCE, "Command list '{}': timeblock '{}' started inside '{}'",
                self.name, name, active.name);
        }

        if gpu_marker {
            self.begin_marker(name);
        }
        let timestamp = gpu_timing.then(|| self.begin_timestamp());

        self.timeblock = Some(Timeblock { name: name.to_string(), gpu_marker, timestamp });
    }

    /// Close the open timeblock
    ///
    /// # Returns
    ///
    /// The timestamp index of the block when it was timed
    pub fn end_timeblock(&mut self) -> Option<usize> {
        self.assert_recording("end_timeblock");
        let timeblock = match self.timeblock.take() {
            Some(timeblock) => timeblock,
            None => crate::rhi_fatal!(LOG_SOURCE, "Command list '{}': no timeblock to end", self.name),
        };

        if let Some(index) = timeblock.timestamp {
            self.end_timestamp(index);
        }
        if timeblock.gpu_marker {
            self.end_marker();
        }
        timeblock.timestamp
    }

    fn assert_recording(&self, operation: &str) {
        crate::rhi_assert!(self.state == CommandListState::Recording, LOG_SOURCE,
            "Command list '{}': {}() called while {:?}", self.name, operation, self.state);
    }
}

fn texture_region(texture: &Texture, mip: u32) -> ImageRegion {
    ImageRegion {
        image: texture.rhi_image(),
        aspect: texture.aspect_mask(),
        mip,
        array_length: texture.array_length(),
        width: (texture.width() >> mip).max(1),
        height: (texture.height() >> mip).max(1),
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        if let Err(error) = self.device.try_queue_wait_all() {
            crate::rhi_error!(LOG_SOURCE, "Command list '{}': wait failed on destruction: {}", self.name, error);
        }
        self.device.deletion_queue().add(ResourceType::CommandPool, self.pool);
    }
}

#[cfg(test)]
#[path = "command_list_tests.rs"]
mod tests;
