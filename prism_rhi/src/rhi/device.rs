/// Device: owns the backend, the object caches and the deferred deletion queue
///
/// `Device` is a cheap, cloneable handle (`Arc` inside). Command lists keep
/// one, so the backend outlives every list recording against it.

use std::sync::{Arc, Mutex, PoisonError};
use bytemuck::Pod;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::rhi::backend::{DeviceBackend, DeviceLimits, SamplerLayoutKind};
use crate::rhi::buffer::{
    Buffer, BufferDesc, BufferUsage, ConstantBuffer, IndexBuffer, StructuredBuffer, VertexBuffer,
};
use crate::rhi::command_list::CommandList;
use crate::rhi::definitions::{
    hash_combine, ApiType, QueueType, ResourceType, RhiHandle, LOG_SOURCE,
};
use crate::rhi::deletion_queue::{DeletionQueue, IdleToken};
use crate::rhi::descriptor_set_layout::{descriptors_hash, merge_descriptors, DescriptorSetLayout};
use crate::rhi::pipeline::{Pipeline, PipelineDesc};
use crate::rhi::pipeline_state::PipelineState;
use crate::rhi::profiler::Profiler;
use crate::rhi::sampler::{Sampler, SamplerDesc};
use crate::rhi::shader::{Shader, ShaderDesc};
use crate::rhi::texture::{Texture, TextureDesc};

struct DeviceInner {
    backend: Box<dyn DeviceBackend>,
    limits: DeviceLimits,
    /// (comparison, regular)
    sampler_layouts: (RhiHandle, RhiHandle),
    deletion_queue: Arc<DeletionQueue>,
    layout_cache: Mutex<FxHashMap<u64, Vec<Arc<DescriptorSetLayout>>>>,
    /// Keyed by pipeline-state hash combined with the layout id; collisions
    /// are resolved by full state comparison
    pipeline_cache: Mutex<FxHashMap<u64, Vec<Arc<Pipeline>>>>,
    profiler: Arc<Profiler>,
}

/// RHI device
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl Device {
    /// Wrap an initialized backend
    pub fn new(backend: Box<dyn DeviceBackend>) -> Self {
        let limits = backend.limits();
        let sampler_layouts = (
            backend.sampler_set_layout(SamplerLayoutKind::Comparison),
            backend.sampler_set_layout(SamplerLayoutKind::Regular),
        );

        crate::rhi_info!(LOG_SOURCE, "Device created: {} ({:?}, {:?})",
            limits.device_name, backend.api_type(), limits.device_type);
        crate::rhi_debug!(LOG_SOURCE, "Max push constant size: {} bytes, timestamp period: {} ns",
            limits.max_push_constant_size, limits.timestamp_period_ns);

        Self {
            inner: Arc::new(DeviceInner {
                backend,
                limits,
                sampler_layouts,
                deletion_queue: Arc::new(DeletionQueue::new()),
                layout_cache: Mutex::new(FxHashMap::default()),
                pipeline_cache: Mutex::new(FxHashMap::default()),
                profiler: Arc::new(Profiler::new()),
            }),
        }
    }

    // ===== ACCESSORS =====

    pub fn api_type(&self) -> ApiType {
        self.inner.backend.api_type()
    }

    pub fn limits(&self) -> &DeviceLimits {
        &self.inner.limits
    }

    pub fn profiler(&self) -> &Arc<Profiler> {
        &self.inner.profiler
    }

    pub fn deletion_queue(&self) -> &Arc<DeletionQueue> {
        &self.inner.deletion_queue
    }

    pub(crate) fn backend(&self) -> &dyn DeviceBackend {
        self.inner.backend.as_ref()
    }

    // ===== QUEUES & DELETION =====

    /// Wait for every queue to go idle. Failure is fatal.
    pub fn queue_wait_all(&self) -> IdleToken {
        crate::rhi_check!(self.try_queue_wait_all(), LOG_SOURCE, "Failed to wait for device queues")
    }

    /// Wait for every queue to go idle
    pub fn try_queue_wait_all(&self) -> Result<IdleToken> {
        self.inner.backend.queue_wait_all()?;
        Ok(IdleToken::new())
    }

    /// Destroy every handle waiting in the deletion queue
    ///
    /// # Returns
    ///
    /// Number of destroyed backend objects
    pub fn process_deletion_queue(&self, idle: &IdleToken) -> usize {
        self.inner.process_deletion_queue(idle)
    }

    /// Tag a backend object with a debug name; failure is only logged
    pub fn set_resource_name(&self, resource_type: ResourceType, handle: RhiHandle, name: &str) {
        if let Err(error) = self.inner.backend.set_name(resource_type, handle, name) {
            crate::rhi_warn!(LOG_SOURCE, "Failed to name {:?} '{}': {}", resource_type, name, error);
        }
    }

    // ===== CACHES =====

    /// Descriptor-set layout merging the descriptors of a state's shaders
    pub fn get_or_create_descriptor_set_layout(&self, state: &PipelineState) -> Arc<DescriptorSetLayout> {
        let shaders = [&state.shader_vertex, &state.shader_pixel, &state.shader_compute];
        let descriptors = merge_descriptors(shaders.into_iter().flatten().map(Arc::as_ref));
        let hash = descriptors_hash(&descriptors);

        let mut cache = self.inner.layout_cache.lock().unwrap_or_else(PoisonError::into_inner);
        let bucket = cache.entry(hash).or_default();
        if let Some(layout) = bucket.iter().find(|layout| layout.descriptors() == descriptors.as_slice()) {
            return layout.clone();
        }

        let handle = crate::rhi_check!(
            self.inner.backend.create_descriptor_set_layout(&state.name, &descriptors),
            LOG_SOURCE, "Failed to create descriptor set layout for '{}'", state.name
        );
        self.set_resource_name(ResourceType::DescriptorSetLayout, handle, &state.name);

        crate::rhi_debug!(LOG_SOURCE, "Descriptor set layout created for '{}' ({} descriptors)",
            state.name, descriptors.len());

        let layout = Arc::new(DescriptorSetLayout::new(
            &state.name,
            descriptors,
            handle,
            Some(self.inner.deletion_queue.clone()),
        ));
        bucket.push(layout.clone());
        layout
    }

    /// Compiled pipeline for a state, built on first use
    pub fn get_or_create_pipeline(&self, state: &PipelineState) -> Arc<Pipeline> {
        crate::rhi_assert!(state.is_graphics() != state.is_compute(), LOG_SOURCE,
            "Pipeline state '{}' must be either graphics or compute", state.name);

        let layout = self.get_or_create_descriptor_set_layout(state);
        let key = hash_combine(state.hash_value(), layout.object_id());

        let mut cache = self.inner.pipeline_cache.lock().unwrap_or_else(PoisonError::into_inner);
        let bucket = cache.entry(key).or_default();
        if let Some(pipeline) = bucket
            .iter()
            .find(|pipeline| pipeline.state() == state && Arc::ptr_eq(pipeline.descriptor_set_layout(), &layout))
        {
            return pipeline.clone();
        }

        let desc = PipelineDesc::build(
            state,
            &layout,
            self.inner.sampler_layouts,
            self.inner.limits.max_push_constant_size,
        );
        let native = crate::rhi_check!(
            self.inner.backend.create_pipeline(&desc),
            LOG_SOURCE, "Failed to create pipeline '{}'", state.name
        );
        self.set_resource_name(ResourceType::Pipeline, native.pipeline, &state.name);
        self.set_resource_name(ResourceType::PipelineLayout, native.layout, &state.name);

        crate::rhi_debug!(LOG_SOURCE, "Pipeline '{}' created ({})",
            state.name, if desc.is_compute() { "compute" } else { "graphics" });

        let pipeline = Arc::new(Pipeline::new(
            state.clone(),
            layout,
            &desc,
            native,
            self.inner.deletion_queue.clone(),
        ));
        bucket.push(pipeline.clone());
        pipeline
    }

    /// Number of cached pipelines
    pub fn pipeline_count(&self) -> usize {
        self.inner.pipeline_cache.lock().unwrap_or_else(PoisonError::into_inner).values().map(Vec::len).sum()
    }

    /// Number of cached descriptor-set layouts
    pub fn descriptor_set_layout_count(&self) -> usize {
        self.inner.layout_cache.lock().unwrap_or_else(PoisonError::into_inner).values().map(Vec::len).sum()
    }

    // ===== FACTORIES =====

    /// Create a shader module from SPIR-V and reflect it
    pub fn create_shader(&self, desc: &ShaderDesc) -> Arc<Shader> {
        crate::rhi_assert!(desc.stage.bits().count_ones() == 1, LOG_SOURCE,
            "Shader '{}' must have exactly one stage, got {:?}", desc.name, desc.stage);
        crate::rhi_assert!(!desc.code.is_empty(), LOG_SOURCE, "Shader '{}' has no code", desc.name);

        let (module, reflection) = crate::rhi_check!(
            self.inner.backend.create_shader(desc),
            LOG_SOURCE, "Failed to create shader '{}'", desc.name
        );
        self.set_resource_name(ResourceType::Shader, module, desc.name);

        crate::rhi_debug!(LOG_SOURCE, "Shader '{}' created ({} inputs, {} descriptors)",
            desc.name, reflection.input_layout.attributes().len(), reflection.descriptors.len());

        Arc::new(Shader::new(
            desc.name,
            desc.stage,
            desc.entry_point,
            module,
            reflection,
            Some(self.inner.deletion_queue.clone()),
        ))
    }

    pub fn create_texture(&self, desc: TextureDesc) -> Arc<Texture> {
        let max = self.inner.limits.max_texture_dimension_2d;
        crate::rhi_assert!(desc.width <= max && desc.height <= max, LOG_SOURCE,
            "Texture '{}' is {}x{}, the device allows {}", desc.name, desc.width, desc.height, max);

        let handles = crate::rhi_check!(
            self.inner.backend.create_texture(&desc),
            LOG_SOURCE, "Failed to create texture '{}'", desc.name
        );
        self.set_resource_name(ResourceType::Texture, handles.image, &desc.name);

        Arc::new(Texture::new(desc, handles, Some(self.inner.deletion_queue.clone())))
    }

    pub fn create_sampler(&self, desc: &SamplerDesc) -> Arc<Sampler> {
        let handle = crate::rhi_check!(
            self.inner.backend.create_sampler(desc),
            LOG_SOURCE, "Failed to create sampler"
        );
        Arc::new(Sampler::new(*desc, handle, Some(self.inner.deletion_queue.clone())))
    }

    /// Vertex buffer filled with `vertices`
    pub fn create_vertex_buffer<T: Pod>(&self, name: &str, vertices: &[T]) -> Arc<VertexBuffer> {
        let buffer = self.create_buffer(name, BufferUsage::Vertex, vertices);
        Arc::new(VertexBuffer::new(buffer))
    }

    /// Index buffer filled with `indices` (u16 or u32)
    pub fn create_index_buffer<T: Pod>(&self, name: &str, indices: &[T]) -> Arc<IndexBuffer> {
        let stride = std::mem::size_of::<T>();
        crate::rhi_assert!(stride == 2 || stride == 4, LOG_SOURCE,
            "Index buffer '{}' must use 16 or 32-bit indices, got {} bytes", name, stride);

        let buffer = self.create_buffer(name, BufferUsage::Index, indices);
        Arc::new(IndexBuffer::new(buffer))
    }

    /// Constant buffer holding one `T`
    pub fn create_constant_buffer<T: Pod>(&self, name: &str, value: &T) -> Arc<ConstantBuffer> {
        let buffer = self.create_buffer(name, BufferUsage::Constant, std::slice::from_ref(value));
        Arc::new(ConstantBuffer::new(buffer))
    }

    /// Structured buffer filled with `elements`
    pub fn create_structured_buffer<T: Pod>(&self, name: &str, elements: &[T]) -> Arc<StructuredBuffer> {
        let buffer = self.create_buffer(name, BufferUsage::Structured, elements);
        Arc::new(StructuredBuffer::new(buffer))
    }

    fn create_buffer<T: Pod>(&self, name: &str, usage: BufferUsage, elements: &[T]) -> Buffer {
        crate::rhi_assert!(!elements.is_empty(), LOG_SOURCE, "Buffer '{}' is empty", name);

        let desc = BufferDesc::new(name, usage, std::mem::size_of::<T>() as u32, elements.len() as u32);
        let (handle, size_gpu) = crate::rhi_check!(
            self.inner.backend.create_buffer(&desc),
            LOG_SOURCE, "Failed to create buffer '{}'", name
        );
        self.set_resource_name(ResourceType::Buffer, handle, name);

        let buffer = Buffer::new(desc, size_gpu, handle, Some(self.inner.deletion_queue.clone()));
        self.update_buffer(&buffer, 0, bytemuck::cast_slice(elements));
        buffer
    }

    /// Write host data into a buffer
    pub fn update_buffer(&self, buffer: &Buffer, offset: u64, data: &[u8]) {
        crate::rhi_assert!(offset + data.len() as u64 <= buffer.size_gpu(), LOG_SOURCE,
            "Update of {} bytes at offset {} overflows buffer '{}' ({} bytes)",
            data.len(), offset, buffer.name(), buffer.size_gpu());

        crate::rhi_check!(
            self.inner.backend.update_buffer(buffer.rhi_handle(), offset, data),
            LOG_SOURCE, "Failed to update buffer '{}'", buffer.name()
        );
    }

    /// New command list with its own command pool
    pub fn create_command_list(&self, queue: QueueType, name: &str) -> CommandList {
        let pool = crate::rhi_check!(
            self.inner.backend.create_command_pool(queue),
            LOG_SOURCE, "Failed to create command pool for '{}'", name
        );
        self.set_resource_name(ResourceType::CommandPool, pool, name);

        let encoder = crate::rhi_check!(
            self.inner.backend.create_command_encoder(queue, pool, name),
            LOG_SOURCE, "Failed to create command list '{}'", name
        );

        CommandList::new(self.clone(), queue, pool, encoder, name)
    }
}

impl DeviceInner {
    fn process_deletion_queue(&self, idle: &IdleToken) -> usize {
        let drained = self.deletion_queue.drain(idle);
        for (resource_type, handle) in &drained {
            self.backend.destroy(*resource_type, *handle);
        }

        if !drained.is_empty() {
            crate::rhi_trace!(LOG_SOURCE, "Destroyed {} deferred objects", drained.len());
        }
        drained.len()
    }
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        let idle = match self.backend.queue_wait_all() {
            Ok(()) => IdleToken::new(),
            Err(error) => {
                crate::rhi_error!(LOG_SOURCE, "Device wait failed during shutdown: {}", error);
                return;
            }
        };

        // Cached objects enqueue their handles when released
        self.pipeline_cache.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.layout_cache.lock().unwrap_or_else(PoisonError::into_inner).clear();

        let count = self.process_deletion_queue(&idle);
        crate::rhi_info!(LOG_SOURCE, "Device destroyed ({} deferred objects released)", count);
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
